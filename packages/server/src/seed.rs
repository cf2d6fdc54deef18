use sea_orm::sea_query::Index;
use sea_orm::*;
use tracing::info;

use crate::entity::{pic_ident, sequence};

/// Ensure indexes schema sync can't express.
///
/// `(ident_type, value)` must be unique across pics for upload dedupe.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("idx_pic_idents_type_value")
        .table(pic_ident::Entity)
        .col(pic_ident::Column::IdentType)
        .col(pic_ident::Column::Value)
        .to_owned();

    db.execute(&stmt).await?;
    info!("Ensured index idx_pic_idents_type_value exists");
    Ok(())
}

/// Insert the id sequence row if the table is empty.
pub async fn seed_sequence(db: &DatabaseConnection) -> Result<(), DbErr> {
    if sequence::Entity::find().one(db).await?.is_some() {
        return Ok(());
    }

    let model = sequence::ActiveModel {
        the_sequence: Set(1),
    };
    let result = sequence::Entity::insert(model)
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(sequence::Column::TheSequence)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(_) => info!("Seeded id sequence"),
        Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e),
    }
    Ok(())
}
