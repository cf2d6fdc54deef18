use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "Pics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    /// Browse order. Negative while the pic is hidden.
    #[sea_orm(indexed)]
    pub index_order: i64,

    /// Wilson lower bound of the vote ratio, scaled to 2^30.
    #[sea_orm(indexed)]
    pub score_order: i32,

    /// Serialized `schema::Pic`.
    pub data: Vec<u8>,
}

impl ActiveModelBehavior for ActiveModel {}
