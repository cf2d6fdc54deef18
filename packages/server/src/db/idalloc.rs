use common::Status;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QuerySelect,
    TransactionTrait,
};
use tokio::sync::Mutex;
use tracing::debug;

use super::db_status;
use crate::entity::sequence;

#[derive(Debug, Default)]
struct Block {
    next: i64,
    avail: i64,
}

/// Process-wide id source that reserves ids from the sequence row in blocks.
#[derive(Debug)]
pub struct IdAlloc {
    db: DatabaseConnection,
    grab: i64,
    block: Mutex<Block>,
}

impl IdAlloc {
    pub fn new(db: DatabaseConnection, grab: i64) -> Self {
        Self {
            db,
            grab: grab.max(1),
            block: Mutex::new(Block::default()),
        }
    }

    pub async fn next(&self) -> Result<i64, Status> {
        let mut block = self.block.lock().await;
        if block.avail == 0 {
            let txn = self
                .db
                .begin()
                .await
                .map_err(|e| db_status(e, "can't allocate id"))?;
            let first = reserve(&txn, self.grab)
                .await
                .map_err(|e| db_status(e, "can't allocate id"))?;
            txn.commit()
                .await
                .map_err(|e| db_status(e, "can't allocate id"))?;
            debug!(first, grab = self.grab, "Reserved id block");
            block.next = first;
            block.avail = self.grab;
        }
        let id = block.next;
        block.next += 1;
        block.avail -= 1;
        Ok(id)
    }
}

/// Advance the sequence row by `n` and return the first reserved id.
pub(crate) async fn reserve<C: ConnectionTrait>(conn: &C, n: i64) -> Result<i64, DbErr> {
    let row = sequence::Entity::find()
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("sequence row is missing".into()))?;
    let current = row.the_sequence;
    let res = sequence::Entity::update_many()
        .col_expr(sequence::Column::TheSequence, Expr::value(current + n))
        .filter(sequence::Column::TheSequence.eq(current))
        .exec(conn)
        .await?;
    if res.rows_affected != 1 {
        return Err(DbErr::Custom(format!(
            "sequence row changed underneath, {} rows updated",
            res.rows_affected
        )));
    }
    Ok(current)
}
