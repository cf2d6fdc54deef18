use std::sync::Arc;

use common::Status;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tracing::warn;

use super::{IdAlloc, db_status, idalloc};

/// One database transaction with typed table operations.
///
/// A job must end in [`Job::commit`] or [`Job::rollback`]. Dropping it
/// unfinished logs a warning and the transaction is rolled back.
pub struct Job {
    txn: Option<DatabaseTransaction>,
    ids: Option<Arc<IdAlloc>>,
}

impl Job {
    pub async fn begin(db: &DatabaseConnection, ids: Option<Arc<IdAlloc>>) -> Result<Self, Status> {
        let txn = db
            .begin()
            .await
            .map_err(|e| db_status(e, "can't create job"))?;
        Ok(Self {
            txn: Some(txn),
            ids,
        })
    }

    pub(crate) fn conn(&self) -> Result<&DatabaseTransaction, Status> {
        self.txn
            .as_ref()
            .ok_or_else(|| Status::internal("job already finished"))
    }

    pub async fn commit(mut self) -> Result<(), Status> {
        let txn = self
            .txn
            .take()
            .ok_or_else(|| Status::internal("job already finished"))?;
        txn.commit()
            .await
            .map_err(|e| db_status(e, "can't commit job"))
    }

    pub async fn rollback(mut self) -> Result<(), Status> {
        let txn = self
            .txn
            .take()
            .ok_or_else(|| Status::internal("job already finished"))?;
        txn.rollback()
            .await
            .map_err(|e| db_status(e, "can't rollback job"))
    }

    /// Next free id. Without a shared allocator the id is reserved inside
    /// this job and returned to the pool if the job rolls back.
    pub async fn alloc_id(&self) -> Result<i64, Status> {
        match &self.ids {
            Some(ids) => ids.next().await,
            None => idalloc::reserve(self.conn()?, 1)
                .await
                .map_err(|e| db_status(e, "can't allocate id")),
        }
    }
}

impl Drop for Job {
    fn drop(&mut self) {
        if self.txn.is_some() {
            warn!("Job dropped without commit or rollback, rolling back");
        }
    }
}
