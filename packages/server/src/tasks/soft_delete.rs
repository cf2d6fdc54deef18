use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::{Capability, Status};
use tracing::info;

use super::auth::require_capability;
use super::{Deps, Task, TaskContext, finish};
use crate::db::Lock;
use crate::schema::{DeletionReason, DeletionStatus};

/// Time a soft deleted pic lingers before it is due for hard deletion.
fn default_pending_delay() -> Duration {
    Duration::days(7)
}

/// Hide a pic from the index and schedule it for deletion.
pub struct SoftDeletePicTask {
    deps: Deps,
    pub pic_id: i64,
    pub reason: DeletionReason,
    pub details: String,
    /// Whether uploading the same content again brings the pic back.
    pub temporary: bool,
    pub pending_deletion_time: Option<DateTime<Utc>>,
}

impl SoftDeletePicTask {
    pub fn new(deps: Deps, pic_id: i64, reason: DeletionReason) -> Self {
        Self {
            deps,
            pic_id,
            reason,
            details: String::new(),
            temporary: false,
            pending_deletion_time: None,
        }
    }
}

#[async_trait]
impl Task for SoftDeletePicTask {
    fn name(&self) -> &'static str {
        "soft_delete_pic"
    }

    async fn run(&mut self, ctx: &TaskContext) -> Result<(), Status> {
        let (j, _, _) = require_capability(&self.deps, ctx, &[Capability::PicSoftDelete]).await?;
        let res: Result<_, Status> = async {
            if self.reason == DeletionReason::Unknown {
                return Err(Status::invalid_argument("deletion reason required"));
            }
            let mut pic = j
                .lookup_pic(self.pic_id, Lock::Write)
                .await?
                .ok_or_else(|| Status::not_found("can't find pic"))?;
            if pic.hard_deleted() {
                return Err(Status::invalid_argument("pic already hard deleted"));
            }

            let now = self.deps.now();
            let marked_deleted = pic
                .deletion_status
                .as_ref()
                .map_or(now, |ds| ds.marked_deleted);
            pic.deletion_status = Some(DeletionStatus {
                marked_deleted,
                pending_deleted: Some(
                    self.pending_deletion_time
                        .unwrap_or_else(|| now + default_pending_delay()),
                ),
                actual_deleted: None,
                reason: self.reason,
                details: self.details.clone(),
                temporary: self.temporary,
            });
            pic.modified = now;
            j.update_pic(&pic).await
        }
        .await;
        finish(j, res).await?;
        info!(pic_id = self.pic_id, reason = ?self.reason, "Soft deleted pic");
        Ok(())
    }
}
