use async_trait::async_trait;
use common::{Capability, Status};
use tracing::{info, warn};

use super::auth::require_capability;
use super::{Deps, Task, TaskContext, finish};
use crate::db::Lock;
use crate::schema::{DeletionReason, DeletionStatus, Pic};

/// Remove a pic's files while keeping its metadata.
pub struct HardDeletePicTask {
    deps: Deps,
    pub pic_id: i64,
}

impl HardDeletePicTask {
    pub fn new(deps: Deps, pic_id: i64) -> Self {
        Self { deps, pic_id }
    }
}

/// Unlink the original and the thumbnail. Missing files are only logged.
pub(crate) async fn remove_pic_files(deps: &Deps, pix_path: &std::path::Path, pic: &Pic) {
    for path in [pic.path(pix_path), pic.thumbnail_path(pix_path)] {
        match deps.fs.remove(&path).await {
            Ok(true) => {}
            Ok(false) => warn!(path = %path.display(), "Pic file already gone"),
            Err(e) => warn!(path = %path.display(), error = %e, "Can't remove pic file"),
        }
    }
}

#[async_trait]
impl Task for HardDeletePicTask {
    fn name(&self) -> &'static str {
        "hard_delete_pic"
    }

    async fn run(&mut self, ctx: &TaskContext) -> Result<(), Status> {
        let (j, _, config) =
            require_capability(&self.deps, ctx, &[Capability::PicHardDelete]).await?;
        let res: Result<_, Status> = async {
            let mut pic = j
                .lookup_pic(self.pic_id, Lock::Write)
                .await?
                .ok_or_else(|| Status::not_found("can't find pic"))?;
            let now = self.deps.now();
            let ds = pic.deletion_status.get_or_insert_with(|| DeletionStatus {
                marked_deleted: now,
                pending_deleted: Some(now),
                actual_deleted: None,
                reason: DeletionReason::None,
                details: String::new(),
                temporary: false,
            });
            ds.actual_deleted = Some(now);
            pic.modified = now;
            j.update_pic(&pic).await?;
            Ok(pic)
        }
        .await;
        let pic = finish(j, res).await?;

        remove_pic_files(&self.deps, &config.pix_path, &pic).await;
        info!(pic_id = pic.pic_id, "Hard deleted pic");
        Ok(())
    }
}
