use async_trait::async_trait;
use common::{Capability, Status};

use super::auth::require_capability;
use super::{Deps, Task, TaskContext, finish};
use crate::db::Lock;

pub struct IncrementViewCountTask {
    deps: Deps,
    pub pic_id: i64,
}

impl IncrementViewCountTask {
    pub fn new(deps: Deps, pic_id: i64) -> Self {
        Self { deps, pic_id }
    }
}

#[async_trait]
impl Task for IncrementViewCountTask {
    fn name(&self) -> &'static str {
        "increment_view_count"
    }

    async fn run(&mut self, ctx: &TaskContext) -> Result<(), Status> {
        let (j, _, _) =
            require_capability(&self.deps, ctx, &[Capability::PicUpdateViewCounter]).await?;
        let res: Result<_, Status> = async {
            let mut pic = j
                .lookup_pic(self.pic_id, Lock::Write)
                .await?
                .ok_or_else(|| Status::not_found("can't find pic"))?;
            if pic.hard_deleted() {
                return Err(Status::invalid_argument("can't update deleted pic"));
            }
            pic.view_count += 1;
            pic.modified = self.deps.now();
            j.update_pic(&pic).await
        }
        .await;
        finish(j, res).await
    }
}
