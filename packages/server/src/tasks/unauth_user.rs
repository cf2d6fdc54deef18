use async_trait::async_trait;
use common::Status;

use super::{Deps, Task, TaskContext, finish};
use crate::db::Lock;

/// End a session by removing its token from the user.
pub struct UnauthUserTask {
    deps: Deps,
    pub user_id: i64,
    pub token_id: i64,
}

impl UnauthUserTask {
    pub fn new(deps: Deps, user_id: i64, token_id: i64) -> Self {
        Self {
            deps,
            user_id,
            token_id,
        }
    }
}

#[async_trait]
impl Task for UnauthUserTask {
    fn name(&self) -> &'static str {
        "unauth_user"
    }

    async fn run(&mut self, _ctx: &TaskContext) -> Result<(), Status> {
        let j = self.deps.begin().await?;
        let res: Result<_, Status> = async {
            let mut user = j
                .lookup_user(self.user_id, Lock::Write)
                .await?
                .ok_or_else(|| Status::unauthenticated("can't lookup user"))?;
            let before = user.token.len();
            user.token.retain(|t| t.token_id != self.token_id);
            if user.token.len() == before {
                return Err(Status::invalid_argument("can't find token"));
            }
            user.modified = self.deps.now();
            j.update_user(&user).await
        }
        .await;
        finish(j, res).await
    }
}
