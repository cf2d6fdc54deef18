use async_trait::async_trait;
use chrono::Duration;
use common::{Capability, Status};
use tracing::info;

use super::auth::{authed_job, lookup_object_user, validate_capability};
use super::{Deps, Task, TaskContext, finish};
use crate::db::Lock;
use crate::schema::User;

/// Change a user's capabilities under optimistic concurrency.
pub struct UpdateUserTask {
    deps: Deps,
    /// Defaults to the caller.
    pub object_user_id: Option<i64>,
    /// `version()` of the user the caller last saw.
    pub version: i64,
    pub set_capability: Vec<Capability>,
    pub clear_capability: Vec<Capability>,

    pub object_user: Option<User>,
}

impl UpdateUserTask {
    pub fn new(deps: Deps, object_user_id: Option<i64>, version: i64) -> Self {
        Self {
            deps,
            object_user_id,
            version,
            set_capability: Vec::new(),
            clear_capability: Vec::new(),
            object_user: None,
        }
    }
}

#[async_trait]
impl Task for UpdateUserTask {
    fn name(&self) -> &'static str {
        "update_user"
    }

    fn reset_for_retry(&mut self) {
        self.object_user = None;
    }

    async fn run(&mut self, ctx: &TaskContext) -> Result<(), Status> {
        let (j, subject) = authed_job(&self.deps, ctx).await?;
        let res: Result<_, Status> = async {
            let subject = subject
                .as_ref()
                .ok_or_else(|| Status::unauthenticated("no user"))?;
            let config = self.deps.config(ctx).await?;

            if let Some(both) = self
                .set_capability
                .iter()
                .find(|c| self.clear_capability.contains(c))
            {
                return Err(Status::invalid_argument(format!(
                    "cap both set and cleared: {both}"
                )));
            }
            let changes_caps = !self.set_capability.is_empty() || !self.clear_capability.is_empty();
            let is_self = self.object_user_id.is_none_or(|id| id == subject.user_id);
            if changes_caps || !is_self {
                validate_capability(Some(subject), &config, &[Capability::UserUpdateCapability])?;
            }

            let mut object =
                lookup_object_user(&j, Lock::Write, self.object_user_id, Some(subject)).await?;
            if object.version() != self.version {
                return Err(Status::aborted("version mismatch"));
            }

            for cap in &self.set_capability {
                if !object.capability.contains(cap) {
                    object.capability.push(*cap);
                }
            }
            object.capability.retain(|c| !self.clear_capability.contains(c));
            // The version must move even if the clock did not.
            object.modified = self
                .deps
                .now()
                .max(object.modified + Duration::nanoseconds(1));
            j.update_user(&object).await?;
            Ok(object)
        }
        .await;

        let object = finish(j, res).await?;
        info!(user_id = object.user_id, caps = ?object.capability, "Updated user");
        self.object_user = Some(object);
        Ok(())
    }
}
