//! Backend operations. Each task runs in one [`Job`] and is driven by a
//! [`TaskRunner`] that retries it after lock conflicts.

mod add_comment;
mod auth;
mod auth_user;
mod config_cell;
mod create_user;
mod find_similar;
mod hard_delete;
mod increment_view;
mod lookup_pic;
mod purge;
mod read_index;
mod read_pic;
mod runner;
mod soft_delete;
mod tags;
mod unauth_user;
mod update_user;
mod upsert_pic;
mod vote;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::Status;
use common::config::BackendConfig;
use common::storage::PixFs;
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub use add_comment::AddPicCommentTask;
pub use auth_user::{AuthUserTask, Credentials};
pub use config_cell::{ConfigCell, watch_config_file};
pub use create_user::CreateUserTask;
pub use find_similar::FindSimilarPicsTask;
pub use hard_delete::HardDeletePicTask;
pub use increment_view::IncrementViewCountTask;
pub use lookup_pic::{CommentNode, LookupPicDetailsTask};
pub use purge::PurgePicTask;
pub use read_index::ReadIndexPicsTask;
pub use read_pic::{PicChunk, ReadPicTask};
pub use runner::TaskRunner;
pub use soft_delete::SoftDeletePicTask;
pub use tags::AddPicTagsTask;
pub use unauth_user::UnauthUserTask;
pub use update_user::UpdateUserTask;
pub use upsert_pic::{UpsertPicInput, UpsertPicTask};
pub use vote::{AddPicVoteTask, LookupPicVoteTask};

use crate::db::{IdAlloc, Job};
use crate::imaging::PicDecoder;

/// The user token a request was authenticated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub token_id: i64,
}

/// Per-request values every task can see.
#[derive(Debug, Clone, Default)]
pub struct TaskContext {
    pub session: Option<Session>,
    pub cancel: CancellationToken,
}

impl TaskContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_session(user_id: i64, token_id: i64) -> Self {
        Self {
            session: Some(Session { user_id, token_id }),
            cancel: CancellationToken::new(),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.session.map(|s| s.user_id)
    }

    pub fn check_cancelled(&self) -> Result<(), Status> {
        if self.cancel.is_cancelled() {
            Err(Status::cancelled("request cancelled"))
        } else {
            Ok(())
        }
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Collaborators shared by all tasks.
#[derive(Clone)]
pub struct Deps {
    pub db: DatabaseConnection,
    /// Shared id allocator. Without one, ids come from inside each job.
    pub ids: Option<Arc<IdAlloc>>,
    pub config: Arc<ConfigCell>,
    pub clock: Arc<dyn Clock>,
    pub fs: Arc<dyn PixFs>,
    pub http: reqwest::Client,
    pub decoder: Arc<dyn PicDecoder>,
}

impl Deps {
    pub async fn begin(&self) -> Result<Job, Status> {
        Job::begin(&self.db, self.ids.clone()).await
    }

    pub async fn config(&self, ctx: &TaskContext) -> Result<Arc<BackendConfig>, Status> {
        self.config.get(&ctx.cancel).await
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// A unit of backend work.
#[async_trait]
pub trait Task: Send {
    fn name(&self) -> &'static str;

    /// Do the work. May be called again after a retryable failure.
    async fn run(&mut self, ctx: &TaskContext) -> Result<(), Status>;

    /// Forget partial results before a rerun.
    fn reset_for_retry(&mut self) {}

    /// Called once after the last attempt, whatever its outcome.
    async fn clean_up(&mut self) {}
}

/// Commit `j` if `res` succeeded, otherwise roll it back.
pub(crate) async fn finish<T>(j: Job, res: Result<T, Status>) -> Result<T, Status> {
    match res {
        Ok(v) => {
            j.commit().await?;
            Ok(v)
        }
        Err(sts) => {
            if let Err(rb) = j.rollback().await {
                warn!(error = %rb, "Can't roll back job");
            }
            Err(sts)
        }
    }
}
