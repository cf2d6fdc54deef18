use std::sync::Arc;

use common::storage::filesystem::OsPixFs;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::db::IdAlloc;
use crate::error::AppError;
use crate::imaging::ImageDecoder;
use crate::tasks::{ConfigCell, Deps, SystemClock, Task, TaskContext, TaskRunner};
use crate::utils::tokens::TokenCoder;

#[derive(Clone)]
pub struct AppState {
    pub deps: Deps,
    pub runner: TaskRunner,
    pub coder: Arc<TokenCoder>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire production collaborators around `db`.
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Self {
        let backend = ConfigCell::with_config(config.backend.clone());
        let deps = Deps {
            ids: Some(Arc::new(IdAlloc::new(db.clone(), config.backend.id_alloc_grab))),
            db,
            config: Arc::new(backend),
            clock: Arc::new(SystemClock),
            fs: Arc::new(OsPixFs),
            http: reqwest::Client::new(),
            decoder: Arc::new(ImageDecoder),
        };
        Self {
            runner: TaskRunner::new(deps.config.clone()),
            coder: Arc::new(TokenCoder::new(config.backend.token_secret.as_bytes())),
            config: Arc::new(config),
            deps,
        }
    }

    /// Run `task` for the caller in `ctx`.
    pub async fn run<T: Task>(&self, ctx: &TaskContext, task: &mut T) -> Result<(), AppError> {
        self.runner.run(ctx, task).await.map_err(AppError)
    }
}
