use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::Capability;
use common::config::BackendConfig;
use common::storage::filesystem::OsPixFs;
use sea_orm::DatabaseConnection;
use tempfile::TempDir;

use super::{Clock, ConfigCell, Deps, Task, TaskContext, TaskRunner, UpsertPicInput, UpsertPicTask};
use crate::db::testing::memory_db;
use crate::db::{Job, Lock};
use crate::imaging::ImageDecoder;
use crate::schema::{Pic, User, UserToken};

/// A clock that only moves when told to.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new() -> Self {
        Self(Mutex::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Deps over an in-memory database and a scratch pix directory.
pub struct TestEnv {
    pub deps: Deps,
    pub db: DatabaseConnection,
    pub clock: Arc<ManualClock>,
    pub pix: TempDir,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(tweak: impl FnOnce(&mut BackendConfig)) -> Self {
        let pix = tempfile::tempdir().unwrap();
        let mut config = BackendConfig {
            pix_path: pix.path().to_path_buf(),
            token_secret: "unit test secret".into(),
            ..BackendConfig::default()
        };
        tweak(&mut config);

        let db = memory_db().await;
        let clock = Arc::new(ManualClock::new());
        let deps = Deps {
            db: db.clone(),
            ids: None,
            config: Arc::new(ConfigCell::with_config(config)),
            clock: clock.clone(),
            fs: Arc::new(OsPixFs),
            http: reqwest::Client::new(),
            decoder: Arc::new(ImageDecoder),
        };
        Self {
            deps,
            db,
            clock,
            pix,
        }
    }

    pub fn runner(&self) -> TaskRunner {
        TaskRunner::new(self.deps.config.clone())
    }

    pub async fn run<T: Task>(&self, ctx: &TaskContext, task: &mut T) -> Result<(), common::Status> {
        self.runner().run(ctx, task).await
    }

    /// Insert a user holding `caps` with one live token. Its secret is not a valid hash.
    pub async fn user_with_token(&self, caps: &[Capability]) -> (User, i64) {
        let now = self.clock.now();
        let j = self.job().await;
        let user_id = j.alloc_id().await.unwrap();
        let user = User {
            user_id,
            ident: format!("user{user_id}@example.com"),
            secret: String::new(),
            capability: caps.to_vec(),
            next_token_id: 2,
            token: vec![UserToken {
                token_id: 1,
                created: now,
                last_seen: now,
            }],
            created: now,
            modified: now,
            last_seen: Some(now),
        };
        j.insert_user(&user).await.unwrap();
        j.commit().await.unwrap();
        (user, 1)
    }

    /// A context authenticated as a fresh user holding `caps`.
    pub async fn session(&self, caps: &[Capability]) -> (User, TaskContext) {
        let (user, token_id) = self.user_with_token(caps).await;
        let ctx = TaskContext::for_session(user.user_id, token_id);
        (user, ctx)
    }

    pub async fn job(&self) -> Job {
        Job::begin(&self.db, None).await.unwrap()
    }

    pub async fn load_user(&self, user_id: i64) -> User {
        let j = self.job().await;
        let user = j.lookup_user(user_id, Lock::None).await.unwrap().unwrap();
        j.rollback().await.unwrap();
        user
    }

    pub async fn load_pic(&self, pic_id: i64) -> Option<Pic> {
        let j = self.job().await;
        let pic = j.lookup_pic(pic_id, Lock::None).await.unwrap();
        j.rollback().await.unwrap();
        pic
    }

    /// Insert a visible pic created at the current clock time.
    pub async fn insert_pic(&self) -> Pic {
        let j = self.job().await;
        let pic_id = j.alloc_id().await.unwrap();
        let mut pic = crate::schema::sample_pic(pic_id);
        pic.created = self.clock.now();
        pic.modified = pic.created;
        j.insert_pic(&pic).await.unwrap();
        j.commit().await.unwrap();
        pic
    }

    /// Upload `data` through [`UpsertPicTask`].
    pub async fn upload(
        &self,
        ctx: &TaskContext,
        data: Vec<u8>,
        tags: &[&str],
    ) -> Result<Pic, common::Status> {
        let input = UpsertPicInput {
            data: Some(data.into()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..UpsertPicInput::default()
        };
        let mut task = UpsertPicTask::new(self.deps.clone(), input);
        self.run(ctx, &mut task).await?;
        Ok(task.pic.unwrap())
    }

    /// Names of files left directly in the pix root, e.g. stray temp files.
    pub fn loose_files(&self) -> Vec<String> {
        std::fs::read_dir(self.pix.path())
            .unwrap()
            .map(|e| e.unwrap())
            .filter(|e| e.file_type().unwrap().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect()
    }

    pub async fn store_pic(&self, pic: &Pic) {
        let j = self.job().await;
        j.update_pic(pic).await.unwrap();
        j.commit().await.unwrap();
    }
}
