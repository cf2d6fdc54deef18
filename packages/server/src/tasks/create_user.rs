use async_trait::async_trait;
use common::{Capability, Status};
use tracing::info;

use super::auth::require_capability;
use super::{Deps, Task, TaskContext, finish};
use crate::schema::User;
use crate::utils::hash::hash_password;
use crate::utils::text::{check_length, normalize_print_text};

/// Register a new user.
pub struct CreateUserTask {
    deps: Deps,
    pub ident: String,
    pub secret: String,
    /// Overrides `new_user_capability` when set.
    pub capability: Option<Vec<Capability>>,

    pub created_user: Option<User>,
}

impl CreateUserTask {
    pub fn new(deps: Deps, ident: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            deps,
            ident: ident.into(),
            secret: secret.into(),
            capability: None,
            created_user: None,
        }
    }
}

#[async_trait]
impl Task for CreateUserTask {
    fn name(&self) -> &'static str {
        "create_user"
    }

    fn reset_for_retry(&mut self) {
        self.created_user = None;
    }

    async fn run(&mut self, ctx: &TaskContext) -> Result<(), Status> {
        let (j, _, config) = require_capability(&self.deps, ctx, &[Capability::UserCreate]).await?;
        let res: Result<_, Status> = async {
            let ident = normalize_print_text(&self.ident);
            check_length(&ident, "ident", config.min_ident_length, config.max_ident_length)?;
            if self.secret.is_empty() {
                return Err(Status::invalid_argument("missing secret"));
            }
            check_length(&self.secret, "secret", 1, config.max_secret_length)?;

            let secret = hash_password(&self.secret)
                .map_err(|e| Status::internal("can't hash secret").with_cause(e.to_string()))?;
            let now = self.deps.now();
            let user = User {
                user_id: j.alloc_id().await?,
                ident,
                secret,
                capability: self
                    .capability
                    .clone()
                    .unwrap_or_else(|| config.new_user_capability.clone()),
                next_token_id: 1,
                token: Vec::new(),
                created: now,
                modified: now,
                last_seen: None,
            };
            j.insert_user(&user).await?;
            Ok(user)
        }
        .await;

        let user = finish(j, res).await?;
        info!(user_id = user.user_id, "Created user");
        self.created_user = Some(user);
        Ok(())
    }
}
