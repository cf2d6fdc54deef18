use async_trait::async_trait;
use common::Status;
use tracing::debug;

use super::{Deps, Task, TaskContext, finish};
use crate::db::{Job, Lock, ScanOpts, UserIdent};
use crate::schema::{User, UserToken};
use crate::utils::hash::verify_password;

/// How a caller proves who they are.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Log in and start a new session.
    Secret { ident: String, secret: String },
    /// Continue the session named by a refresh token.
    Token { user_id: i64, token_id: i64 },
}

/// Authenticate a user and start or continue a session.
pub struct AuthUserTask {
    deps: Deps,
    pub credentials: Credentials,

    pub user: Option<User>,
    pub token_id: Option<i64>,
}

impl AuthUserTask {
    pub fn new(deps: Deps, credentials: Credentials) -> Self {
        Self {
            deps,
            credentials,
            user: None,
            token_id: None,
        }
    }
}

async fn lookup_by_ident(j: &Job, ident: &str) -> Result<Option<User>, Status> {
    let users = j
        .find_users(ScanOpts::prefix(UserIdent(ident.to_owned())).lock(Lock::Write))
        .await?;
    Ok(users.into_iter().next())
}

/// Drop the least recently seen tokens until at most `max` remain.
fn evict_tokens(tokens: &mut Vec<UserToken>, max: usize) {
    if tokens.len() <= max {
        return;
    }
    tokens.sort_by_key(|t| (t.last_seen, t.token_id));
    let excess = tokens.len() - max;
    tokens.drain(..excess);
}

#[async_trait]
impl Task for AuthUserTask {
    fn name(&self) -> &'static str {
        "auth_user"
    }

    fn reset_for_retry(&mut self) {
        self.user = None;
        self.token_id = None;
    }

    async fn run(&mut self, ctx: &TaskContext) -> Result<(), Status> {
        let config = self.deps.config(ctx).await?;
        let j = self.deps.begin().await?;
        let now = self.deps.now();

        let res: Result<_, Status> = async {
            let (mut user, token_id) = match &self.credentials {
                Credentials::Secret { ident, secret } => {
                    if secret.len() > config.max_secret_length {
                        return Err(Status::invalid_argument("secret too long"));
                    }
                    let mut user = lookup_by_ident(&j, ident)
                        .await?
                        .ok_or_else(|| Status::unauthenticated("can't lookup user"))?;
                    let ok = verify_password(secret, &user.secret).map_err(|e| {
                        Status::unauthenticated("can't lookup user").with_cause(e.to_string())
                    })?;
                    if !ok {
                        return Err(Status::unauthenticated("can't lookup user"));
                    }
                    let token_id = user.next_token_id;
                    user.next_token_id += 1;
                    user.token.push(UserToken {
                        token_id,
                        created: now,
                        last_seen: now,
                    });
                    (user, token_id)
                }
                Credentials::Token { user_id, token_id } => {
                    let mut user = j
                        .lookup_user(*user_id, Lock::Write)
                        .await?
                        .ok_or_else(|| Status::unauthenticated("can't lookup user"))?;
                    let token = user
                        .token
                        .iter_mut()
                        .find(|t| t.token_id == *token_id)
                        .ok_or_else(|| Status::unauthenticated("can't find token"))?;
                    token.last_seen = now;
                    (user, *token_id)
                }
            };
            evict_tokens(&mut user.token, config.max_user_tokens);
            user.last_seen = Some(now);
            user.modified = now;
            j.update_user(&user).await?;
            Ok((user, token_id))
        }
        .await;

        let (user, token_id) = finish(j, res).await?;
        debug!(user_id = user.user_id, token_id, "Authenticated user");
        self.user = Some(user);
        self.token_id = Some(token_id);
        Ok(())
    }
}
