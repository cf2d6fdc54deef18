use chrono::{DateTime, Duration, Utc};
use common::config::BackendConfig;
use common::{Capability, Status};

use super::{Deps, TaskContext, finish};
use crate::db::{Job, Lock};
use crate::schema::User;

/// Token and user `last_seen` are only rewritten once this much time passed.
fn last_seen_update_threshold() -> Duration {
    Duration::hours(24)
}

/// Begin a job for `ctx` and load the acting user, if any.
///
/// A session whose token was revoked fails `UNAUTHENTICATED`. Stale
/// `last_seen` stamps are refreshed in a short job of their own first.
pub(crate) async fn authed_job(
    deps: &Deps,
    ctx: &TaskContext,
) -> Result<(Job, Option<User>), Status> {
    let j = deps.begin().await?;
    let Some(session) = ctx.session else {
        return Ok((j, None));
    };
    let now = deps.now();

    let res = touch_session(&j, session.user_id, session.token_id, Lock::None, now).await;
    let (user, stale) = match res {
        Ok(v) => v,
        Err(sts) => return finish(j, Err(sts)).await,
    };
    if !stale {
        return Ok((j, Some(user)));
    }
    finish(j, Ok(())).await?;

    let j = deps.begin().await?;
    let res: Result<_, Status> = async {
        let (user, stale) =
            touch_session(&j, session.user_id, session.token_id, Lock::Write, now).await?;
        if stale {
            j.update_user(&user).await?;
        }
        Ok(())
    }
    .await;
    finish(j, res).await?;

    let j = deps.begin().await?;
    match lookup_session_user(&j, session.user_id, session.token_id).await {
        Ok(user) => Ok((j, Some(user))),
        Err(sts) => finish(j, Err(sts)).await,
    }
}

async fn lookup_session_user(j: &Job, user_id: i64, token_id: i64) -> Result<User, Status> {
    let user = j
        .lookup_user(user_id, Lock::None)
        .await?
        .ok_or_else(|| Status::unauthenticated("can't lookup user"))?;
    if user.find_token(token_id).is_none() {
        return Err(Status::unauthenticated("token id has been deleted"));
    }
    Ok(user)
}

/// Load the session user and bump stale `last_seen` stamps in memory.
/// Returns whether anything changed. `modified` is left alone since it
/// carries the user's version.
async fn touch_session(
    j: &Job,
    user_id: i64,
    token_id: i64,
    lock: Lock,
    now: DateTime<Utc>,
) -> Result<(User, bool), Status> {
    let mut user = j
        .lookup_user(user_id, lock)
        .await?
        .ok_or_else(|| Status::unauthenticated("can't lookup user"))?;
    let cutoff = now - last_seen_update_threshold();
    let token = user
        .token
        .iter_mut()
        .find(|t| t.token_id == token_id)
        .ok_or_else(|| Status::unauthenticated("token id has been deleted"))?;

    let mut stale = false;
    if token.last_seen < cutoff {
        token.last_seen = now;
        stale = true;
    }
    if user.last_seen.is_some_and(|seen| seen < cutoff) {
        user.last_seen = Some(now);
        stale = true;
    }
    Ok((user, stale))
}

/// Check that `user`, or the anonymous principal if `None`, holds every cap.
pub(crate) fn validate_capability(
    user: Option<&User>,
    config: &BackendConfig,
    caps: &[Capability],
) -> Result<(), Status> {
    let have = match user {
        Some(u) => &u.capability,
        None => &config.anonymous_capability,
    };
    match caps.iter().find(|c| !have.contains(c)) {
        Some(missing) => Err(Status::permission_denied(format!("missing cap {missing}"))),
        None => Ok(()),
    }
}

/// [`authed_job`] followed by a capability check.
pub(crate) async fn require_capability(
    deps: &Deps,
    ctx: &TaskContext,
    caps: &[Capability],
) -> Result<(Job, Option<User>, std::sync::Arc<BackendConfig>), Status> {
    let (j, user) = authed_job(deps, ctx).await?;
    let checked = match deps.config(ctx).await {
        Ok(config) => validate_capability(user.as_ref(), &config, caps).map(|()| config),
        Err(sts) => Err(sts),
    };
    match checked {
        Ok(config) => Ok((j, user, config)),
        Err(sts) => finish(j, Err(sts)).await,
    }
}

/// The user an operation acts on: `object_user_id` if given, else the subject.
pub(crate) async fn lookup_object_user(
    j: &Job,
    lock: Lock,
    object_user_id: Option<i64>,
    subject: Option<&User>,
) -> Result<User, Status> {
    let object_id = match (object_user_id, subject) {
        (Some(id), _) => id,
        (None, Some(s)) => s.user_id,
        (None, None) => return Err(Status::invalid_argument("no user specified")),
    };
    if let Some(s) = subject.filter(|s| s.user_id == object_id) {
        if lock == Lock::None {
            return Ok(s.clone());
        }
    }
    j.lookup_user(object_id, lock)
        .await?
        .ok_or_else(|| Status::not_found("can't lookup user"))
}
