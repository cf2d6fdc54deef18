use async_trait::async_trait;
use common::{Capability, Status};
use tracing::debug;

use super::auth::{authed_job, lookup_object_user, require_capability, validate_capability};
use super::{Deps, Task, TaskContext, finish};
use crate::db::{Lock, PicVoteKey, ScanOpts};
use crate::schema::{PicVote, Vote};

/// Cast the caller's single vote on a pic.
pub struct AddPicVoteTask {
    deps: Deps,
    pub pic_id: i64,
    pub vote: Vote,
}

impl AddPicVoteTask {
    pub fn new(deps: Deps, pic_id: i64, vote: Vote) -> Self {
        Self { deps, pic_id, vote }
    }
}

#[async_trait]
impl Task for AddPicVoteTask {
    fn name(&self) -> &'static str {
        "add_pic_vote"
    }

    async fn run(&mut self, ctx: &TaskContext) -> Result<(), Status> {
        let (j, user, _) = require_capability(&self.deps, ctx, &[Capability::PicVoteCreate]).await?;
        let res: Result<_, Status> = async {
            let user = user
                .as_ref()
                .ok_or_else(|| Status::unauthenticated("can't vote anonymously"))?;
            if self.vote == Vote::Unknown {
                return Err(Status::invalid_argument("bad vote"));
            }
            let mut pic = j
                .lookup_pic(self.pic_id, Lock::Write)
                .await?
                .ok_or_else(|| Status::not_found("can't find pic"))?;
            if pic.hard_deleted() {
                return Err(Status::invalid_argument("can't vote on deleted pic"));
            }

            let key = PicVoteKey {
                pic_id: pic.pic_id,
                user_id: Some(user.user_id),
            };
            if !j.find_pic_votes(ScanOpts::prefix(key).lock(Lock::Write)).await?.is_empty() {
                return Err(Status::already_exists("can't double vote"));
            }

            let now = self.deps.now();
            j.insert_pic_vote(&PicVote {
                pic_id: pic.pic_id,
                user_id: user.user_id,
                vote: self.vote,
                created: now,
                modified: now,
            })
            .await
            .map_err(|sts| match sts.code() {
                common::Code::AlreadyExists => Status::already_exists("can't double vote"),
                _ => sts,
            })?;

            match self.vote {
                Vote::Up => pic.vote_up += 1,
                Vote::Down => pic.vote_down += 1,
                Vote::Neutral | Vote::Unknown => {}
            }
            pic.modified = now;
            j.update_pic(&pic).await
        }
        .await;
        finish(j, res).await?;
        debug!(pic_id = self.pic_id, vote = ?self.vote, "Added vote");
        Ok(())
    }
}

/// Read one user's vote on a pic.
pub struct LookupPicVoteTask {
    deps: Deps,
    pub pic_id: i64,
    /// Defaults to the caller.
    pub object_user_id: Option<i64>,

    pub vote: Option<PicVote>,
}

impl LookupPicVoteTask {
    pub fn new(deps: Deps, pic_id: i64, object_user_id: Option<i64>) -> Self {
        Self {
            deps,
            pic_id,
            object_user_id,
            vote: None,
        }
    }
}

#[async_trait]
impl Task for LookupPicVoteTask {
    fn name(&self) -> &'static str {
        "lookup_pic_vote"
    }

    fn reset_for_retry(&mut self) {
        self.vote = None;
    }

    async fn run(&mut self, ctx: &TaskContext) -> Result<(), Status> {
        let (j, subject) = authed_job(&self.deps, ctx).await?;
        let res: Result<_, Status> = async {
            let config = self.deps.config(ctx).await?;
            let object =
                lookup_object_user(&j, Lock::None, self.object_user_id, subject.as_ref()).await?;
            let needed = match &subject {
                Some(s) if s.user_id == object.user_id => Capability::UserReadSelf,
                _ => Capability::UserReadAll,
            };
            validate_capability(subject.as_ref(), &config, &[needed])?;

            let pic = j
                .lookup_pic(self.pic_id, Lock::None)
                .await?
                .ok_or_else(|| Status::not_found("can't find pic"))?;
            let votes = j
                .find_pic_votes(ScanOpts::prefix(PicVoteKey {
                    pic_id: pic.pic_id,
                    user_id: Some(object.user_id),
                }))
                .await?;
            Ok(votes.into_iter().next())
        }
        .await;
        self.vote = finish(j, res).await?;
        Ok(())
    }
}
