use async_trait::async_trait;
use common::{Capability, Status};
use tracing::info;

use super::auth::require_capability;
use super::hard_delete::remove_pic_files;
use super::tags::decrement_tags;
use super::{Deps, Task, TaskContext, finish};
use crate::db::{Lock, PicCommentKey, PicIdentKey, PicTagKey, PicVoteKey, ScanOpts};

/// Delete a pic and everything that refers to it.
pub struct PurgePicTask {
    deps: Deps,
    pub pic_id: i64,
}

impl PurgePicTask {
    pub fn new(deps: Deps, pic_id: i64) -> Self {
        Self { deps, pic_id }
    }
}

#[async_trait]
impl Task for PurgePicTask {
    fn name(&self) -> &'static str {
        "purge_pic"
    }

    async fn run(&mut self, ctx: &TaskContext) -> Result<(), Status> {
        let (j, _, config) = require_capability(&self.deps, ctx, &[Capability::PicPurge]).await?;
        let pic_id = self.pic_id;
        let res: Result<_, Status> = async {
            let pic = j
                .lookup_pic(pic_id, Lock::Write)
                .await?
                .ok_or_else(|| Status::not_found("can't find pic"))?;
            let now = self.deps.now();

            let idents = j
                .find_pic_idents(ScanOpts::prefix(PicIdentKey(pic_id)).lock(Lock::Write))
                .await?;
            for ident in &idents {
                j.delete_pic_ident(ident).await?;
            }

            let pic_tags = j
                .find_pic_tags(ScanOpts::prefix(PicTagKey::pic(pic_id)).lock(Lock::Write))
                .await?;
            for pt in &pic_tags {
                j.delete_pic_tag(pt.pic_id, pt.tag_id).await?;
            }
            decrement_tags(&j, &pic_tags, now).await?;

            let comments = j
                .find_pic_comments(
                    ScanOpts::prefix(PicCommentKey {
                        pic_id,
                        comment_id: None,
                    })
                    .lock(Lock::Write),
                )
                .await?;
            for c in &comments {
                j.delete_pic_comment(c.pic_id, c.comment_id).await?;
            }

            let votes = j
                .find_pic_votes(
                    ScanOpts::prefix(PicVoteKey {
                        pic_id,
                        user_id: None,
                    })
                    .lock(Lock::Write),
                )
                .await?;
            for v in &votes {
                j.delete_pic_vote(v.pic_id, v.user_id).await?;
            }

            j.delete_pic(pic_id).await?;
            Ok(pic)
        }
        .await;
        let pic = finish(j, res).await?;

        remove_pic_files(&self.deps, &config.pix_path, &pic).await;
        info!(pic_id, "Purged pic");
        Ok(())
    }
}
