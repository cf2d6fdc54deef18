use async_trait::async_trait;
use common::{Capability, Status};
use tracing::debug;

use super::auth::require_capability;
use super::{Deps, Task, TaskContext, finish};
use crate::db::{Lock, PicCommentKey, ScanOpts};
use crate::schema::PicComment;
use crate::utils::text::{check_length, normalize_graphic_text};

/// Comment on a pic, optionally in reply to another comment on it.
pub struct AddPicCommentTask {
    deps: Deps,
    pub pic_id: i64,
    /// 0 for a top level comment.
    pub comment_parent_id: i64,
    pub text: String,

    pub comment: Option<PicComment>,
}

impl AddPicCommentTask {
    pub fn new(deps: Deps, pic_id: i64, comment_parent_id: i64, text: impl Into<String>) -> Self {
        Self {
            deps,
            pic_id,
            comment_parent_id,
            text: text.into(),
            comment: None,
        }
    }
}

#[async_trait]
impl Task for AddPicCommentTask {
    fn name(&self) -> &'static str {
        "add_pic_comment"
    }

    fn reset_for_retry(&mut self) {
        self.comment = None;
    }

    async fn run(&mut self, ctx: &TaskContext) -> Result<(), Status> {
        let (j, user, config) =
            require_capability(&self.deps, ctx, &[Capability::PicCommentCreate]).await?;
        let res: Result<_, Status> = async {
            let text = normalize_graphic_text(&self.text);
            check_length(&text, "comment", config.min_comment_length, config.max_comment_length)?;

            let pic = j
                .lookup_pic(self.pic_id, Lock::Read)
                .await?
                .ok_or_else(|| Status::not_found("can't find pic"))?;
            if pic.hard_deleted() {
                return Err(Status::invalid_argument("can't comment on deleted pic"));
            }
            if self.comment_parent_id != 0 {
                let parent = j
                    .find_pic_comments(ScanOpts::prefix(PicCommentKey {
                        pic_id: pic.pic_id,
                        comment_id: Some(self.comment_parent_id),
                    }))
                    .await?;
                if parent.is_empty() {
                    return Err(Status::not_found("can't find comment parent"));
                }
            }

            let now = self.deps.now();
            let comment = PicComment {
                pic_id: pic.pic_id,
                comment_id: j.alloc_id().await?,
                comment_parent_id: self.comment_parent_id,
                user_id: user.as_ref().map(|u| u.user_id),
                text,
                created: now,
                modified: now,
            };
            j.insert_pic_comment(&comment).await?;
            Ok(comment)
        }
        .await;

        let comment = finish(j, res).await?;
        debug!(pic_id = comment.pic_id, comment_id = comment.comment_id, "Added comment");
        self.comment = Some(comment);
        Ok(())
    }
}
