//! Attaching tags to pics while keeping `usage_count` in step with the
//! `PicTags` rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::config::BackendConfig;
use common::{Capability, Status};

use super::auth::require_capability;
use super::{Deps, Task, TaskContext, finish};
use crate::db::{Job, Lock, PicTagKey, ScanOpts, TagId, TagName, retry_on_conflict};
use crate::schema::{PicTag, Tag};
use crate::utils::text::clean_tag_names;

/// Attach `raw` tag names to `pic_id`, creating tags that do not exist yet.
pub(crate) async fn upsert_tags(
    j: &Job,
    raw: &[String],
    pic_id: i64,
    now: DateTime<Utc>,
    user_id: Option<i64>,
    config: &BackendConfig,
) -> Result<(), Status> {
    let names = clean_tag_names(raw, config.min_tag_length, config.max_tag_length)?;
    if names.is_empty() {
        return Ok(());
    }

    let attached = j
        .find_pic_tags(ScanOpts::prefix(PicTagKey::pic(pic_id)).lock(Lock::Read))
        .await?;
    let unattached: Vec<String> = names
        .into_iter()
        .filter(|n| !attached.iter().any(|pt| &pt.name == n))
        .collect();

    let mut tags = Vec::with_capacity(unattached.len());
    for name in unattached {
        let found = j
            .find_tags(ScanOpts::prefix(TagName(name.clone())).lock(Lock::Write))
            .await?;
        let tag = match found.into_iter().next() {
            Some(mut tag) => {
                tag.usage_count += 1;
                tag.modified = now;
                j.update_tag(&tag).await?;
                tag
            }
            None => {
                let tag = Tag {
                    tag_id: j.alloc_id().await?,
                    name,
                    usage_count: 1,
                    created: now,
                    modified: now,
                };
                // Another upload may be creating the same tag.
                j.insert_tag(&tag).await.map_err(retry_on_conflict)?;
                tag
            }
        };
        tags.push(tag);
    }

    for tag in tags {
        j.insert_pic_tag(&PicTag {
            pic_id,
            tag_id: tag.tag_id,
            name: tag.name,
            user_id,
            created: now,
            modified: now,
        })
        .await?;
    }
    Ok(())
}

/// Release the tags behind detached `pic_tags`, deleting the ones no pic uses anymore.
pub(crate) async fn decrement_tags(
    j: &Job,
    pic_tags: &[PicTag],
    now: DateTime<Utc>,
) -> Result<(), Status> {
    for pt in pic_tags {
        let found = j
            .find_tags(ScanOpts::prefix(TagId(pt.tag_id)).lock(Lock::Write))
            .await?;
        let Some(mut tag) = found.into_iter().next() else {
            return Err(Status::internal(format!("can't find tag {}", pt.tag_id)));
        };
        if tag.usage_count > 1 {
            tag.usage_count -= 1;
            tag.modified = now;
            j.update_tag(&tag).await?;
        } else {
            j.delete_tag(tag.tag_id).await?;
        }
    }
    Ok(())
}

/// Add tags to an existing pic.
pub struct AddPicTagsTask {
    deps: Deps,
    pub pic_id: i64,
    pub tags: Vec<String>,
}

impl AddPicTagsTask {
    pub fn new(deps: Deps, pic_id: i64, tags: Vec<String>) -> Self {
        Self { deps, pic_id, tags }
    }
}

#[async_trait]
impl Task for AddPicTagsTask {
    fn name(&self) -> &'static str {
        "add_pic_tags"
    }

    async fn run(&mut self, ctx: &TaskContext) -> Result<(), Status> {
        let (j, user, config) =
            require_capability(&self.deps, ctx, &[Capability::PicTagCreate]).await?;
        let res: Result<_, Status> = async {
            let mut pic = j
                .lookup_pic(self.pic_id, Lock::Write)
                .await?
                .ok_or_else(|| Status::not_found("can't find pic"))?;
            if pic.hard_deleted() {
                return Err(Status::invalid_argument("can't tag deleted pic"));
            }
            let now = self.deps.now();
            upsert_tags(&j, &self.tags, pic.pic_id, now, user.as_ref().map(|u| u.user_id), &config).await?;
            pic.modified = now;
            j.update_pic(&pic).await
        }
        .await;
        finish(j, res).await
    }
}
