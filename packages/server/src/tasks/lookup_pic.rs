use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use common::{Capability, Status};

use super::auth::require_capability;
use super::{Deps, Task, TaskContext, finish};
use crate::db::{Lock, PicCommentKey, PicTagKey, ScanOpts};
use crate::schema::{Pic, PicComment, PicTag};

/// A comment and its replies. The root of a tree has no comment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommentNode {
    pub comment: Option<PicComment>,
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    /// Arrange comments under a virtual root with id 0. Comments whose parent
    /// is missing are attached to the root.
    pub fn build(comments: Vec<PicComment>) -> Self {
        let ids: HashSet<i64> = comments.iter().map(|c| c.comment_id).collect();
        let mut by_parent: HashMap<i64, Vec<PicComment>> = HashMap::new();
        for c in comments {
            let parent = if ids.contains(&c.comment_parent_id) && c.comment_parent_id != c.comment_id {
                c.comment_parent_id
            } else {
                0
            };
            by_parent.entry(parent).or_default().push(c);
        }
        CommentNode {
            comment: None,
            children: Self::children_of(0, &mut by_parent),
        }
    }

    fn children_of(parent: i64, by_parent: &mut HashMap<i64, Vec<PicComment>>) -> Vec<CommentNode> {
        let mut kids = by_parent.remove(&parent).unwrap_or_default();
        kids.sort_by_key(|c| (c.created, c.comment_id));
        kids.into_iter()
            .map(|c| {
                let children = Self::children_of(c.comment_id, by_parent);
                CommentNode {
                    comment: Some(c),
                    children,
                }
            })
            .collect()
    }

    /// Number of comments in the tree, excluding the root.
    pub fn len(&self) -> usize {
        self.children.iter().map(|c| 1 + c.len()).sum()
    }
}

/// Load a pic with its tags and comments.
pub struct LookupPicDetailsTask {
    deps: Deps,
    pub pic_id: i64,

    pub pic: Option<Pic>,
    pub pic_tags: Vec<PicTag>,
    pub comment_tree: CommentNode,
}

impl LookupPicDetailsTask {
    pub fn new(deps: Deps, pic_id: i64) -> Self {
        Self {
            deps,
            pic_id,
            pic: None,
            pic_tags: Vec::new(),
            comment_tree: CommentNode::default(),
        }
    }
}

#[async_trait]
impl Task for LookupPicDetailsTask {
    fn name(&self) -> &'static str {
        "lookup_pic_details"
    }

    fn reset_for_retry(&mut self) {
        self.pic = None;
        self.pic_tags.clear();
        self.comment_tree = CommentNode::default();
    }

    async fn run(&mut self, ctx: &TaskContext) -> Result<(), Status> {
        let (j, _, _) = require_capability(&self.deps, ctx, &[Capability::PicIndex]).await?;
        let res: Result<_, Status> = async {
            let pic = j
                .lookup_pic(self.pic_id, Lock::None)
                .await?
                .ok_or_else(|| Status::not_found("can't find pic"))?;
            let pic_tags = j
                .find_pic_tags(ScanOpts::prefix(PicTagKey::pic(pic.pic_id)))
                .await?;
            let comments = j
                .find_pic_comments(ScanOpts::prefix(PicCommentKey {
                    pic_id: pic.pic_id,
                    comment_id: None,
                }))
                .await?;
            Ok((pic, pic_tags, comments))
        }
        .await;

        let (pic, pic_tags, comments) = finish(j, res).await?;
        self.pic = Some(pic);
        self.pic_tags = pic_tags;
        self.comment_tree = CommentNode::build(comments);
        Ok(())
    }
}
