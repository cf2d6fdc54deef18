use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::shared::encode_id;
use crate::schema::{DeletionReason, Mime, Pic, PicComment, PicTag, PicVote, Vote};
use crate::tasks::CommentNode;

/// Deletion state of a hidden pic.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DeletionResponse {
    pub marked_deleted: DateTime<Utc>,
    pub pending_deleted: Option<DateTime<Utc>>,
    pub actual_deleted: Option<DateTime<Utc>>,
    pub reason: DeletionReason,
    pub details: String,
    pub temporary: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PicResponse {
    #[schema(example = "k15m6")]
    pub pic_id: String,
    #[schema(example = "pix/k15m6.png")]
    pub relative_url: String,
    #[schema(example = "pix/k15m6s.png")]
    pub thumbnail_relative_url: String,
    pub mime: Mime,
    pub width: i64,
    pub height: i64,
    pub file_size: i64,
    /// Loop length of animated pics.
    pub duration_ms: Option<i64>,
    pub view_count: i64,
    pub vote_up: i64,
    pub vote_down: i64,
    /// Lower bound of the vote score, scaled to 2^30.
    pub score_lower: i32,
    pub version: i64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub deletion: Option<DeletionResponse>,
}

impl From<Pic> for PicResponse {
    fn from(p: Pic) -> Self {
        Self {
            pic_id: p.var_pic_id(),
            relative_url: p.relative_url(),
            thumbnail_relative_url: p.thumbnail_relative_url(),
            score_lower: p.lower_score_bound(),
            version: p.version(),
            mime: p.mime,
            width: p.width,
            height: p.height,
            file_size: p.file_size,
            duration_ms: p.animation_info.map(|a| a.duration_ms),
            view_count: p.view_count,
            vote_up: p.vote_up,
            vote_down: p.vote_down,
            created: p.created,
            modified: p.modified,
            deletion: p.deletion_status.map(|ds| DeletionResponse {
                marked_deleted: ds.marked_deleted,
                pending_deleted: ds.pending_deleted,
                actual_deleted: ds.actual_deleted,
                reason: ds.reason,
                details: ds.details,
                temporary: ds.temporary,
            }),
        }
    }
}

/// Query for `FindIndexPics`.
#[derive(Deserialize, Default, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FindIndexPicsQuery {
    /// Varint pic id to page from.
    pub start_pic_id: Option<String>,
    /// Page towards newer pics. Defaults to newest first.
    #[serde(default)]
    pub ascending: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PicListResponse {
    pub pics: Vec<PicResponse>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PicTagResponse {
    pub tag_id: String,
    pub name: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<PicTag> for PicTagResponse {
    fn from(pt: PicTag) -> Self {
        Self {
            tag_id: encode_id(pt.tag_id),
            name: pt.name,
            created: pt.created,
            modified: pt.modified,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CommentResponse {
    pub pic_id: String,
    pub comment_id: String,
    /// `"0"` for top level comments.
    pub comment_parent_id: String,
    pub user_id: Option<String>,
    pub text: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<PicComment> for CommentResponse {
    fn from(c: PicComment) -> Self {
        Self {
            pic_id: encode_id(c.pic_id),
            comment_id: encode_id(c.comment_id),
            comment_parent_id: encode_id(c.comment_parent_id),
            user_id: c.user_id.map(encode_id),
            text: c.text,
            created: c.created,
            modified: c.modified,
        }
    }
}

/// One comment and its replies. The root has no comment.
#[derive(Serialize, utoipa::ToSchema)]
#[schema(no_recursion)]
pub struct CommentTreeResponse {
    pub comment: Option<CommentResponse>,
    pub children: Vec<CommentTreeResponse>,
}

impl From<CommentNode> for CommentTreeResponse {
    fn from(node: CommentNode) -> Self {
        Self {
            comment: node.comment.map(CommentResponse::from),
            children: node.children.into_iter().map(Self::from).collect(),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PicDetailsResponse {
    pub pic: PicResponse,
    pub pic_tags: Vec<PicTagResponse>,
    pub comment_tree: CommentTreeResponse,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AddCommentRequest {
    /// Varint id of the comment replied to. Absent or `"0"` for top level.
    pub comment_parent_id: Option<String>,
    pub text: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AddTagsRequest {
    pub tags: Vec<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpsertVoteRequest {
    pub vote: Vote,
}

#[derive(Deserialize, Default, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LookupVoteQuery {
    /// Whose vote to read. Defaults to the caller.
    pub user_id: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VoteResponse {
    pub pic_id: String,
    pub user_id: String,
    pub vote: Vote,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<PicVote> for VoteResponse {
    fn from(v: PicVote) -> Self {
        Self {
            pic_id: encode_id(v.pic_id),
            user_id: encode_id(v.user_id),
            vote: v.vote,
            created: v.created,
            modified: v.modified,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LookupVoteResponse {
    pub vote: Option<VoteResponse>,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct SoftDeleteRequest {
    #[serde(default)]
    pub reason: DeletionReason,
    #[serde(default)]
    pub details: String,
    /// Allow the same bytes to revive the pic later.
    #[serde(default)]
    pub temporary: bool,
    /// When the pic should be hard deleted. Defaults to a week from now.
    pub deletion_time: Option<DateTime<Utc>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SimilarPicsResponse {
    pub pic_ids: Vec<String>,
}

#[derive(Deserialize, Default, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReadPicQuery {
    #[serde(default)]
    pub thumbnail: bool,
    #[serde(default)]
    pub offset: u64,
    /// Bytes to read, 0 for the rest of the file.
    #[serde(default)]
    pub limit: u64,
}
