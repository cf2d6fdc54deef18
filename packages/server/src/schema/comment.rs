use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PicComment {
    pub pic_id: i64,
    pub comment_id: i64,
    /// 0 for top level comments.
    pub comment_parent_id: i64,
    pub user_id: Option<i64>,
    pub text: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}
