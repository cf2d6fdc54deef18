use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub tag_id: i64,
    pub name: String,
    /// Number of pics this tag is attached to.
    pub usage_count: i64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PicTag {
    pub pic_id: i64,
    pub tag_id: i64,
    /// Copy of the tag name.
    pub name: String,
    pub user_id: Option<i64>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}
