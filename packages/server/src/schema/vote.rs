use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Vote {
    #[default]
    Unknown,
    Up,
    Down,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PicVote {
    pub pic_id: i64,
    pub user_id: i64,
    pub vote: Vote,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}
