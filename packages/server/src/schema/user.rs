use chrono::{DateTime, Utc};
use common::Capability;
use serde::{Deserialize, Serialize};

use super::pic::nanos;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserToken {
    pub token_id: i64,
    pub created: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub ident: String,
    /// Password hash in PHC string form.
    pub secret: String,
    pub capability: Vec<Capability>,
    pub next_token_id: i64,
    pub token: Vec<UserToken>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl User {
    /// Optimistic concurrency token.
    pub fn version(&self) -> i64 {
        nanos(self.modified)
    }

    pub fn has_capability(&self, cap: Capability) -> bool {
        self.capability.contains(&cap)
    }

    pub fn find_token(&self, token_id: i64) -> Option<&UserToken> {
        self.token.iter().find(|t| t.token_id == token_id)
    }
}
