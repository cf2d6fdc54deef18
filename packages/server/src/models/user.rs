use chrono::{DateTime, Utc};
use common::Capability;
use serde::{Deserialize, Serialize};

use crate::models::shared::encode_id;
use crate::schema::User;

/// Request body for `CreateUser`.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "alice@example.com")]
    pub ident: String,
    pub secret: String,
}

/// Request body for `UpdateUser`.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateUserRequest {
    /// Version the caller last saw. Stale versions are rejected.
    pub version: i64,
    #[serde(default)]
    pub set_capability: Vec<Capability>,
    #[serde(default)]
    pub clear_capability: Vec<Capability>,
}

/// A user as shown to clients. Secrets and tokens are never included.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    #[schema(example = "k15m6")]
    pub user_id: String,
    pub ident: String,
    pub capability: Vec<Capability>,
    pub version: i64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            user_id: encode_id(u.user_id),
            version: u.version(),
            ident: u.ident,
            capability: u.capability,
            created: u.created,
            modified: u.modified,
            last_seen: u.last_seen,
        }
    }
}
