use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named authorization bit held by a user or by the anonymous principal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    PicRead,
    PicIndex,
    PicCreate,
    PicUpdateViewCounter,
    PicTagCreate,
    PicCommentCreate,
    PicVoteCreate,
    PicSoftDelete,
    PicHardDelete,
    PicPurge,
    UserCreate,
    UserUpdateCapability,
    UserReadSelf,
    UserReadAll,
}

impl Capability {
    pub const ALL: [Capability; 14] = [
        Capability::PicRead,
        Capability::PicIndex,
        Capability::PicCreate,
        Capability::PicUpdateViewCounter,
        Capability::PicTagCreate,
        Capability::PicCommentCreate,
        Capability::PicVoteCreate,
        Capability::PicSoftDelete,
        Capability::PicHardDelete,
        Capability::PicPurge,
        Capability::UserCreate,
        Capability::UserUpdateCapability,
        Capability::UserReadSelf,
        Capability::UserReadAll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::PicRead => "PIC_READ",
            Capability::PicIndex => "PIC_INDEX",
            Capability::PicCreate => "PIC_CREATE",
            Capability::PicUpdateViewCounter => "PIC_UPDATE_VIEW_COUNTER",
            Capability::PicTagCreate => "PIC_TAG_CREATE",
            Capability::PicCommentCreate => "PIC_COMMENT_CREATE",
            Capability::PicVoteCreate => "PIC_VOTE_CREATE",
            Capability::PicSoftDelete => "PIC_SOFT_DELETE",
            Capability::PicHardDelete => "PIC_HARD_DELETE",
            Capability::PicPurge => "PIC_PURGE",
            Capability::UserCreate => "USER_CREATE",
            Capability::UserUpdateCapability => "USER_UPDATE_CAPABILITY",
            Capability::UserReadSelf => "USER_READ_SELF",
            Capability::UserReadAll => "USER_READ_ALL",
        }
    }

    /// Capabilities a fresh site grants to logged-in users.
    pub fn default_user_set() -> Vec<Capability> {
        vec![
            Capability::PicRead,
            Capability::PicIndex,
            Capability::PicCreate,
            Capability::PicUpdateViewCounter,
            Capability::PicTagCreate,
            Capability::PicCommentCreate,
            Capability::PicVoteCreate,
            Capability::UserReadSelf,
        ]
    }

    /// Capabilities a fresh site grants to anonymous visitors.
    pub fn default_anonymous_set() -> Vec<Capability> {
        vec![
            Capability::PicRead,
            Capability::PicIndex,
            Capability::PicUpdateViewCounter,
        ]
    }

    /// Everything, for the first administrator.
    pub fn admin_set() -> Vec<Capability> {
        Self::ALL.to_vec()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("unknown capability '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names() {
        assert_eq!("PIC_SOFT_DELETE".parse(), Ok(Capability::PicSoftDelete));
        assert_eq!("user_create".parse(), Ok(Capability::UserCreate));
        assert!("PIC_FLY".parse::<Capability>().is_err());
    }

    #[test]
    fn serde_uses_the_same_names_as_display() {
        for cap in Capability::ALL {
            let json = serde_json::to_string(&cap).unwrap();
            assert_eq!(json, format!("\"{cap}\""));
        }
    }

    #[test]
    fn admin_set_covers_bootstrap_needs() {
        let admin = Capability::admin_set();
        assert!(admin.contains(&Capability::PicSoftDelete));
        assert!(admin.contains(&Capability::UserUpdateCapability));
    }
}
