use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::capability::Capability;

/// Settings the backend tasks read on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Root directory holding pic originals and thumbnails.
    #[serde(default = "default_pix_path")]
    pub pix_path: PathBuf,
    /// Secret used to sign session tokens.
    #[serde(default)]
    pub token_secret: String,
    /// Capabilities of callers without a valid auth token.
    #[serde(default = "Capability::default_anonymous_set")]
    pub anonymous_capability: Vec<Capability>,
    /// Capabilities given to users created without an explicit set.
    #[serde(default = "Capability::default_user_set")]
    pub new_user_capability: Vec<Capability>,
    #[serde(default = "default_find_index_pics")]
    pub default_find_index_pics: u64,
    #[serde(default = "default_max_find_index_pics")]
    pub max_find_index_pics: u64,
    #[serde(default = "default_min_comment_length")]
    pub min_comment_length: usize,
    #[serde(default = "default_max_comment_length")]
    pub max_comment_length: usize,
    #[serde(default = "default_min_tag_length")]
    pub min_tag_length: usize,
    #[serde(default = "default_max_tag_length")]
    pub max_tag_length: usize,
    #[serde(default = "default_min_ident_length")]
    pub min_ident_length: usize,
    #[serde(default = "default_max_ident_length")]
    pub max_ident_length: usize,
    #[serde(default = "default_max_secret_length")]
    pub max_secret_length: usize,
    /// Upper bound on live sessions per user. Oldest by `last_seen` is evicted.
    #[serde(default = "default_max_user_tokens")]
    pub max_user_tokens: usize,
    /// Number of ids the shared allocator reserves per round trip.
    #[serde(default = "default_id_alloc_grab")]
    pub id_alloc_grab: i64,
    /// Extra attempts the task runner makes after a deadlock.
    #[serde(default = "default_max_task_retries")]
    pub max_task_retries: u8,
    /// Largest Hamming distance between DCT hashes still considered similar.
    #[serde(default = "default_similar_pics_max_distance")]
    pub similar_pics_max_distance: u32,
    /// Largest pic accepted, uploaded or downloaded.
    #[serde(default = "default_max_pic_bytes")]
    pub max_pic_bytes: u64,
}

fn default_pix_path() -> PathBuf {
    PathBuf::from("pix")
}
fn default_find_index_pics() -> u64 {
    30
}
fn default_max_find_index_pics() -> u64 {
    100
}
fn default_min_comment_length() -> usize {
    1
}
fn default_max_comment_length() -> usize {
    16384
}
fn default_min_tag_length() -> usize {
    1
}
fn default_max_tag_length() -> usize {
    255
}
fn default_min_ident_length() -> usize {
    1
}
fn default_max_ident_length() -> usize {
    255
}
fn default_max_secret_length() -> usize {
    255
}
fn default_max_user_tokens() -> usize {
    8
}
fn default_id_alloc_grab() -> i64 {
    1
}
fn default_max_task_retries() -> u8 {
    3
}
fn default_similar_pics_max_distance() -> u32 {
    10
}
fn default_max_pic_bytes() -> u64 {
    64 * 1024 * 1024
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            pix_path: default_pix_path(),
            token_secret: String::new(),
            anonymous_capability: Capability::default_anonymous_set(),
            new_user_capability: Capability::default_user_set(),
            default_find_index_pics: default_find_index_pics(),
            max_find_index_pics: default_max_find_index_pics(),
            min_comment_length: default_min_comment_length(),
            max_comment_length: default_max_comment_length(),
            min_tag_length: default_min_tag_length(),
            max_tag_length: default_max_tag_length(),
            min_ident_length: default_min_ident_length(),
            max_ident_length: default_max_ident_length(),
            max_secret_length: default_max_secret_length(),
            max_user_tokens: default_max_user_tokens(),
            id_alloc_grab: default_id_alloc_grab(),
            max_task_retries: default_max_task_retries(),
            similar_pics_max_distance: default_similar_pics_max_distance(),
            max_pic_bytes: default_max_pic_bytes(),
        }
    }
}
