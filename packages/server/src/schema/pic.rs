use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use common::Varint;
use common::storage;
use serde::{Deserialize, Serialize};

/// z for a 95% two-sided interval.
pub const Z_99: f64 = 1.95996398612;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mime {
    Jpeg,
    Gif,
    Png,
    Webm,
}

impl Mime {
    pub fn ext(&self) -> &'static str {
        match self {
            Mime::Jpeg => "jpg",
            Mime::Gif => "gif",
            Mime::Png => "png",
            Mime::Webm => "webm",
        }
    }

    /// Thumbnails are stills: JPEG for lossy sources, PNG for the rest.
    pub fn thumbnail_ext(&self) -> &'static str {
        match self {
            Mime::Jpeg | Mime::Webm => "jpg",
            Mime::Gif | Mime::Png => "png",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Mime::Jpeg => "image/jpeg",
            Mime::Gif => "image/gif",
            Mime::Png => "image/png",
            Mime::Webm => "video/webm",
        }
    }

    pub fn thumbnail_content_type(&self) -> &'static str {
        match self.thumbnail_ext() {
            "jpg" => "image/jpeg",
            _ => "image/png",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeletionReason {
    #[default]
    Unknown,
    /// No reason given, e.g. a hard delete without a prior soft delete.
    None,
    RuleViolation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionStatus {
    pub marked_deleted: DateTime<Utc>,
    pub pending_deleted: Option<DateTime<Utc>>,
    pub actual_deleted: Option<DateTime<Utc>>,
    pub reason: DeletionReason,
    pub details: String,
    /// Re-uploading the same bytes revives the pic.
    pub temporary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationInfo {
    /// Total play time of one loop.
    pub duration_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSource {
    pub url: String,
    pub referrer: String,
    pub created: DateTime<Utc>,
    pub user_id: Option<i64>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pic {
    pub pic_id: i64,
    pub file_size: i64,
    pub mime: Mime,
    pub width: i64,
    pub height: i64,
    pub animation_info: Option<AnimationInfo>,
    pub view_count: i64,
    pub vote_up: i64,
    pub vote_down: i64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub deletion_status: Option<DeletionStatus>,
    #[serde(default)]
    pub file_source: Vec<FileSource>,
}

impl Pic {
    /// Optimistic concurrency token.
    pub fn version(&self) -> i64 {
        nanos(self.modified)
    }

    pub fn non_hidden_index_order(&self) -> i64 {
        nanos(self.created)
    }

    /// Browse order stored in the index column; negated while hidden.
    pub fn index_order(&self) -> i64 {
        if self.is_hidden() {
            -self.non_hidden_index_order()
        } else {
            self.non_hidden_index_order()
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.deletion_status.is_some()
    }

    pub fn soft_deleted(&self) -> bool {
        self.deletion_status.is_some() && !self.hard_deleted()
    }

    pub fn hard_deleted(&self) -> bool {
        self.deletion_status
            .as_ref()
            .is_some_and(|ds| ds.actual_deleted.is_some())
    }

    /// Whether an upload of the same bytes may bring the pic back.
    pub fn revivable(&self) -> bool {
        self.deletion_status.as_ref().is_some_and(|ds| ds.temporary)
    }

    pub fn var_pic_id(&self) -> String {
        Varint(self.pic_id).encode()
    }

    pub fn path(&self, pix_path: &Path) -> PathBuf {
        storage::pic_path(pix_path, self.pic_id, self.mime.ext())
    }

    pub fn thumbnail_path(&self, pix_path: &Path) -> PathBuf {
        storage::thumbnail_path(pix_path, self.pic_id, self.mime.thumbnail_ext())
    }

    pub fn relative_url(&self) -> String {
        storage::relative_url(self.pic_id, self.mime.ext())
    }

    pub fn thumbnail_relative_url(&self) -> String {
        storage::thumbnail_relative_url(self.pic_id, self.mime.thumbnail_ext())
    }

    pub fn wilson_score_interval(&self, z: f64) -> (f64, f64) {
        if self.hard_deleted() {
            return (0.0, 0.0);
        }
        let n = (self.vote_up + self.vote_down) as f64;
        if n == 0.0 {
            return (0.025, 0.975);
        }
        let phat = self.vote_up as f64 / n;
        let mid = phat + z * z / (2.0 * n);
        let stddev = z * (phat * (1.0 - phat) / n + z * z / (4.0 * n * n)).sqrt();
        let norm = 1.0 + z * z / n;
        ((mid - stddev) / norm, (mid + stddev) / norm)
    }

    pub fn lower_score_bound(&self) -> i32 {
        let (lo, _) = self.wilson_score_interval(Z_99);
        (lo * f64::from(1u32 << 30)) as i32
    }

    pub fn upper_score_bound(&self) -> i32 {
        let (_, hi) = self.wilson_score_interval(Z_99);
        (hi * f64::from(1u32 << 30)) as i32
    }
}

/// Unix nanoseconds, saturating outside the representable range.
pub fn nanos(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_nanos_opt().unwrap_or(if ts.timestamp() < 0 {
        i64::MIN
    } else {
        i64::MAX
    })
}
