use std::path::{Path, PathBuf};

use crate::varint::Varint;

/// Directory holding the files of pic `id`.
///
/// Every character of the varint id except the last becomes one directory
/// level, which keeps each directory small as ids grow.
pub fn pic_base_dir(pix_path: &Path, id: i64) -> PathBuf {
    let vid = Varint(id).encode();
    let mut dir = pix_path.to_path_buf();
    let shards = vid.len().saturating_sub(1);
    for c in vid.chars().take(shards) {
        dir.push(c.to_string());
    }
    dir
}

/// Canonical path of the original bytes.
pub fn pic_path(pix_path: &Path, id: i64, ext: &str) -> PathBuf {
    pic_base_dir(pix_path, id).join(format!("{}.{ext}", Varint(id).encode()))
}

/// Canonical path of the thumbnail.
pub fn thumbnail_path(pix_path: &Path, id: i64, ext: &str) -> PathBuf {
    pic_base_dir(pix_path, id).join(format!("{}s.{ext}", Varint(id).encode()))
}

/// URL of the original relative to the site root.
pub fn relative_url(id: i64, ext: &str) -> String {
    format!("pix/{}.{ext}", Varint(id).encode())
}

pub fn thumbnail_relative_url(id: i64, ext: &str) -> String {
    format!("pix/{}s.{ext}", Varint(id).encode())
}
