use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::error::StorageError;

/// A freshly created scratch file, open for writing.
pub struct TempFile {
    pub path: PathBuf,
    pub file: tokio::fs::File,
}

/// Filesystem operations the upload and delete paths depend on.
///
/// Swapped out in tests to inject failures.
#[async_trait]
pub trait PixFs: Send + Sync {
    /// Create an empty file in `dir` whose name starts with `prefix`.
    async fn temp_file(&self, dir: &Path, prefix: &str) -> Result<TempFile, StorageError>;

    /// Atomically move `from` to `to`, replacing any existing file.
    async fn rename(&self, from: &Path, to: &Path) -> Result<(), StorageError>;

    /// Create `dir` and all missing parents.
    async fn mkdir_all(&self, dir: &Path) -> Result<(), StorageError>;

    /// Delete a file.
    ///
    /// Returns `true` if the file was deleted, `false` if it did not exist.
    async fn remove(&self, path: &Path) -> Result<bool, StorageError>;

    /// Open a file for reading.
    async fn open(&self, path: &Path) -> Result<tokio::fs::File, StorageError>;
}
