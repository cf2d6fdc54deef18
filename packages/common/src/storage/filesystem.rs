use std::path::Path;

use async_trait::async_trait;
use tokio::fs;

use super::error::StorageError;
use super::traits::{PixFs, TempFile};

/// [`PixFs`] backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsPixFs;

#[async_trait]
impl PixFs for OsPixFs {
    async fn temp_file(&self, dir: &Path, prefix: &str) -> Result<TempFile, StorageError> {
        fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{prefix}{}", uuid::Uuid::new_v4().simple()));
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        tracing::debug!(path = %path.display(), "Created temp file");
        Ok(TempFile { path, file })
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        fs::rename(from, to).await?;
        Ok(())
    }

    async fn mkdir_all(&self, dir: &Path) -> Result<(), StorageError> {
        fs::create_dir_all(dir).await?;
        Ok(())
    }

    async fn remove(&self, path: &Path) -> Result<bool, StorageError> {
        match fs::remove_file(path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn open(&self, path: &Path) -> Result<fs::File, StorageError> {
        match fs::File::open(path).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn temp_file_is_created_inside_dir_with_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let mut tmp = OsPixFs.temp_file(dir.path(), "__").await.unwrap();
        tmp.file.write_all(b"abc").await.unwrap();
        tmp.file.flush().await.unwrap();

        assert_eq!(tmp.path.parent(), Some(dir.path()));
        let name = tmp.path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("__"));
        assert_eq!(std::fs::read(&tmp.path).unwrap(), b"abc");
    }

    #[tokio::test]
    async fn temp_files_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let a = OsPixFs.temp_file(dir.path(), "__").await.unwrap();
        let b = OsPixFs.temp_file(dir.path(), "__").await.unwrap();
        assert_ne!(a.path, b.path);
    }

    #[tokio::test]
    async fn rename_into_created_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let tmp = OsPixFs.temp_file(dir.path(), "__").await.unwrap();
        drop(tmp.file);

        let dest_dir = dir.path().join("k/1/5/m");
        OsPixFs.mkdir_all(&dest_dir).await.unwrap();
        let dest = dest_dir.join("k15m6.png");
        OsPixFs.rename(&tmp.path, &dest).await.unwrap();

        assert!(dest.exists());
        assert!(!tmp.path.exists());
    }

    #[tokio::test]
    async fn remove_missing_file_reports_false() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.png");
        assert!(!OsPixFs.remove(&path).await.unwrap());

        std::fs::write(&path, b"x").unwrap();
        assert!(OsPixFs.remove(&path).await.unwrap());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn open_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.jpg");
        assert!(matches!(
            OsPixFs.open(&path).await,
            Err(StorageError::NotFound(p)) if p == path
        ));

        std::fs::write(&path, b"jpeg").unwrap();
        let mut buf = Vec::new();
        OsPixFs
            .open(&path)
            .await
            .unwrap()
            .read_to_end(&mut buf)
            .await
            .unwrap();
        assert_eq!(buf, b"jpeg");
    }
}
