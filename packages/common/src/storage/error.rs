use std::fmt;
use std::path::PathBuf;

use crate::status::Status;

/// Errors that can occur while touching the pix tree.
#[derive(Debug)]
pub enum StorageError {
    /// The requested file was not found.
    NotFound(PathBuf),
    /// An I/O error occurred.
    Io(std::io::Error),
    /// A hex digest could not be parsed.
    InvalidDigest(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "file not found: {}", path.display()),
            Self::Io(err) => write!(f, "storage IO error: {err}"),
            Self::InvalidDigest(msg) => write!(f, "invalid digest: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<StorageError> for Status {
    fn from(err: StorageError) -> Self {
        let status = match &err {
            StorageError::NotFound(path) => {
                Status::not_found(format!("missing file {}", path.display()))
            }
            StorageError::InvalidDigest(msg) => Status::invalid_argument(msg.clone()),
            StorageError::Io(_) => Status::internal("storage failure"),
        };
        status.with_cause(err)
    }
}
