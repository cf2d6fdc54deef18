use std::fmt;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;

/// Content digests of the exact bytes of a stored pic.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PicDigests {
    pub md5: [u8; 16],
    pub sha1: [u8; 20],
    pub sha256: [u8; 32],
    /// Number of bytes hashed.
    pub size: u64,
}

/// Incremental hasher feeding all three digests at once.
#[derive(Default)]
pub struct PicHasher {
    md5: Md5,
    sha1: Sha1,
    sha256: Sha256,
    size: u64,
}

impl PicHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.md5.update(data);
        self.sha1.update(data);
        self.sha256.update(data);
        self.size += data.len() as u64;
    }

    pub fn finish(self) -> PicDigests {
        PicDigests {
            md5: self.md5.finalize().into(),
            sha1: self.sha1.finalize().into(),
            sha256: self.sha256.finalize().into(),
            size: self.size,
        }
    }
}

impl PicDigests {
    /// Hash an in-memory buffer.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = PicHasher::new();
        hasher.update(data);
        hasher.finish()
    }

    /// Hash everything readable from `reader`.
    pub async fn from_reader<R>(mut reader: R) -> Result<Self, StorageError>
    where
        R: AsyncRead + Unpin,
    {
        let mut hasher = PicHasher::new();
        let mut buf = vec![0u8; 64 * 1024]; // 64KB read buffer
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finish())
    }

    pub fn md5_hex(&self) -> String {
        hex::encode(self.md5)
    }

    pub fn sha1_hex(&self) -> String {
        hex::encode(self.sha1)
    }

    pub fn sha256_hex(&self) -> String {
        hex::encode(self.sha256)
    }

    /// Parse a caller-supplied MD5 given as 32 hex characters.
    pub fn parse_md5_hex(s: &str) -> Result<[u8; 16], StorageError> {
        if s.len() != 32 {
            return Err(StorageError::InvalidDigest(format!(
                "expected 32 hex characters, got {}",
                s.len()
            )));
        }
        let bytes =
            hex::decode(s).map_err(|e| StorageError::InvalidDigest(format!("invalid hex: {e}")))?;
        bytes
            .try_into()
            .map_err(|_| StorageError::InvalidDigest("decoded to wrong length".into()))
    }
}

impl fmt::Debug for PicDigests {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PicDigests")
            .field("md5", &self.md5_hex())
            .field("sha1", &self.sha1_hex())
            .field("sha256", &self.sha256_hex())
            .field("size", &self.size)
            .finish()
    }
}
