use std::io::SeekFrom;

use async_trait::async_trait;
use common::{Capability, Status};
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};

use super::auth::require_capability;
use super::{Deps, Task, TaskContext, finish};
use crate::db::Lock;
use crate::schema::Pic;

/// An open slice of a pic file.
pub struct PicChunk {
    pub pic: Pic,
    pub content_type: &'static str,
    /// Positioned at the requested offset, limited to `len` bytes.
    pub reader: Take<tokio::fs::File>,
    pub len: u64,
    /// Whether the slice runs to the end of the file.
    pub eof: bool,
}

/// Open a pic's original or thumbnail for reading.
pub struct ReadPicTask {
    deps: Deps,
    pub pic_id: i64,
    pub thumbnail: bool,
    pub offset: u64,
    /// 0 reads to the end.
    pub limit: u64,

    pub chunk: Option<PicChunk>,
}

impl ReadPicTask {
    pub fn new(deps: Deps, pic_id: i64, thumbnail: bool) -> Self {
        Self {
            deps,
            pic_id,
            thumbnail,
            offset: 0,
            limit: 0,
            chunk: None,
        }
    }
}

#[async_trait]
impl Task for ReadPicTask {
    fn name(&self) -> &'static str {
        "read_pic"
    }

    fn reset_for_retry(&mut self) {
        self.chunk = None;
    }

    async fn run(&mut self, ctx: &TaskContext) -> Result<(), Status> {
        let (j, _, config) = require_capability(&self.deps, ctx, &[Capability::PicRead]).await?;
        let res: Result<_, Status> = async {
            let pic = j
                .lookup_pic(self.pic_id, Lock::None)
                .await?
                .ok_or_else(|| Status::not_found("can't find pic"))?;
            if pic.hard_deleted() {
                return Err(Status::not_found("pic is deleted"));
            }
            Ok(pic)
        }
        .await;
        let pic = finish(j, res).await?;

        let (path, content_type) = if self.thumbnail {
            (pic.thumbnail_path(&config.pix_path), pic.mime.thumbnail_content_type())
        } else {
            (pic.path(&config.pix_path), pic.mime.content_type())
        };
        let mut file = self.deps.fs.open(&path).await?;
        let size = file.metadata().await?.len();
        if self.offset > size {
            return Err(Status::out_of_range(format!(
                "offset {} past end of file",
                self.offset
            )));
        }
        file.seek(SeekFrom::Start(self.offset)).await?;
        let remaining = size - self.offset;
        let len = match self.limit {
            0 => remaining,
            n => n.min(remaining),
        };
        self.chunk = Some(PicChunk {
            pic,
            content_type,
            reader: file.take(len),
            len,
            eof: self.offset + len == size,
        });
        Ok(())
    }
}
