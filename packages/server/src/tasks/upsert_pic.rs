//! Create a pic from uploaded or downloaded bytes, or merge into the pic
//! that already holds the same content.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::config::BackendConfig;
use common::storage::{PicDigests, PicHasher, TempFile, pic_base_dir};
use common::{Capability, Status};
use futures::StreamExt;
use reqwest::{StatusCode, Url};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use super::auth::require_capability;
use super::tags::upsert_tags;
use super::{Deps, Task, TaskContext, finish};
use crate::db::{IdentKey, Job, Lock, ScanOpts, retry_on_conflict};
use crate::imaging::{self, DecodedPic, perceptual_hash0};
use crate::schema::{FileSource, IdentType, Pic, PicIdent, User};
use crate::utils::url::{file_name, validate_url};

const TEMP_PREFIX: &str = "__";

/// What the caller sent. One of `data` or `url` must be present.
#[derive(Debug, Clone, Default)]
pub struct UpsertPicInput {
    /// Uploaded bytes. Takes precedence over `url`, which is then only
    /// recorded as the source.
    pub data: Option<Arc<[u8]>>,
    pub url: Option<String>,
    /// Expected MD5 of the content, lets re-uploads skip the transfer.
    pub md5_hash: Option<[u8; 16]>,
    pub name: Option<String>,
    pub tags: Vec<String>,
}

pub struct UpsertPicTask {
    deps: Deps,
    pub input: UpsertPicInput,

    pub pic: Option<Pic>,
    temp_files: Vec<PathBuf>,
}

/// Result of the CPU heavy part of an upload.
struct Processed {
    decoded: DecodedPic,
    dct0: ([u8; 8], Vec<f32>),
    thumbnail: Vec<u8>,
}

/// What to do with a pic that already holds the uploaded content.
enum Existing {
    Merge(Pic),
    /// Hard deleted but revivable: its files must be written again.
    Revive(Pic),
}

/// Soft deleted pics are merged and stay hidden unless the deletion was
/// temporary. Only a permanent hard delete keeps the content out.
fn classify(pic: Pic) -> Result<Existing, Status> {
    if !pic.hard_deleted() {
        return Ok(Existing::Merge(pic));
    }
    if pic.revivable() {
        Ok(Existing::Revive(pic))
    } else {
        Err(Status::invalid_argument("Can't upload deleted pic."))
    }
}

fn too_large(limit: u64) -> Status {
    Status::invalid_argument(format!("Pic is larger than {limit} bytes"))
}

async fn find_by_ident(j: &Job, ident_type: IdentType, value: &[u8]) -> Result<Option<Pic>, Status> {
    let key = IdentKey {
        ident_type: ident_type.as_i32(),
        value: Some(value.to_vec()),
    };
    let idents = j.find_pic_idents(ScanOpts::prefix(key).lock(Lock::Write)).await?;
    let Some(ident) = idents.into_iter().next() else {
        return Ok(None);
    };
    let pic = j
        .lookup_pic(ident.pic_id, Lock::Write)
        .await?
        .ok_or_else(|| Status::internal(format!("can't find pic {} for ident", ident.pic_id)))?;
    Ok(Some(pic))
}

impl UpsertPicTask {
    pub fn new(deps: Deps, input: UpsertPicInput) -> Self {
        Self {
            deps,
            input,
            pic: None,
            temp_files: Vec::new(),
        }
    }

    async fn temp_file(&mut self, config: &BackendConfig) -> Result<TempFile, Status> {
        let tmp = self.deps.fs.temp_file(&config.pix_path, TEMP_PREFIX).await?;
        self.temp_files.push(tmp.path.clone());
        Ok(tmp)
    }

    /// Stage the content in a temp file and return it with its digests.
    async fn acquire(
        &mut self,
        ctx: &TaskContext,
        config: &BackendConfig,
        url: Option<&Url>,
    ) -> Result<(TempFile, Arc<[u8]>, PicDigests), Status> {
        let limit = config.max_pic_bytes;
        let mut tmp = self.temp_file(config).await?;
        let mut hasher = PicHasher::new();
        let data = if let Some(data) = &self.input.data {
            if data.len() as u64 > limit {
                return Err(too_large(limit));
            }
            tmp.file.write_all(data).await?;
            hasher.update(data);
            Arc::clone(data)
        } else if let Some(url) = url {
            let resp = self
                .deps
                .http
                .get(url.clone())
                .send()
                .await
                .map_err(|e| Status::invalid_argument(format!("Can't download {url}")).with_cause(e))?;
            if resp.status() != StatusCode::OK {
                return Err(Status::invalid_argument(format!(
                    "Can't download {url} [{}]",
                    resp.status()
                )));
            }
            if resp.content_length().is_some_and(|n| n > limit) {
                return Err(too_large(limit));
            }
            let mut data = Vec::new();
            let mut body = resp.bytes_stream();
            while let Some(chunk) = body.next().await {
                ctx.check_cancelled()?;
                let chunk = chunk.map_err(|e| {
                    Status::invalid_argument(format!("Can't download {url}")).with_cause(e)
                })?;
                // Content-Length may be absent or wrong.
                if (data.len() + chunk.len()) as u64 > limit {
                    return Err(too_large(limit));
                }
                tmp.file.write_all(&chunk).await?;
                hasher.update(&chunk);
                data.extend_from_slice(&chunk);
            }
            Arc::from(data)
        } else {
            return Err(Status::invalid_argument("No pic specified"));
        };
        tmp.file.flush().await?;
        tmp.file.sync_all().await?;
        Ok((tmp, data, hasher.finish()))
    }

    async fn process(&self, data: Arc<[u8]>) -> Result<Processed, Status> {
        let decoder = self.deps.decoder.clone();
        tokio::task::spawn_blocking(move || -> Result<Processed, Status> {
            let decoded = decoder.decode(&data)?;
            let dct0 = perceptual_hash0(&decoded.image);
            let thumbnail = imaging::thumbnail(&decoded.image, decoded.mime)?;
            Ok(Processed {
                decoded,
                dct0,
                thumbnail,
            })
        })
        .await
        .map_err(|e| Status::internal("image worker failed").with_cause(e))?
    }

    /// Move the staged original and a new thumbnail into place.
    /// Returns the final paths so they can be removed if the commit fails.
    async fn write_files(
        &mut self,
        config: &BackendConfig,
        pic: &Pic,
        original: TempFile,
        thumbnail: &[u8],
    ) -> Result<Vec<PathBuf>, Status> {
        let mut thumb = self.temp_file(config).await?;
        thumb.file.write_all(thumbnail).await?;
        thumb.file.flush().await?;
        thumb.file.sync_all().await?;
        drop(thumb.file);
        drop(original.file);

        let fs = &self.deps.fs;
        fs.mkdir_all(&pic_base_dir(&config.pix_path, pic.pic_id)).await?;
        let pic_path = pic.path(&config.pix_path);
        fs.rename(&original.path, &pic_path).await?;
        let thumb_path = pic.thumbnail_path(&config.pix_path);
        if let Err(e) = fs.rename(&thumb.path, &thumb_path).await {
            if let Err(rm) = fs.remove(&pic_path).await {
                warn!(path = %pic_path.display(), error = %rm, "Can't remove pic after failed thumbnail move");
            }
            return Err(e.into());
        }
        Ok(vec![pic_path, thumb_path])
    }

    async fn remove_files(&self, paths: &[PathBuf]) {
        for path in paths {
            if let Err(e) = self.deps.fs.remove(path).await {
                warn!(path = %path.display(), error = %e, "Can't remove file");
            }
        }
    }

    async fn merge(
        &self,
        j: &Job,
        pic: &mut Pic,
        now: DateTime<Utc>,
        user: Option<&User>,
        url: Option<&Url>,
        config: &BackendConfig,
    ) -> Result<(), Status> {
        pic.modified = now;
        if pic.revivable() {
            pic.deletion_status = None;
        }
        let user_id = user.map(|u| u.user_id);
        upsert_tags(j, &self.input.tags, pic.pic_id, now, user_id, config).await?;

        let name = self
            .input
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| url.and_then(file_name));
        if url.is_some() || name.is_some() {
            // Credit goes to the first signed in uploader.
            let credited = pic.file_source.iter().any(|s| s.user_id.is_some());
            pic.file_source.push(FileSource {
                url: url.map(Url::to_string).unwrap_or_default(),
                referrer: String::new(),
                created: now,
                user_id: if credited { None } else { user_id },
                name: name.unwrap_or_default(),
            });
        }
        j.update_pic(pic).await
    }

    async fn insert_idents(
        &self,
        j: &Job,
        pic_id: i64,
        digests: &PicDigests,
        dct0: ([u8; 8], Vec<f32>),
    ) -> Result<(), Status> {
        let idents = [
            (IdentType::Md5, digests.md5.to_vec()),
            (IdentType::Sha1, digests.sha1.to_vec()),
            (IdentType::Sha256, digests.sha256.to_vec()),
        ];
        // A concurrent upload of the same bytes may have committed them first.
        for (ident_type, value) in idents {
            j.insert_pic_ident(&PicIdent {
                pic_id,
                ident_type,
                value,
                dct0_values: Vec::new(),
            })
            .await
            .map_err(retry_on_conflict)?;
        }
        let (hash, values) = dct0;
        j.insert_pic_ident(&PicIdent {
            pic_id,
            ident_type: IdentType::Dct0,
            value: hash.to_vec(),
            dct0_values: values,
        })
        .await
    }

    async fn upsert(
        &mut self,
        ctx: &TaskContext,
        j: &Job,
        user: Option<&User>,
        config: &BackendConfig,
    ) -> Result<(Pic, Vec<PathBuf>), Status> {
        if self.input.data.is_none() && self.input.url.is_none() {
            return Err(Status::invalid_argument("No pic specified"));
        }
        let now = self.deps.now();
        let url = self.input.url.as_deref().map(validate_url).transpose()?;

        if let Some(md5) = self.input.md5_hash {
            if let Some(pic) = find_by_ident(j, IdentType::Md5, &md5).await? {
                if let Existing::Merge(mut pic) = classify(pic)? {
                    self.merge(j, &mut pic, now, user, url.as_ref(), config).await?;
                    return Ok((pic, Vec::new()));
                }
            }
        }

        ctx.check_cancelled()?;
        let (original, data, digests) = self.acquire(ctx, config, url.as_ref()).await?;
        if self.input.md5_hash.is_some_and(|md5| md5 != digests.md5) {
            return Err(Status::invalid_argument("md5 hash mismatch"));
        }

        ctx.check_cancelled()?;
        let processed = self.process(data).await?;
        let decoded = &processed.decoded;

        ctx.check_cancelled()?;
        let mut pic = match find_by_ident(j, IdentType::Sha1, &digests.sha1).await? {
            Some(existing) => match classify(existing)? {
                Existing::Merge(mut pic) => {
                    self.merge(j, &mut pic, now, user, url.as_ref(), config).await?;
                    return Ok((pic, Vec::new()));
                }
                Existing::Revive(pic) => pic,
            },
            None => {
                let pic_id = j.alloc_id().await?;
                let pic = Pic {
                    pic_id,
                    file_size: digests.size as i64,
                    mime: decoded.mime,
                    width: i64::from(decoded.width),
                    height: i64::from(decoded.height),
                    animation_info: decoded.animation.clone(),
                    view_count: 0,
                    vote_up: 0,
                    vote_down: 0,
                    created: now,
                    modified: now,
                    deletion_status: None,
                    file_source: Vec::new(),
                };
                j.insert_pic(&pic).await?;
                self.insert_idents(j, pic_id, &digests, processed.dct0.clone()).await?;
                pic
            }
        };

        self.merge(j, &mut pic, now, user, url.as_ref(), config).await?;
        let written = self.write_files(config, &pic, original, &processed.thumbnail).await?;
        Ok((pic, written))
    }
}

#[async_trait]
impl Task for UpsertPicTask {
    fn name(&self) -> &'static str {
        "upsert_pic"
    }

    fn reset_for_retry(&mut self) {
        self.pic = None;
    }

    async fn run(&mut self, ctx: &TaskContext) -> Result<(), Status> {
        let (j, user, config) = require_capability(&self.deps, ctx, &[Capability::PicCreate]).await?;
        let (pic, written) = match self.upsert(ctx, &j, user.as_ref(), &config).await {
            Ok(v) => v,
            Err(sts) => return finish(j, Err(sts)).await,
        };
        if let Err(sts) = j.commit().await {
            self.remove_files(&written).await;
            return Err(sts);
        }
        info!(pic_id = pic.pic_id, created = !written.is_empty(), "Upserted pic");
        self.pic = Some(pic);
        Ok(())
    }

    async fn clean_up(&mut self) {
        for path in std::mem::take(&mut self.temp_files) {
            if let Err(e) = self.deps.fs.remove(&path).await {
                warn!(path = %path.display(), error = %e, "Can't remove temp file");
            }
        }
    }
}
