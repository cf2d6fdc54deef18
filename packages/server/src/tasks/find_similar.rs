use std::ops::ControlFlow;

use async_trait::async_trait;
use common::{Capability, Status};

use super::auth::require_capability;
use super::{Deps, Task, TaskContext, finish};
use crate::db::{IdentKey, Lock, PicIdentKey, ScanOpts};
use crate::imaging::hamming_distance;
use crate::schema::IdentType;

/// Find pics whose perceptual hash is close to the given pic's.
pub struct FindSimilarPicsTask {
    deps: Deps,
    pub pic_id: i64,

    pub similar_pic_ids: Vec<i64>,
}

impl FindSimilarPicsTask {
    pub fn new(deps: Deps, pic_id: i64) -> Self {
        Self {
            deps,
            pic_id,
            similar_pic_ids: Vec::new(),
        }
    }
}

#[async_trait]
impl Task for FindSimilarPicsTask {
    fn name(&self) -> &'static str {
        "find_similar_pics"
    }

    fn reset_for_retry(&mut self) {
        self.similar_pic_ids.clear();
    }

    async fn run(&mut self, ctx: &TaskContext) -> Result<(), Status> {
        let (j, _, config) = require_capability(&self.deps, ctx, &[Capability::PicIndex]).await?;
        let res: Result<_, Status> = async {
            j.lookup_pic(self.pic_id, Lock::None)
                .await?
                .ok_or_else(|| Status::not_found("can't find pic"))?;
            let target = j
                .find_pic_idents(ScanOpts::prefix(PicIdentKey(self.pic_id)))
                .await?
                .iter()
                .find_map(|ident| ident.dct0_hash())
                .ok_or_else(|| Status::invalid_argument("pic has no perceptual hash"))?;

            // Linear scan over every hash.
            let mut similar = Vec::new();
            let all = ScanOpts::prefix(IdentKey {
                ident_type: IdentType::Dct0.as_i32(),
                value: None,
            });
            j.scan_pic_idents(all, |ident| {
                if ident.pic_id != self.pic_id {
                    if let Some(hash) = ident.dct0_hash() {
                        if hamming_distance(target, hash) <= config.similar_pics_max_distance {
                            similar.push(ident.pic_id);
                        }
                    }
                }
                ControlFlow::Continue(())
            })
            .await?;
            Ok(similar)
        }
        .await;
        self.similar_pic_ids = finish(j, res).await?;
        Ok(())
    }
}
