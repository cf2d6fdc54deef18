use async_trait::async_trait;
use common::{Capability, Status};

use super::auth::require_capability;
use super::{Deps, Task, TaskContext, finish};
use crate::db::{Lock, PicIndexOrder, ScanOpts};
use crate::schema::Pic;

/// Page through visible pics in browse order.
///
/// Descending pages include the start pic, ascending pages begin after it.
pub struct ReadIndexPicsTask {
    deps: Deps,
    pub start_pic_id: Option<i64>,
    pub ascending: bool,
    /// 0 picks the configured default.
    pub max_pics: u64,

    pub pics: Vec<Pic>,
}

impl ReadIndexPicsTask {
    pub fn new(deps: Deps, start_pic_id: Option<i64>, ascending: bool) -> Self {
        Self {
            deps,
            start_pic_id,
            ascending,
            max_pics: 0,
            pics: Vec::new(),
        }
    }
}

#[async_trait]
impl Task for ReadIndexPicsTask {
    fn name(&self) -> &'static str {
        "read_index_pics"
    }

    fn reset_for_retry(&mut self) {
        self.pics.clear();
    }

    async fn run(&mut self, ctx: &TaskContext) -> Result<(), Status> {
        let (j, _, config) = require_capability(&self.deps, ctx, &[Capability::PicIndex]).await?;
        let res: Result<_, Status> = async {
            let limit = match self.max_pics {
                0 => config.default_find_index_pics,
                n => n.min(config.max_find_index_pics),
            };
            let start_order = match self.start_pic_id {
                Some(id) => Some(
                    j.lookup_pic(id, Lock::None)
                        .await?
                        .ok_or_else(|| Status::not_found("can't find start pic"))?
                        .non_hidden_index_order(),
                ),
                None => None,
            };

            // Hidden pics have negative orders and are never returned.
            let mut opts = ScanOpts::<PicIndexOrder> {
                start: Some(PicIndexOrder(0)),
                ..ScanOpts::default()
            }
            .limit(limit);
            match (start_order, self.ascending) {
                (Some(order), true) => opts.start = Some(PicIndexOrder(order.saturating_add(1).max(0))),
                (Some(order), false) => {
                    opts.stop = Some(PicIndexOrder(order.saturating_add(1)));
                    opts = opts.reverse();
                }
                (None, true) => {}
                (None, false) => opts = opts.reverse(),
            }
            j.find_pics(opts).await
        }
        .await;
        self.pics = finish(j, res).await?;
        Ok(())
    }
}
