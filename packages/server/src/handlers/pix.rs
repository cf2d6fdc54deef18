use axum::extract::{Path, State};
use axum::response::Response;
use common::{Status, Varint};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::PixCaller;
use crate::handlers::pic::chunk_response;
use crate::state::AppState;
use crate::tasks::ReadPicTask;

/// Split a pix file name like `k15m6.gif` or `k15m6s.png` into the pic id and
/// whether the thumbnail was asked for.
fn parse_pix_name(name: &str) -> Result<(i64, bool), Status> {
    let bad = || Status::not_found(format!("no pic file {name}"));
    let (id, n) = Varint::decode(name.as_bytes()).map_err(|_| bad())?;
    let rest = &name[n..];
    let (thumbnail, ext) = match rest.strip_prefix('s') {
        Some(ext) => (true, ext),
        None => (false, rest),
    };
    match ext.strip_prefix('.') {
        Some(e) if !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()) => {
            Ok((id.0, thumbnail))
        }
        _ => Err(bad()),
    }
}

#[utoipa::path(
    get,
    path = "/pix/{file}",
    tag = "Pics",
    operation_id = "servePix",
    summary = "Serve a pic file by its public name",
    description = "The paths pics advertise as `relative_url` and `thumbnail_relative_url`. \
        Accepts the pix cookie. Requires `PIC_READ`.",
    params(("file" = String, Path, description = "File name such as `k15m6.png`")),
    responses(
        (status = 200, description = "File bytes"),
        (status = 403, description = "Missing capability (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such file (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, ctx), fields(file = %file))]
pub async fn serve_pix(
    PixCaller(ctx): PixCaller,
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, AppError> {
    let (pic_id, thumbnail) = parse_pix_name(&file)?;
    let mut task = ReadPicTask::new(state.deps.clone(), pic_id, thumbnail);
    state.run(&ctx, &mut task).await?;
    let chunk = task
        .chunk
        .take()
        .ok_or_else(|| AppError(Status::internal("no pic opened")))?;
    chunk_response(chunk)
}
