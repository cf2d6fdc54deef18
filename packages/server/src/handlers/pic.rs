use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, body::Body};
use common::Status;
use common::storage::PicDigests;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{Caller, PixCaller};
use crate::extractors::json::AppJson;
use crate::models::pic::{
    AddCommentRequest, AddTagsRequest, CommentResponse, FindIndexPicsQuery, LookupVoteQuery,
    LookupVoteResponse, PicDetailsResponse, PicListResponse, PicResponse, PicTagResponse,
    ReadPicQuery, SimilarPicsResponse, SoftDeleteRequest, UpsertVoteRequest, VoteResponse,
};
use crate::models::shared::{encode_id, parse_id, parse_optional_id};
use crate::state::AppState;
use crate::tasks::{
    AddPicCommentTask, AddPicTagsTask, AddPicVoteTask, FindSimilarPicsTask, HardDeletePicTask,
    IncrementViewCountTask, LookupPicDetailsTask, LookupPicVoteTask, PicChunk, PurgePicTask,
    ReadIndexPicsTask, ReadPicTask, SoftDeletePicTask, UpsertPicInput, UpsertPicTask,
};

pub const PIX_EOF_HEADER: &str = "x-pix-eof";

pub fn upload_body_limit(max_bytes: usize) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max_bytes)
}

fn multipart_err(e: impl std::fmt::Display) -> AppError {
    AppError(Status::invalid_argument(format!("Multipart error: {e}")))
}

/// Turn an opened slice of a pic file into a streamed response.
pub(crate) fn chunk_response(chunk: PicChunk) -> Result<Response, AppError> {
    let body = Body::from_stream(ReaderStream::new(chunk.reader));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, chunk.content_type)
        .header(header::CONTENT_LENGTH, chunk.len.to_string())
        .header(header::CACHE_CONTROL, "private, max-age=31536000, immutable")
        .header(PIX_EOF_HEADER, chunk.eof.to_string())
        .body(body)
        .map_err(|e| AppError(Status::internal("can't build response").with_cause(e)))
}

#[utoipa::path(
    post,
    path = "/pics",
    tag = "Pics",
    operation_id = "upsertPic",
    summary = "Upload a pic or add to an existing one",
    description = "Accepts the bytes in a `file` part or a `url` to download from. Content already \
        known by hash merges into the existing pic, adding `tag` parts and the source. An `md5_hash` \
        part (32 hex characters) lets known content skip the transfer. Requires `PIC_CREATE`.",
    request_body(content_type = "multipart/form-data", description = "file, url, md5_hash, name and repeated tag parts"),
    responses(
        (status = 200, description = "The created or merged pic", body = PicResponse),
        (status = 400, description = "Bad upload (INVALID_ARGUMENT)", body = ErrorBody),
        (status = 403, description = "Missing capability (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, ctx, multipart), fields(user_id = ?ctx.user_id()))]
pub async fn upsert_pic(
    Caller(ctx): Caller,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PicResponse>, AppError> {
    let mut input = UpsertPicInput::default();
    let mut file_name = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_err)? {
        match field.name() {
            Some("file") => {
                file_name = field.file_name().map(str::to_owned);
                let bytes = field.bytes().await.map_err(multipart_err)?;
                input.data = Some(Arc::from(&bytes[..]));
            }
            Some("url") => {
                let url = field.text().await.map_err(multipart_err)?;
                input.url = Some(url).filter(|u| !u.is_empty());
            }
            Some("md5_hash") => {
                let hash = field.text().await.map_err(multipart_err)?;
                if !hash.is_empty() {
                    input.md5_hash = Some(PicDigests::parse_md5_hex(hash.trim()).map_err(Status::from)?);
                }
            }
            Some("name") => {
                let name = field.text().await.map_err(multipart_err)?;
                input.name = Some(name).filter(|n| !n.is_empty());
            }
            Some("tag") => input.tags.push(field.text().await.map_err(multipart_err)?),
            _ => {}
        }
    }
    if input.name.is_none() {
        input.name = file_name;
    }

    let mut task = UpsertPicTask::new(state.deps.clone(), input);
    state.run(&ctx, &mut task).await?;
    let pic = task
        .pic
        .take()
        .ok_or_else(|| AppError(Status::internal("no pic stored")))?;
    Ok(Json(PicResponse::from(pic)))
}

#[utoipa::path(
    get,
    path = "/pics",
    tag = "Pics",
    operation_id = "findIndexPics",
    summary = "Browse pics",
    description = "Pages through visible pics, newest first unless `ascending`. Requires `PIC_INDEX`.",
    params(FindIndexPicsQuery),
    responses(
        (status = 200, description = "A page of pics", body = PicListResponse),
        (status = 400, description = "Bad start id (INVALID_ARGUMENT)", body = ErrorBody),
        (status = 403, description = "Missing capability (PERMISSION_DENIED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, ctx, query), fields(ascending = query.ascending))]
pub async fn find_index_pics(
    Caller(ctx): Caller,
    State(state): State<AppState>,
    Query(query): Query<FindIndexPicsQuery>,
) -> Result<Json<PicListResponse>, AppError> {
    let start = parse_optional_id(query.start_pic_id.as_deref(), "start pic id")?;
    let mut task = ReadIndexPicsTask::new(state.deps.clone(), start, query.ascending);
    state.run(&ctx, &mut task).await?;
    Ok(Json(PicListResponse {
        pics: task.pics.into_iter().map(PicResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/pics/{pic_id}",
    tag = "Pics",
    operation_id = "lookupPicDetails",
    summary = "Get a pic with its tags and comments",
    description = "Requires `PIC_INDEX`.",
    params(("pic_id" = String, Path, description = "Varint pic id")),
    responses(
        (status = 200, description = "Pic details", body = PicDetailsResponse),
        (status = 403, description = "Missing capability (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such pic (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, ctx), fields(pic_id = %pic_id))]
pub async fn lookup_pic_details(
    Caller(ctx): Caller,
    State(state): State<AppState>,
    Path(pic_id): Path<String>,
) -> Result<Json<PicDetailsResponse>, AppError> {
    let pic_id = parse_id(&pic_id, "pic id")?;
    let mut task = LookupPicDetailsTask::new(state.deps.clone(), pic_id);
    state.run(&ctx, &mut task).await?;
    let pic = task
        .pic
        .ok_or_else(|| AppError(Status::internal("no pic loaded")))?;
    Ok(Json(PicDetailsResponse {
        pic: PicResponse::from(pic),
        pic_tags: task.pic_tags.into_iter().map(PicTagResponse::from).collect(),
        comment_tree: task.comment_tree.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/pics/{pic_id}",
    tag = "Pics",
    operation_id = "purgePic",
    summary = "Remove every trace of a pic",
    description = "Deletes the pic row, its idents, tags, comments, votes and files. Requires `PIC_PURGE`.",
    params(("pic_id" = String, Path, description = "Varint pic id")),
    responses(
        (status = 204, description = "Pic purged"),
        (status = 403, description = "Missing capability (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such pic (NOT_FOUND)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, ctx), fields(pic_id = %pic_id))]
pub async fn purge_pic(
    Caller(ctx): Caller,
    State(state): State<AppState>,
    Path(pic_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let pic_id = parse_id(&pic_id, "pic id")?;
    let mut task = PurgePicTask::new(state.deps.clone(), pic_id);
    state.run(&ctx, &mut task).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/pics/{pic_id}/vote",
    tag = "Votes",
    operation_id = "lookupPicVote",
    summary = "Read a user's vote on a pic",
    description = "Reads the caller's vote, or another user's with `USER_READ_ALL`.",
    params(("pic_id" = String, Path, description = "Varint pic id"), LookupVoteQuery),
    responses(
        (status = 200, description = "The vote, if any", body = LookupVoteResponse),
        (status = 403, description = "Missing capability (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such pic (NOT_FOUND)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, ctx, query), fields(pic_id = %pic_id))]
pub async fn lookup_pic_vote(
    Caller(ctx): Caller,
    State(state): State<AppState>,
    Path(pic_id): Path<String>,
    Query(query): Query<LookupVoteQuery>,
) -> Result<Json<LookupVoteResponse>, AppError> {
    let pic_id = parse_id(&pic_id, "pic id")?;
    let user_id = parse_optional_id(query.user_id.as_deref(), "user id")?;
    let mut task = LookupPicVoteTask::new(state.deps.clone(), pic_id, user_id);
    state.run(&ctx, &mut task).await?;
    Ok(Json(LookupVoteResponse {
        vote: task.vote.map(VoteResponse::from),
    }))
}

#[utoipa::path(
    post,
    path = "/pics/{pic_id}/vote",
    tag = "Votes",
    operation_id = "upsertPicVote",
    summary = "Vote on a pic",
    description = "Each user votes once per pic. Requires `PIC_VOTE_CREATE`.",
    params(("pic_id" = String, Path, description = "Varint pic id")),
    request_body = UpsertVoteRequest,
    responses(
        (status = 204, description = "Vote recorded"),
        (status = 401, description = "Not logged in (UNAUTHENTICATED)", body = ErrorBody),
        (status = 403, description = "Missing capability (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such pic (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already voted (ALREADY_EXISTS)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, ctx, payload), fields(pic_id = %pic_id))]
pub async fn upsert_pic_vote(
    Caller(ctx): Caller,
    State(state): State<AppState>,
    Path(pic_id): Path<String>,
    AppJson(payload): AppJson<UpsertVoteRequest>,
) -> Result<StatusCode, AppError> {
    let pic_id = parse_id(&pic_id, "pic id")?;
    let mut task = AddPicVoteTask::new(state.deps.clone(), pic_id, payload.vote);
    state.run(&ctx, &mut task).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/pics/{pic_id}/comments",
    tag = "Comments",
    operation_id = "addPicComment",
    summary = "Comment on a pic",
    description = "Adds a top level comment or a reply. Requires `PIC_COMMENT_CREATE`.",
    params(("pic_id" = String, Path, description = "Varint pic id")),
    request_body = AddCommentRequest,
    responses(
        (status = 201, description = "Comment added", body = CommentResponse),
        (status = 400, description = "Bad text (INVALID_ARGUMENT)", body = ErrorBody),
        (status = 403, description = "Missing capability (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such pic or parent (NOT_FOUND)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, ctx, payload), fields(pic_id = %pic_id))]
pub async fn add_pic_comment(
    Caller(ctx): Caller,
    State(state): State<AppState>,
    Path(pic_id): Path<String>,
    AppJson(payload): AppJson<AddCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let pic_id = parse_id(&pic_id, "pic id")?;
    let parent_id =
        parse_optional_id(payload.comment_parent_id.as_deref(), "comment parent id")?.unwrap_or(0);
    let mut task = AddPicCommentTask::new(state.deps.clone(), pic_id, parent_id, payload.text);
    state.run(&ctx, &mut task).await?;
    let comment = task
        .comment
        .ok_or_else(|| AppError(Status::internal("no comment stored")))?;
    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}

#[utoipa::path(
    post,
    path = "/pics/{pic_id}/tags",
    tag = "Pics",
    operation_id = "addPicTags",
    summary = "Tag a pic",
    description = "Attaches tags, creating unknown ones. Requires `PIC_TAG_CREATE`.",
    params(("pic_id" = String, Path, description = "Varint pic id")),
    request_body = AddTagsRequest,
    responses(
        (status = 204, description = "Tags attached"),
        (status = 400, description = "Bad tag or deleted pic (INVALID_ARGUMENT)", body = ErrorBody),
        (status = 403, description = "Missing capability (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such pic (NOT_FOUND)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, ctx, payload), fields(pic_id = %pic_id, tags = payload.tags.len()))]
pub async fn add_pic_tags(
    Caller(ctx): Caller,
    State(state): State<AppState>,
    Path(pic_id): Path<String>,
    AppJson(payload): AppJson<AddTagsRequest>,
) -> Result<StatusCode, AppError> {
    let pic_id = parse_id(&pic_id, "pic id")?;
    let mut task = AddPicTagsTask::new(state.deps.clone(), pic_id, payload.tags);
    state.run(&ctx, &mut task).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/pics/{pic_id}/views",
    tag = "Pics",
    operation_id = "incrementViewCount",
    summary = "Count a view",
    description = "Requires `PIC_UPDATE_VIEW_COUNTER`.",
    params(("pic_id" = String, Path, description = "Varint pic id")),
    responses(
        (status = 204, description = "View counted"),
        (status = 400, description = "Deleted pic (INVALID_ARGUMENT)", body = ErrorBody),
        (status = 404, description = "No such pic (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, ctx), fields(pic_id = %pic_id))]
pub async fn increment_view_count(
    Caller(ctx): Caller,
    State(state): State<AppState>,
    Path(pic_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let pic_id = parse_id(&pic_id, "pic id")?;
    let mut task = IncrementViewCountTask::new(state.deps.clone(), pic_id);
    state.run(&ctx, &mut task).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/pics/{pic_id}/soft-delete",
    tag = "Pics",
    operation_id = "softDeletePic",
    summary = "Hide a pic and schedule its deletion",
    description = "Requires `PIC_SOFT_DELETE`. A temporary deletion is undone by uploading the same bytes.",
    params(("pic_id" = String, Path, description = "Varint pic id")),
    request_body = SoftDeleteRequest,
    responses(
        (status = 204, description = "Pic hidden"),
        (status = 400, description = "Missing reason or hard deleted (INVALID_ARGUMENT)", body = ErrorBody),
        (status = 403, description = "Missing capability (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such pic (NOT_FOUND)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, ctx, payload), fields(pic_id = %pic_id, reason = ?payload.reason))]
pub async fn soft_delete_pic(
    Caller(ctx): Caller,
    State(state): State<AppState>,
    Path(pic_id): Path<String>,
    AppJson(payload): AppJson<SoftDeleteRequest>,
) -> Result<StatusCode, AppError> {
    let pic_id = parse_id(&pic_id, "pic id")?;
    let mut task = SoftDeletePicTask::new(state.deps.clone(), pic_id, payload.reason);
    task.details = payload.details;
    task.temporary = payload.temporary;
    task.pending_deletion_time = payload.deletion_time;
    state.run(&ctx, &mut task).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/pics/{pic_id}/hard-delete",
    tag = "Pics",
    operation_id = "hardDeletePic",
    summary = "Delete a pic's files",
    description = "Removes the bytes from disk and keeps the record. Requires `PIC_HARD_DELETE`.",
    params(("pic_id" = String, Path, description = "Varint pic id")),
    responses(
        (status = 204, description = "Pic deleted"),
        (status = 403, description = "Missing capability (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such pic (NOT_FOUND)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, ctx), fields(pic_id = %pic_id))]
pub async fn hard_delete_pic(
    Caller(ctx): Caller,
    State(state): State<AppState>,
    Path(pic_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let pic_id = parse_id(&pic_id, "pic id")?;
    let mut task = HardDeletePicTask::new(state.deps.clone(), pic_id);
    state.run(&ctx, &mut task).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/pics/{pic_id}/similar",
    tag = "Pics",
    operation_id = "findSimilarPics",
    summary = "Find pics that look alike",
    description = "Compares perceptual hashes. Requires `PIC_INDEX`.",
    params(("pic_id" = String, Path, description = "Varint pic id")),
    responses(
        (status = 200, description = "Ids of similar pics", body = SimilarPicsResponse),
        (status = 400, description = "Pic has no perceptual hash (INVALID_ARGUMENT)", body = ErrorBody),
        (status = 403, description = "Missing capability (PERMISSION_DENIED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, ctx), fields(pic_id = %pic_id))]
pub async fn find_similar_pics(
    Caller(ctx): Caller,
    State(state): State<AppState>,
    Path(pic_id): Path<String>,
) -> Result<Json<SimilarPicsResponse>, AppError> {
    let pic_id = parse_id(&pic_id, "pic id")?;
    let mut task = FindSimilarPicsTask::new(state.deps.clone(), pic_id);
    state.run(&ctx, &mut task).await?;
    Ok(Json(SimilarPicsResponse {
        pic_ids: task.similar_pic_ids.into_iter().map(encode_id).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/pics/{pic_id}/data",
    tag = "Pics",
    operation_id = "readPic",
    summary = "Stream a pic's bytes",
    description = "Streams the original or thumbnail from `offset`, at most `limit` bytes. The \
        `X-Pix-Eof` header tells whether the end of the file was reached. Requires `PIC_READ`.",
    params(("pic_id" = String, Path, description = "Varint pic id"), ReadPicQuery),
    responses(
        (status = 200, description = "File bytes"),
        (status = 400, description = "Offset past the end (OUT_OF_RANGE)", body = ErrorBody),
        (status = 403, description = "Missing capability (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such pic (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, ctx, query), fields(pic_id = %pic_id, thumbnail = query.thumbnail))]
pub async fn read_pic(
    PixCaller(ctx): PixCaller,
    State(state): State<AppState>,
    Path(pic_id): Path<String>,
    Query(query): Query<ReadPicQuery>,
) -> Result<Response, AppError> {
    let pic_id = parse_id(&pic_id, "pic id")?;
    let mut task = ReadPicTask::new(state.deps.clone(), pic_id, query.thumbnail);
    task.offset = query.offset;
    task.limit = query.limit;
    state.run(&ctx, &mut task).await?;
    let chunk = task
        .chunk
        .take()
        .ok_or_else(|| AppError(Status::internal("no pic opened")))?;
    chunk_response(chunk)
}
