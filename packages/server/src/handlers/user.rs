use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use common::Status;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::Caller;
use crate::extractors::json::AppJson;
use crate::models::shared::parse_id;
use crate::models::user::{CreateUserRequest, UpdateUserRequest, UserResponse};
use crate::state::AppState;
use crate::tasks::{CreateUserTask, UpdateUserTask};

#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    operation_id = "createUser",
    summary = "Create a user",
    description = "Creates a user with the configured default capabilities. Requires `USER_CREATE`, \
        which anonymous callers hold only when sign-up is open.",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Bad ident or secret (INVALID_ARGUMENT)", body = ErrorBody),
        (status = 403, description = "Missing capability (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Ident taken (ALREADY_EXISTS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, ctx, payload), fields(ident = %payload.ident))]
pub async fn create_user(
    Caller(ctx): Caller,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut task = CreateUserTask::new(state.deps.clone(), payload.ident, payload.secret);
    state.run(&ctx, &mut task).await?;
    let user = task
        .created_user
        .ok_or_else(|| AppError(Status::internal("no user created")))?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[utoipa::path(
    patch,
    path = "/users/{user_id}",
    tag = "Users",
    operation_id = "updateUser",
    summary = "Change a user's capabilities",
    description = "Sets and clears capabilities of a user. The version must match the user's \
        current version. Requires `USER_UPDATE_CAPABILITY`.",
    params(("user_id" = String, Path, description = "Varint user id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Overlapping changes (INVALID_ARGUMENT)", body = ErrorBody),
        (status = 401, description = "Not logged in (UNAUTHENTICATED)", body = ErrorBody),
        (status = 403, description = "Missing capability (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such user (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Stale version (ABORTED)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, ctx, payload), fields(user_id = %user_id))]
pub async fn update_user(
    Caller(ctx): Caller,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user_id = parse_id(&user_id, "user id")?;
    let mut task = UpdateUserTask::new(state.deps.clone(), Some(user_id), payload.version);
    task.set_capability = payload.set_capability;
    task.clear_capability = payload.clear_capability;
    state.run(&ctx, &mut task).await?;
    let user = task
        .object_user
        .ok_or_else(|| AppError(Status::internal("no user updated")))?;
    Ok(Json(UserResponse::from(user)))
}
