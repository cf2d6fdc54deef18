use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use common::Status;
use rand::RngCore;
use time::OffsetDateTime;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AUTH_COOKIE, Caller, PIX_COOKIE, REFRESH_COOKIE, XSRF_COOKIE};
use crate::extractors::json::AppJson;
use crate::models::auth::{GetRefreshTokenRequest, GetRefreshTokenResponse};
use crate::state::AppState;
use crate::tasks::{AuthUserTask, Credentials, TaskContext, UnauthUserTask};
use crate::utils::tokens::TokenType;

const REFRESH_PATH: &str = "/api/v1/auth/token";
const AUTH_PATH: &str = "/api/";
const PIX_PATH: &str = "/pix/";

fn cookie(
    name: &'static str,
    value: String,
    path: &'static str,
    expires: i64,
    http_only: bool,
    insecure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path(path)
        .expires(OffsetDateTime::from_unix_timestamp(expires).ok())
        .http_only(http_only)
        .secure(!insecure)
        .same_site(SameSite::Strict)
        .build()
}

fn removal(name: &'static str, path: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path(path).build()
}

fn new_xsrf_token() -> String {
    let mut raw = [0u8; 16];
    rand::rng().fill_bytes(&mut raw);
    hex::encode(raw)
}

fn credentials(
    state: &AppState,
    jar: &CookieJar,
    req: GetRefreshTokenRequest,
) -> Result<Credentials, Status> {
    let refresh = req
        .refresh_token
        .filter(|t| !t.is_empty())
        .or_else(|| jar.get(REFRESH_COOKIE).map(|c| c.value().to_owned()));
    match (req.ident, req.secret, refresh) {
        (Some(ident), Some(secret), _) => Ok(Credentials::Secret { ident, secret }),
        (None, None, Some(token)) => {
            let payload = state
                .coder
                .decode(&token, TokenType::Refresh, state.deps.now())?;
            let user_id = payload.user_id()?;
            let token_id = payload
                .jti
                .ok_or_else(|| Status::unauthenticated("refresh token has no id"))?;
            Ok(Credentials::Token { user_id, token_id })
        }
        (Some(_), None, _) | (None, Some(_), _) => {
            Err(Status::invalid_argument("ident and secret go together"))
        }
        (None, None, None) => Err(Status::unauthenticated("no credentials")),
    }
}

#[utoipa::path(
    post,
    path = "/auth/token",
    tag = "Auth",
    operation_id = "getRefreshToken",
    summary = "Log in or renew a session",
    description = "Exchanges an ident and secret, or a refresh token, for a fresh token set. \
        Tokens are returned in the body and set as cookies along with an XSRF cookie.",
    request_body = GetRefreshTokenRequest,
    responses(
        (status = 200, description = "Tokens issued", body = GetRefreshTokenResponse),
        (status = 400, description = "Malformed credentials (INVALID_ARGUMENT)", body = ErrorBody),
        (status = 401, description = "Bad credentials (UNAUTHENTICATED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, jar, payload))]
pub async fn get_refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<GetRefreshTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let creds = credentials(&state, &jar, payload)?;
    let mut task = AuthUserTask::new(state.deps.clone(), creds);
    state.run(&TaskContext::anonymous(), &mut task).await?;

    let (user, token_id) = task
        .user
        .zip(task.token_id)
        .ok_or_else(|| AppError(Status::internal("no token granted")))?;
    let tokens = state.coder.mint(&user, token_id, state.deps.now())?;

    let insecure = state.config.server.insecure_cookies;
    let refresh_exp = tokens.refresh.payload.exp;
    let mut jar = jar
        .add(cookie(REFRESH_COOKIE, tokens.refresh.token.clone(), REFRESH_PATH, refresh_exp, true, insecure))
        .add(cookie(AUTH_COOKIE, tokens.auth.token.clone(), AUTH_PATH, tokens.auth.payload.exp, true, insecure))
        .add(cookie(XSRF_COOKIE, new_xsrf_token(), "/", refresh_exp, false, insecure));
    jar = match &tokens.pix {
        Some(pix) => jar.add(cookie(
            PIX_COOKIE,
            pix.token.clone(),
            PIX_PATH,
            pix.payload.exp,
            true,
            insecure,
        )),
        None => jar.remove(removal(PIX_COOKIE, PIX_PATH)),
    };

    Ok((jar, Json(GetRefreshTokenResponse::from(tokens))))
}

#[utoipa::path(
    delete,
    path = "/auth/token",
    tag = "Auth",
    operation_id = "deleteToken",
    summary = "Log out",
    description = "Revokes the session the request is authenticated with and clears the token cookies.",
    responses(
        (status = 204, description = "Session revoked"),
        (status = 400, description = "Token already revoked (INVALID_ARGUMENT)", body = ErrorBody),
        (status = 401, description = "Not logged in (UNAUTHENTICATED)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, ctx, jar), fields(user_id = ?ctx.user_id()))]
pub async fn delete_token(
    Caller(ctx): Caller,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let session = ctx
        .session
        .ok_or_else(|| AppError(Status::unauthenticated("not logged in")))?;
    let mut task = UnauthUserTask::new(state.deps.clone(), session.user_id, session.token_id);
    state.run(&ctx, &mut task).await?;

    let jar = jar
        .remove(removal(REFRESH_COOKIE, REFRESH_PATH))
        .remove(removal(AUTH_COOKIE, AUTH_PATH))
        .remove(removal(PIX_COOKIE, PIX_PATH));
    Ok((jar, StatusCode::NO_CONTENT))
}
