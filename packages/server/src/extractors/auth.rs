use axum::{
    extract::FromRequestParts,
    http::{Method, header, request::Parts},
};
use axum_extra::extract::CookieJar;
use common::Status;

use crate::error::AppError;
use crate::state::AppState;
use crate::tasks::TaskContext;
use crate::utils::tokens::TokenType;

pub const REFRESH_COOKIE: &str = "refresh_token";
pub const AUTH_COOKIE: &str = "auth_token";
pub const PIX_COOKIE: &str = "pix_token";
pub const XSRF_COOKIE: &str = "xsrf_token";
pub const XSRF_HEADER: &str = "x-xsrf-token";

/// Caller identity for API calls, from `Authorization: Bearer <token>` or the
/// auth cookie.
///
/// Requests without either run anonymously. A token that fails to verify is
/// rejected rather than downgraded.
pub struct Caller(pub TaskContext);

/// Like [`Caller`], but pix reads also accept the pix cookie.
pub struct PixCaller(pub TaskContext);

fn bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Cookie-authenticated mutations must echo the XSRF cookie in a header.
fn check_xsrf(parts: &Parts, jar: &CookieJar) -> Result<(), Status> {
    if is_safe(&parts.method) || bearer(parts).is_some() {
        return Ok(());
    }
    let cookie = jar
        .get(XSRF_COOKIE)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Status::unauthenticated("missing xsrf cookie"))?;
    let header = parts
        .headers
        .get(XSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Status::unauthenticated("missing xsrf header"))?;
    if cookie != header {
        return Err(Status::unauthenticated("xsrf token mismatch"));
    }
    Ok(())
}

fn session(state: &AppState, token: &str, typ: TokenType) -> Result<TaskContext, Status> {
    let payload = state.coder.decode(token, typ, state.deps.now())?;
    let user_id = payload.user_id()?;
    let token_id = payload
        .tpi
        .ok_or_else(|| Status::unauthenticated("token has no parent"))?;
    Ok(TaskContext::for_session(user_id, token_id))
}

fn caller(parts: &Parts, state: &AppState, allow_pix: bool) -> Result<TaskContext, Status> {
    let jar = CookieJar::from_headers(&parts.headers);
    check_xsrf(parts, &jar)?;

    if let Some(token) = bearer(parts) {
        return session(state, token, TokenType::Auth);
    }
    if let Some(c) = jar.get(AUTH_COOKIE) {
        return session(state, c.value(), TokenType::Auth);
    }
    if allow_pix && let Some(c) = jar.get(PIX_COOKIE) {
        return session(state, c.value(), TokenType::Pix);
    }
    Ok(TaskContext::anonymous())
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Caller(caller(parts, state, false)?))
    }
}

impl FromRequestParts<AppState> for PixCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(PixCaller(caller(parts, state, true)?))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(method: Method, headers: &[(&str, &str)]) -> Parts {
        let mut req = Request::builder().method(method).uri("/api/v1/pics");
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        req.body(()).unwrap().into_parts().0
    }

    #[test]
    fn reads_skip_xsrf() {
        let p = parts(Method::GET, &[]);
        assert!(check_xsrf(&p, &CookieJar::from_headers(&p.headers)).is_ok());
    }

    #[test]
    fn bearer_mutations_skip_xsrf() {
        let p = parts(Method::POST, &[("authorization", "Bearer abc")]);
        assert!(check_xsrf(&p, &CookieJar::from_headers(&p.headers)).is_ok());
    }

    #[test]
    fn cookie_mutations_need_matching_pair() {
        let p = parts(Method::POST, &[]);
        let err = check_xsrf(&p, &CookieJar::from_headers(&p.headers)).unwrap_err();
        assert_eq!(err.code(), common::Code::Unauthenticated);

        let p = parts(
            Method::POST,
            &[("cookie", "xsrf_token=abc"), ("x-xsrf-token", "abd")],
        );
        assert_eq!(
            check_xsrf(&p, &CookieJar::from_headers(&p.headers))
                .unwrap_err()
                .message(),
            "xsrf token mismatch"
        );

        let p = parts(
            Method::DELETE,
            &[("cookie", "xsrf_token=abc"), ("x-xsrf-token", "abc")],
        );
        assert!(check_xsrf(&p, &CookieJar::from_headers(&p.headers)).is_ok());
    }
}
