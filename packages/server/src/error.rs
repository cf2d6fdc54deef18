use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::{Code, Status};
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Canonical status code, e.g. `INVALID_ARGUMENT` or `NOT_FOUND`.
    #[schema(example = "INVALID_ARGUMENT")]
    pub code: Code,
    /// Human-readable error description.
    #[schema(example = "Can't use non HTTP")]
    pub message: String,
}

/// Application-level error type: a task [`Status`] on its way to the client.
#[derive(Debug)]
pub struct AppError(pub Status);

pub fn http_status(code: Code) -> StatusCode {
    match code {
        Code::Ok => StatusCode::OK,
        Code::InvalidArgument | Code::OutOfRange | Code::FailedPrecondition => {
            StatusCode::BAD_REQUEST
        }
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists | Code::Aborted => StatusCode::CONFLICT,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::Cancelled => StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Code::Unknown | Code::Internal | Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        let sts = self.0;
        let code = sts.code();
        let message = if code.is_server_fault() {
            tracing::error!(code = %code, cause = ?sts.cause(), "Internal error: {}", sts.message());
            "An unexpected error occurred".to_owned()
        } else {
            sts.message().to_owned()
        };
        (http_status(code), ErrorBody { code, message })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<Status> for AppError {
    fn from(sts: Status) -> Self {
        AppError(sts)
    }
}
