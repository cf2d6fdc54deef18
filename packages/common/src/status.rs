use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Boxed error carried as the cause of a [`Status`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Canonical status codes shared by every task and RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Code {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    Unauthenticated,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
}

impl Code {
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Ok => "OK",
            Code::Cancelled => "CANCELLED",
            Code::Unknown => "UNKNOWN",
            Code::InvalidArgument => "INVALID_ARGUMENT",
            Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Code::NotFound => "NOT_FOUND",
            Code::AlreadyExists => "ALREADY_EXISTS",
            Code::PermissionDenied => "PERMISSION_DENIED",
            Code::Unauthenticated => "UNAUTHENTICATED",
            Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Code::FailedPrecondition => "FAILED_PRECONDITION",
            Code::Aborted => "ABORTED",
            Code::OutOfRange => "OUT_OF_RANGE",
            Code::Unimplemented => "UNIMPLEMENTED",
            Code::Internal => "INTERNAL",
            Code::Unavailable => "UNAVAILABLE",
            Code::DataLoss => "DATA_LOSS",
        }
    }

    /// Whether the message of a status with this code may leak server internals.
    pub fn is_server_fault(&self) -> bool {
        matches!(self, Code::Unknown | Code::Internal | Code::DataLoss)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error returned by tasks.
///
/// The `message` is shown to callers. The `cause` is only ever logged.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Status {
    code: Code,
    message: String,
    #[source]
    cause: Option<BoxError>,
    retryable: bool,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
            retryable: false,
        }
    }

    /// Attach the underlying error.
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Mark the status as safe to retry from scratch, e.g. after a deadlock.
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&BoxError> {
        self.cause.as_ref()
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(Code::Cancelled, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(Code::AlreadyExists, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(Code::PermissionDenied, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(Code::Unauthenticated, message)
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(Code::Aborted, message)
    }

    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::new(Code::OutOfRange, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, message)
    }
}

impl From<std::io::Error> for Status {
    fn from(err: std::io::Error) -> Self {
        Status::internal("I/O failure").with_cause(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_message() {
        let sts = Status::invalid_argument("No pic specified");
        assert_eq!(sts.to_string(), "INVALID_ARGUMENT: No pic specified");
    }

    #[test]
    fn cause_is_exposed_as_source() {
        let io = std::io::Error::other("disk on fire");
        let sts = Status::internal("Can't save pic").with_cause(io);
        let source = StdError::source(&sts).expect("source should be set");
        assert_eq!(source.to_string(), "disk on fire");
    }

    #[test]
    fn only_marked_statuses_are_retryable() {
        assert!(!Status::aborted("version mismatch").is_retryable());
        assert!(Status::aborted("deadlock").retryable().is_retryable());
    }

    #[test]
    fn code_serializes_in_wire_form() {
        let json = serde_json::to_string(&Code::AlreadyExists).unwrap();
        assert_eq!(json, "\"ALREADY_EXISTS\"");
        assert_eq!(Code::AlreadyExists.as_str(), "ALREADY_EXISTS");
    }
}
