use common::{Status, Varint};

use crate::error::AppError;

/// Decode a varint id sent by the client.
pub fn parse_id(raw: &str, what: &str) -> Result<i64, AppError> {
    Varint::decode_all(raw.trim())
        .map(|v| v.0)
        .map_err(|e| AppError(Status::invalid_argument(format!("Can't decode {what}")).with_cause(e)))
}

/// Like [`parse_id`], but absent or empty input means no id.
pub fn parse_optional_id(raw: Option<&str>, what: &str) -> Result<Option<i64>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_id(s, what).map(Some),
    }
}

pub fn encode_id(id: i64) -> String {
    Varint(id).encode()
}
