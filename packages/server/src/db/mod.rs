//! Transactional access to the pixur tables.

mod idalloc;
mod job;
mod keys;
mod tables;

pub use idalloc::IdAlloc;
pub use job::Job;
pub use keys::{
    IdentKey, Lock, PicCommentKey, PicId, PicIdentKey, PicIndexOrder, PicTagByTag, PicTagKey,
    PicVoteKey, ScanKey, ScanOpts, TagId, TagName, UserId, UserIdent,
};

use common::{Code, Status};
use sea_orm::{DbErr, RuntimeErr, SqlErr, sqlx};

/// Codes of errors that mean the transaction lost a lock race and may be rerun.
///
/// PostgreSQL and MySQL report SQLSTATE: 40P01 is a deadlock, 40001 a
/// serialization failure. SQLite reports its extended result code:
/// the SQLITE_BUSY family (5, 261, 517, 773) and SQLITE_LOCKED (6, 262).
const RETRYABLE_CODES: &[&str] = &["40P01", "40001", "5", "261", "517", "773", "6", "262"];

fn database_error(err: &DbErr) -> Option<&dyn sqlx::error::DatabaseError> {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(e))
        | DbErr::Query(RuntimeErr::SqlxError(e))
        | DbErr::Conn(RuntimeErr::SqlxError(e)) => e.as_database_error(),
        _ => None,
    }
}

fn is_retryable(err: &DbErr) -> bool {
    database_error(err)
        .and_then(|e| e.code())
        .is_some_and(|code| RETRYABLE_CODES.iter().any(|c| *c == code))
}

/// Convert a database error into a status, marking lock conflicts retryable.
pub fn db_status(err: DbErr, message: &str) -> Status {
    if is_retryable(&err) {
        Status::aborted(message).with_cause(err).retryable()
    } else {
        Status::internal(message).with_cause(err)
    }
}

/// Like [`db_status`], but unique violations become `ALREADY_EXISTS`.
pub fn insert_status(err: DbErr, message: &str) -> Status {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            Status::already_exists(message).with_cause(err)
        }
        _ => db_status(err, message),
    }
}

/// For inserts of keys another job may be creating at the same time.
///
/// The loser's `ALREADY_EXISTS` becomes a retryable `ABORTED`, so the rerun
/// reads the winner's committed row instead.
pub fn retry_on_conflict(sts: Status) -> Status {
    if sts.code() == Code::AlreadyExists {
        Status::aborted("concurrent insert of the same key")
            .with_cause(sts)
            .retryable()
    } else {
        sts
    }
}
