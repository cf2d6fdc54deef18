//! Records stored in the `data` column of each table.

mod comment;
mod ident;
mod pic;
mod tag;
mod user;
mod vote;

pub use comment::PicComment;
pub use ident::{IdentType, PicIdent};
pub use pic::{
    AnimationInfo, DeletionReason, DeletionStatus, FileSource, Mime, Pic, Z_99, nanos,
};
pub use tag::{PicTag, Tag};
pub use user::{User, UserToken};
pub use vote::{PicVote, Vote};

#[cfg(test)]
pub(crate) use pic::tests::sample_pic;
