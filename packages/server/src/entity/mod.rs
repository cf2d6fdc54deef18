pub mod pic;
pub mod pic_comment;
pub mod pic_ident;
pub mod pic_tag;
pub mod pic_vote;
pub mod sequence;
pub mod tag;
pub mod user;
