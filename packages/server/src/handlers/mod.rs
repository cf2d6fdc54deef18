pub mod auth;
pub mod pic;
pub mod pix;
pub mod user;
