pub mod auth;
pub mod pic;
pub mod shared;
pub mod user;
