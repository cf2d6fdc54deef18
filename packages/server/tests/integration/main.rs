mod common;
mod pic;
mod user;
