pub mod hash;
pub mod text;
pub mod tokens;
pub mod url;
