pub mod capability;
pub mod config;
pub mod retry;
pub mod status;
pub mod storage;
pub mod varint;

pub use capability::Capability;
pub use status::{Code, Status};
pub use varint::Varint;
