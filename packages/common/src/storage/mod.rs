mod error;
mod hash;
mod layout;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use hash::{PicDigests, PicHasher};
pub use layout::{pic_base_dir, pic_path, relative_url, thumbnail_path, thumbnail_relative_url};
pub use traits::{PixFs, TempFile};
