pub mod backend;
pub mod cursor;
pub mod error;
pub mod id;
pub mod pairtree;
pub mod stream;

pub use backend::StorageBackend;
pub use cursor::{Cursor, Page};
pub use error::{Result, StorageError};
pub use id::ObjectId;
