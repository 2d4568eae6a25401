pub mod document;
pub mod local;
pub mod s3;
pub mod unconfigured;

use async_trait::async_trait;

use crate::cursor::{Cursor, Page};
use crate::error::Result;
use crate::id::ObjectId;
use crate::stream::{ByteStream, ContentStream};

/// The uniform contract every store is adapted to.
///
/// Writes are create-only: `write` fails with `ObjectAlreadyExists` rather
/// than overwrite. `delete` succeeds whether or not the object exists.
/// `list_ids` receives an already clamped `limit`; backends without a cheap
/// total-order enumeration fail it with `FunctionalityOmitted`.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn name(&self) -> &'static str;
    async fn exists(&self, id: &ObjectId) -> Result<bool>;
    async fn read(&self, id: &ObjectId) -> Result<ByteStream>;
    async fn write(&self, id: &ObjectId, content: ContentStream<'_>) -> Result<()>;
    async fn delete(&self, id: &ObjectId) -> Result<()>;
    async fn list_ids(&self, cursor: &Cursor, limit: usize) -> Result<Page>;
}
