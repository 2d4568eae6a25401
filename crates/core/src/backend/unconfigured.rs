use async_trait::async_trait;

use super::StorageBackend;
use crate::cursor::{Cursor, Page};
use crate::error::{Result, StorageError};
use crate::id::ObjectId;
use crate::stream::{ByteStream, ContentStream};

/// Installed when no storage backend is selected. Every operation fails
/// with `FunctionalityOmitted`.
#[derive(Debug, Default)]
pub struct UnconfiguredBackend;

fn omitted() -> StorageError {
    StorageError::FunctionalityOmitted("No storage backend is configured".to_string())
}

#[async_trait]
impl StorageBackend for UnconfiguredBackend {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn exists(&self, _id: &ObjectId) -> Result<bool> {
        Err(omitted())
    }

    async fn read(&self, _id: &ObjectId) -> Result<ByteStream> {
        Err(omitted())
    }

    async fn write(&self, _id: &ObjectId, _content: ContentStream<'_>) -> Result<()> {
        Err(omitted())
    }

    async fn delete(&self, _id: &ObjectId) -> Result<()> {
        Err(omitted())
    }

    async fn list_ids(&self, _cursor: &Cursor, _limit: usize) -> Result<Page> {
        Err(omitted())
    }
}
