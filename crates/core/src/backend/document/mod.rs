//! Blob-collection backend with offset cursors over ids sorted ascending.

pub mod gridfs;
pub mod memory;

use async_trait::async_trait;
use tracing::debug;

use super::StorageBackend;
use crate::cursor::{Cursor, Page};
use crate::error::{Result, StorageError};
use crate::id::ObjectId;
use crate::stream::{ByteStream, ContentStream, DEFAULT_BUFFER_SIZE, bounded_chunks};

pub use gridfs::GridFsStore;
pub use memory::MemoryDocumentStore;

/// The narrow surface a document database's blob store must offer.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point lookup by id.
    async fn contains(&self, id: &str) -> Result<bool>;

    /// Ids in ascending order, skipping `skip` and returning at most `limit`.
    async fn sorted_ids(&self, skip: u64, limit: u64) -> Result<Vec<String>>;

    /// `None` if no document has this id.
    async fn open(&self, id: &str) -> Result<Option<ByteStream>>;

    async fn insert(&self, id: &str, content: ContentStream<'_>) -> Result<()>;

    /// Returns whether a document was removed.
    async fn remove(&self, id: &str) -> Result<bool>;
}

pub struct DocumentStoreBackend<S> {
    store: S,
    buffer_size: usize,
}

impl<S: DocumentStore> DocumentStoreBackend<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S: DocumentStore> StorageBackend for DocumentStoreBackend<S> {
    fn name(&self) -> &'static str {
        "document"
    }

    async fn exists(&self, id: &ObjectId) -> Result<bool> {
        self.store.contains(id.as_str()).await
    }

    async fn read(&self, id: &ObjectId) -> Result<ByteStream> {
        match self.store.open(id.as_str()).await? {
            Some(content) => Ok(bounded_chunks(content, self.buffer_size)),
            None => Err(StorageError::ObjectNotFound(id.to_string())),
        }
    }

    async fn write(&self, id: &ObjectId, content: ContentStream<'_>) -> Result<()> {
        if self.store.contains(id.as_str()).await? {
            return Err(StorageError::ObjectAlreadyExists(id.to_string()));
        }
        self.store.insert(id.as_str(), content).await
    }

    async fn delete(&self, id: &ObjectId) -> Result<()> {
        if !self.store.remove(id.as_str()).await? {
            debug!(%id, "delete of absent object");
        }
        Ok(())
    }

    async fn list_ids(&self, cursor: &Cursor, limit: usize) -> Result<Page> {
        let offset = cursor.offset()?;
        let limit = limit as u64;
        let ids = self.store.sorted_ids(offset, limit).await?;
        // Peek one past the page so an exhausted listing ends without an empty page.
        // No position exists past u64::MAX, so an overflowing offset ends the listing.
        let Some(next_offset) = offset.checked_add(limit) else {
            return Ok(Page {
                ids,
                next_cursor: None,
            });
        };
        let more = !self.store.sorted_ids(next_offset, 1).await?.is_empty();
        Ok(Page {
            ids,
            next_cursor: more.then(|| Cursor::new(next_offset.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use bytes::Bytes;

    use super::*;
    use crate::stream::{collect_bytes, content_from};

    fn backend() -> DocumentStoreBackend<MemoryDocumentStore> {
        DocumentStoreBackend::new(MemoryDocumentStore::new())
    }

    fn id(raw: &str) -> ObjectId {
        ObjectId::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn write_then_read_returns_content() {
        let backend = backend();
        backend.write(&id("abc123"), content_from("hello")).await.unwrap();
        let data = collect_bytes(backend.read(&id("abc123")).await.unwrap()).await.unwrap();
        assert_eq!(data, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn overwrite_is_rejected_and_content_kept() {
        let backend = backend();
        backend.write(&id("k"), content_from("one")).await.unwrap();
        let err = backend.write(&id("k"), content_from("two")).await.unwrap_err();
        assert!(matches!(err, StorageError::ObjectAlreadyExists(_)));
        let data = collect_bytes(backend.read(&id("k")).await.unwrap()).await.unwrap();
        assert_eq!(data, Bytes::from_static(b"one"));
    }

    #[tokio::test]
    async fn delete_of_absent_id_succeeds() {
        let backend = backend();
        backend.delete(&id("ghost")).await.unwrap();
        backend.delete(&id("ghost")).await.unwrap();
        assert!(!backend.exists(&id("ghost")).await.unwrap());
    }

    #[tokio::test]
    async fn pagination_visits_every_id_once() {
        let backend = backend();
        let mut inserted = HashSet::new();
        for n in 0..1234 {
            let key = uuid::Uuid::new_v4().simple().to_string();
            backend
                .write(&id(&key), content_from(format!("this is a test object ({n})")))
                .await
                .unwrap();
            inserted.insert(key);
        }

        let mut seen = Vec::new();
        let mut cursor = Some(Cursor::initial());
        let mut pages = 0;
        while let Some(current) = cursor {
            let page = backend.list_ids(&current, 200).await.unwrap();
            seen.extend(page.ids);
            cursor = page.next_cursor;
            pages += 1;
        }

        assert_eq!(pages, 7);
        assert_eq!(seen.len(), 1234);
        let unique: HashSet<_> = seen.into_iter().collect();
        assert_eq!(unique, inserted);
    }

    #[tokio::test]
    async fn listing_is_sorted_and_terminates_exactly() {
        let backend = backend();
        for key in ["c", "a", "b", "d"] {
            backend.write(&id(key), content_from(key)).await.unwrap();
        }

        let first = backend.list_ids(&Cursor::initial(), 2).await.unwrap();
        assert_eq!(first.ids, vec!["a", "b"]);
        assert_eq!(first.next_cursor, Some(Cursor::new("2")));

        let second = backend.list_ids(&Cursor::new("2"), 2).await.unwrap();
        assert_eq!(second.ids, vec!["c", "d"]);
        assert_eq!(second.next_cursor, None);
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let page = backend().list_ids(&Cursor::initial(), 1000).await.unwrap();
        assert!(page.ids.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn cursor_near_u64_max_ends_listing() {
        let backend = backend();
        backend.write(&id("abc123"), content_from("hello")).await.unwrap();
        for offset in [u64::MAX, u64::MAX - 5] {
            let page = backend
                .list_ids(&Cursor::new(offset.to_string()), 10)
                .await
                .unwrap();
            assert!(page.ids.is_empty());
            assert!(page.next_cursor.is_none());
        }
    }

    #[tokio::test]
    async fn non_numeric_cursor_is_rejected() {
        let err = backend().list_ids(&Cursor::new("later"), 10).await.unwrap_err();
        assert!(matches!(err, StorageError::MalformedRequest(_)));
    }
}
