use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use tokio::sync::RwLock;

use super::DocumentStore;
use crate::error::{Result, StorageError};
use crate::stream::{ByteStream, ContentStream, collect_bytes};

/// In-process document store, for tests and local development.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    docs: Arc<RwLock<BTreeMap<String, Bytes>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.docs.read().await.contains_key(id))
    }

    async fn sorted_ids(&self, skip: u64, limit: u64) -> Result<Vec<String>> {
        let docs = self.docs.read().await;
        Ok(docs
            .keys()
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn open(&self, id: &str) -> Result<Option<ByteStream>> {
        let docs = self.docs.read().await;
        Ok(docs
            .get(id)
            .cloned()
            .map(|data| stream::once(async move { Ok(data) }).boxed()))
    }

    async fn insert(&self, id: &str, content: ContentStream<'_>) -> Result<()> {
        let data = collect_bytes(content).await?;
        let mut docs = self.docs.write().await;
        if docs.contains_key(id) {
            return Err(StorageError::ObjectAlreadyExists(id.to_string()));
        }
        docs.insert(id.to_string(), data);
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        Ok(self.docs.write().await.remove(id).is_some())
    }
}
