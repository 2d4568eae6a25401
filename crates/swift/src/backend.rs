use std::io;

use archstor_core::backend::StorageBackend;
use archstor_core::stream::{ByteStream, ContentStream, DEFAULT_BUFFER_SIZE, bounded_chunks};
use archstor_core::{Cursor, ObjectId, Page, Result, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt, TryStreamExt};
use reqwest::Body;
use tracing::{debug, info};

use crate::auth::Credentials;
use crate::client::SwiftClient;

pub const DEFAULT_CONTAINER: &str = "lts";

/// Objects in one Swift container, listed with Swift's marker pagination.
///
/// `write` is check-then-put: Swift has no create-if-absent, so concurrent
/// writers of the same id can both succeed and the last one wins.
pub struct DistributedObjectBackend {
    client: SwiftClient,
    container: String,
    buffer_size: usize,
}

impl DistributedObjectBackend {
    /// Authenticate and make sure the container exists, creating it if needed.
    pub async fn new(credentials: Credentials, container: &str) -> Result<Self> {
        let client = SwiftClient::new(credentials)?;
        if !client.head_container(container).await? {
            client.put_container(container).await?;
            info!(container, "created container");
        }
        Ok(Self {
            client,
            container: container.to_string(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        })
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }
}

/// A full page continues after its last name; a short page ends the listing.
fn next_marker(ids: &[String], limit: usize) -> Option<Cursor> {
    if ids.len() < limit {
        return None;
    }
    ids.last().map(Cursor::from_marker)
}

#[async_trait]
impl StorageBackend for DistributedObjectBackend {
    fn name(&self) -> &'static str {
        "distributed"
    }

    async fn exists(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.client.head_object(&self.container, id.as_str()).await?)
    }

    async fn read(&self, id: &ObjectId) -> Result<ByteStream> {
        match self.client.get_object(&self.container, id.as_str()).await? {
            Some(resp) => {
                let content = resp.bytes_stream().map_err(StorageError::unavailable).boxed();
                Ok(bounded_chunks(content, self.buffer_size))
            }
            None => Err(StorageError::ObjectNotFound(id.to_string())),
        }
    }

    async fn write(&self, id: &ObjectId, mut content: ContentStream<'_>) -> Result<()> {
        if self.exists(id).await? {
            return Err(StorageError::ObjectAlreadyExists(id.to_string()));
        }

        // The request body must be 'static, so chunks are relayed through a
        // channel that this task fills while the upload runs.
        let (mut tx, rx) = mpsc::channel::<io::Result<Bytes>>(4);
        let upload = self
            .client
            .put_object(&self.container, id.as_str(), Body::wrap_stream(rx));
        let relay = async move {
            while let Some(chunk) = content.next().await {
                match chunk {
                    Ok(bytes) => {
                        if tx.send(Ok(bytes)).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Err(io::Error::other(err.to_string()))).await;
                        return Err(err);
                    }
                }
            }
            Ok(())
        };

        let (uploaded, relayed) = futures::join!(upload, relay);
        relayed?;
        uploaded?;
        debug!(%id, container = %self.container, "object written");
        Ok(())
    }

    async fn delete(&self, id: &ObjectId) -> Result<()> {
        if !self.client.delete_object(&self.container, id.as_str()).await? {
            debug!(%id, "delete of absent object");
        }
        Ok(())
    }

    async fn list_ids(&self, cursor: &Cursor, limit: usize) -> Result<Page> {
        let entries = self
            .client
            .list_objects(&self.container, cursor.marker(), limit)
            .await?;
        let ids: Vec<String> = entries.into_iter().map(|entry| entry.name).collect();
        let next_cursor = next_marker(&ids, limit);
        Ok(Page { ids, next_cursor })
    }
}
