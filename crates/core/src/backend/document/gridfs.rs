use async_trait::async_trait;
use futures::io::AsyncWriteExt;
use futures::{StreamExt, TryStreamExt};
use mongodb::Client;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::{ErrorKind, GridFsErrorKind};
use mongodb::gridfs::{FilesCollectionDocument, GridFsBucket};
use mongodb::options::GridFsFindOptions;
use tokio_util::compat::FuturesAsyncReadCompatExt;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use super::DocumentStore;
use crate::error::{Result, StorageError};
use crate::stream::{ByteStream, ContentStream, DEFAULT_BUFFER_SIZE};

pub const DEFAULT_DATABASE: &str = "lts";

/// GridFS bucket in a MongoDB database, files keyed by `_id`.
pub struct GridFsStore {
    bucket: GridFsBucket,
    buffer_size: usize,
}

impl GridFsStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(StorageError::unavailable)?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(StorageError::unavailable)?;
        info!(database, "connected to document store");
        Ok(Self {
            bucket: db.gridfs_bucket(None),
            buffer_size: DEFAULT_BUFFER_SIZE,
        })
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    async fn find(
        &self,
        filter: Document,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<FilesCollectionDocument>> {
        let mut options = GridFsFindOptions::default();
        options.sort = Some(doc! { "_id": 1 });
        options.skip = Some(skip);
        options.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX));
        self.bucket
            .find(filter, options)
            .await
            .map_err(StorageError::unavailable)?
            .try_collect()
            .await
            .map_err(StorageError::unavailable)
    }
}

fn is_file_not_found(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::GridFs { 0: GridFsErrorKind::FileNotFound { .. }, .. }
    )
}

fn id_string(id: Bson) -> String {
    match id {
        Bson::String(s) => s,
        other => other.to_string(),
    }
}

#[async_trait]
impl DocumentStore for GridFsStore {
    async fn contains(&self, id: &str) -> Result<bool> {
        Ok(!self.find(doc! { "_id": id }, 0, 1).await?.is_empty())
    }

    async fn sorted_ids(&self, skip: u64, limit: u64) -> Result<Vec<String>> {
        let files = self.find(doc! {}, skip, limit).await?;
        Ok(files.into_iter().map(|file| id_string(file.id)).collect())
    }

    async fn open(&self, id: &str) -> Result<Option<ByteStream>> {
        match self
            .bucket
            .open_download_stream(Bson::String(id.to_string()))
            .await
        {
            Ok(download) => Ok(Some(
                ReaderStream::with_capacity(download.compat(), self.buffer_size)
                    .map_err(StorageError::from)
                    .boxed(),
            )),
            Err(e) if is_file_not_found(&e) => Ok(None),
            Err(e) => Err(StorageError::unavailable(e)),
        }
    }

    async fn insert(&self, id: &str, mut content: ContentStream<'_>) -> Result<()> {
        let mut upload = self
            .bucket
            .open_upload_stream_with_id(Bson::String(id.to_string()), id, None);
        while let Some(chunk) = content.next().await {
            let written = match chunk {
                Ok(chunk) => upload.write_all(&chunk).await.map_err(StorageError::from),
                Err(e) => Err(e),
            };
            if let Err(err) = written {
                if let Err(abort) = upload.abort().await {
                    warn!(id, error = %abort, "failed to abort GridFS upload");
                }
                return Err(err);
            }
        }
        upload.close().await?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        match self.bucket.delete(Bson::String(id.to_string())).await {
            Ok(()) => Ok(true),
            Err(e) if is_file_not_found(&e) => Ok(false),
            Err(e) => Err(StorageError::unavailable(e)),
        }
    }
}
