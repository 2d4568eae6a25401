use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use super::StorageBackend;
use crate::cursor::{Cursor, Page};
use crate::error::{Result, StorageError};
use crate::id::ObjectId;
use crate::pairtree::identifier_to_path;
use crate::stream::{ByteStream, ContentStream, DEFAULT_BUFFER_SIZE};

const OBJECT_DIR: &str = "arf";
const CONTENT_FILE: &str = "content.file";

/// Stores each object at `<root>/<pairtree path>/arf/content.file`.
pub struct FilesystemBackend {
    root: PathBuf,
    buffer_size: usize,
}

impl FilesystemBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            root: path.as_ref().to_path_buf(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn init(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| {
            StorageError::unavailable(format!("failed to create directory {}: {e}", root.display()))
        })?;
        Ok(Self::new(root))
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    fn content_path(&self, id: &ObjectId) -> PathBuf {
        self.root
            .join(identifier_to_path(id.as_str()))
            .join(OBJECT_DIR)
            .join(CONTENT_FILE)
    }
}

async fn copy_into(file: &mut File, content: &mut ContentStream<'_>) -> Result<()> {
    while let Some(chunk) = content.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn exists(&self, id: &ObjectId) -> Result<bool> {
        match tokio::fs::metadata(self.content_path(id)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, id: &ObjectId) -> Result<ByteStream> {
        let full = self.content_path(id);
        let file = match File::open(&full).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::ObjectNotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(ReaderStream::with_capacity(file, self.buffer_size)
            .map_err(StorageError::from)
            .boxed())
    }

    async fn write(&self, id: &ObjectId, mut content: ContentStream<'_>) -> Result<()> {
        if self.exists(id).await? {
            return Err(StorageError::ObjectAlreadyExists(id.to_string()));
        }
        let full = self.content_path(id);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // create_new closes the window between the existence check and the open.
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&full).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::ObjectAlreadyExists(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if let Err(err) = copy_into(&mut file, &mut content).await {
            drop(file);
            if let Err(cleanup) = tokio::fs::remove_file(&full).await {
                warn!(path = %full.display(), error = %cleanup, "failed to remove partial upload");
            }
            return Err(err);
        }
        debug!(%id, path = %full.display(), "object written");
        Ok(())
    }

    async fn delete(&self, id: &ObjectId) -> Result<()> {
        match tokio::fs::remove_file(self.content_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_ids(&self, _cursor: &Cursor, _limit: usize) -> Result<Page> {
        Err(StorageError::listing_omitted())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures::stream;

    use super::*;
    use crate::stream::{collect_bytes, content_from};

    fn id(raw: &str) -> ObjectId {
        ObjectId::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn filesystem_backend_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::init(dir.path()).unwrap();
        let key = id("abc123");

        backend.write(&key, content_from("hello")).await.unwrap();
        assert!(backend.exists(&key).await.unwrap());

        let data = collect_bytes(backend.read(&key).await.unwrap()).await.unwrap();
        assert_eq!(data, Bytes::from_static(b"hello"));

        backend.delete(&key).await.unwrap();
        assert!(!backend.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn objects_are_sharded_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        backend.write(&id("abcde"), content_from("x")).await.unwrap();
        assert!(dir.path().join("ab/cd/e/arf/content.file").is_file());
    }

    #[tokio::test]
    async fn writes_are_create_only() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        let key = id("dup");

        backend.write(&key, content_from("first")).await.unwrap();
        let err = backend.write(&key, content_from("second")).await.unwrap_err();
        assert!(matches!(err, StorageError::ObjectAlreadyExists(_)));

        let data = collect_bytes(backend.read(&key).await.unwrap()).await.unwrap();
        assert_eq!(data, Bytes::from_static(b"first"));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        let key = id("never-written");
        for _ in 0..3 {
            backend.delete(&key).await.unwrap();
        }
        assert!(!backend.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        assert!(matches!(
            backend.read(&id("missing")).await,
            Err(StorageError::ObjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn listing_is_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        let err = backend.list_ids(&Cursor::initial(), 10).await.unwrap_err();
        assert_eq!(err.status_code(), 501);
    }

    #[tokio::test]
    async fn failed_upload_leaves_no_object() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        let key = id("broken");
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(StorageError::MalformedRequest("client went away".into())),
        ])
        .boxed();

        let err = backend.write(&key, body).await.unwrap_err();
        assert!(matches!(err, StorageError::MalformedRequest(_)));
        assert!(!backend.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn reads_stream_in_buffer_sized_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).with_buffer_size(1024);
        let key = id("large");
        let payload = vec![3u8; 10 * 1024 + 5];
        backend.write(&key, content_from(payload.clone())).await.unwrap();

        let chunks: Vec<Bytes> = backend.read(&key).await.unwrap().try_collect().await.unwrap();
        assert!(chunks.iter().all(|c| c.len() <= 1024));
        assert_eq!(chunks.concat(), payload);
    }
}
