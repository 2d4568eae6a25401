use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use s3::bucket::Bucket;
use s3::bucket_ops::BucketConfiguration;
use s3::creds::Credentials;
use s3::region::Region;
use tokio_util::io::StreamReader;
use tracing::info;

use super::StorageBackend;
use crate::cursor::{Cursor, Page};
use crate::error::{Result, StorageError};
use crate::id::ObjectId;
use crate::stream::{ByteStream, ContentStream, DEFAULT_BUFFER_SIZE, bounded_chunks};

/// Objects in one S3-compatible bucket, optionally under a key prefix.
///
/// `write` is check-then-put: two concurrent writers of the same id can
/// both pass the existence check, and the later put replaces the earlier.
pub struct CloudObjectBackend {
    bucket: Box<Bucket>,
    prefix: String,
    buffer_size: usize,
}

impl CloudObjectBackend {
    /// Connect to the bucket, creating it if it does not exist yet.
    pub async fn new(
        bucket_name: &str,
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        prefix: Option<&str>,
    ) -> Result<Self> {
        let region = Region::Custom {
            region: region.to_string(),
            endpoint: endpoint.to_string(),
        };
        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            .map_err(StorageError::unavailable)?;
        let bucket = Bucket::new(bucket_name, region.clone(), credentials.clone())
            .map_err(StorageError::unavailable)?
            .with_path_style();

        if !bucket.exists().await.map_err(StorageError::unavailable)? {
            let created = Bucket::create_with_path_style(
                bucket_name,
                region,
                credentials,
                BucketConfiguration::default(),
            )
            .await
            .map_err(StorageError::unavailable)?;
            if !created.success() {
                return Err(StorageError::BackendUnavailable(format!(
                    "failed to create bucket {bucket_name}: HTTP {}",
                    created.response_code
                )));
            }
            info!(bucket = bucket_name, "created bucket");
        }

        let prefix = prefix.unwrap_or("").trim_matches('/').to_string();
        Ok(Self {
            bucket,
            prefix,
            buffer_size: DEFAULT_BUFFER_SIZE,
        })
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    fn full_path(&self, id: &str) -> String {
        full_path(&self.prefix, id)
    }
}

fn full_path(prefix: &str, id: &str) -> String {
    if prefix.is_empty() {
        id.to_string()
    } else {
        format!("{prefix}/{id}")
    }
}

fn strip_prefix(prefix: &str, key: String) -> String {
    if prefix.is_empty() {
        return key;
    }
    match key.strip_prefix(&format!("{prefix}/")) {
        Some(stripped) => stripped.to_string(),
        None => key,
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Translate a native continuation token into the next cursor.
fn next_cursor(is_truncated: bool, token: Option<String>, page_len: usize) -> Option<Cursor> {
    if !is_truncated || page_len == 0 {
        return None;
    }
    token.filter(|t| !t.is_empty()).map(Cursor::from_marker)
}

#[async_trait]
impl StorageBackend for CloudObjectBackend {
    fn name(&self) -> &'static str {
        "cloud"
    }

    async fn exists(&self, id: &ObjectId) -> Result<bool> {
        let full = self.full_path(id.as_str());
        let (_, status) = self
            .bucket
            .head_object(&full)
            .await
            .map_err(|e| StorageError::unavailable(format!("S3 HEAD failed: {full}: {e}")))?;
        match status {
            404 => Ok(false),
            s if is_success(s) => Ok(true),
            s => Err(StorageError::BackendUnavailable(format!(
                "S3 HEAD {full} returned {s}"
            ))),
        }
    }

    async fn read(&self, id: &ObjectId) -> Result<ByteStream> {
        let full = self.full_path(id.as_str());
        let response = self
            .bucket
            .get_object_stream(&full)
            .await
            .map_err(|e| StorageError::unavailable(format!("S3 GET failed: {full}: {e}")))?;
        match response.status_code {
            404 => Err(StorageError::ObjectNotFound(id.to_string())),
            s if is_success(s) => {
                let content = response.bytes.map_err(StorageError::unavailable).boxed();
                Ok(bounded_chunks(content, self.buffer_size))
            }
            s => Err(StorageError::BackendUnavailable(format!(
                "S3 GET {full} returned {s}"
            ))),
        }
    }

    async fn write(&self, id: &ObjectId, content: ContentStream<'_>) -> Result<()> {
        if self.exists(id).await? {
            return Err(StorageError::ObjectAlreadyExists(id.to_string()));
        }
        let full = self.full_path(id.as_str());
        let mut reader = StreamReader::new(content.map_err(std::io::Error::other));
        self.bucket
            .put_object_stream(&mut reader, &full)
            .await
            .map_err(|e| StorageError::unavailable(format!("S3 PUT failed: {full}: {e}")))?;
        Ok(())
    }

    async fn delete(&self, id: &ObjectId) -> Result<()> {
        let full = self.full_path(id.as_str());
        let response = self
            .bucket
            .delete_object(&full)
            .await
            .map_err(|e| StorageError::unavailable(format!("S3 DELETE failed: {full}: {e}")))?;
        match response.status_code() {
            404 => Ok(()),
            s if is_success(s) => Ok(()),
            s => Err(StorageError::BackendUnavailable(format!(
                "S3 DELETE {full} returned {s}"
            ))),
        }
    }

    async fn list_ids(&self, cursor: &Cursor, limit: usize) -> Result<Page> {
        let list_prefix = if self.prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", self.prefix)
        };
        let (result, status) = self
            .bucket
            .list_page(
                list_prefix,
                None,
                cursor.marker().map(str::to_string),
                None,
                Some(limit),
            )
            .await
            .map_err(|e| StorageError::unavailable(format!("S3 LIST failed: {e}")))?;
        if !is_success(status) {
            return Err(StorageError::BackendUnavailable(format!(
                "S3 LIST returned {status}"
            )));
        }
        let ids: Vec<String> = result
            .contents
            .into_iter()
            .map(|obj| strip_prefix(&self.prefix, obj.key))
            .collect();
        let next_cursor =
            next_cursor(result.is_truncated, result.next_continuation_token, ids.len());
        Ok(Page { ids, next_cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_carry_the_prefix() {
        assert_eq!(full_path("", "abc"), "abc");
        assert_eq!(full_path("archive", "abc"), "archive/abc");
        assert_eq!(strip_prefix("archive", "archive/abc".to_string()), "abc");
        assert_eq!(strip_prefix("", "abc".to_string()), "abc");
        assert_eq!(strip_prefix("archive", "other/abc".to_string()), "other/abc");
    }

    #[test]
    fn continuation_token_becomes_cursor() {
        assert_eq!(
            next_cursor(true, Some("tok-1".into()), 200),
            Some(Cursor::from_marker("tok-1"))
        );
        assert_eq!(next_cursor(false, Some("tok-1".into()), 200), None);
        assert_eq!(next_cursor(true, None, 200), None);
        assert_eq!(next_cursor(true, Some("tok-1".into()), 0), None);
        assert_eq!(next_cursor(true, Some(String::new()), 5), None);
    }
}
