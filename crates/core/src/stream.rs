use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};

use crate::error::{Result, StorageError};

/// Default streaming chunk size (BUFF).
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Lazily pulled object content. Dropping the stream releases whatever
/// native handle backs it.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Upload body handed to a backend. May borrow from the request.
pub type ContentStream<'a> = BoxStream<'a, Result<Bytes>>;

/// Re-slice a stream so that no chunk exceeds `max_chunk` bytes.
pub fn bounded_chunks(content: ByteStream, max_chunk: usize) -> ByteStream {
    let max_chunk = max_chunk.max(1);
    content
        .map_ok(move |chunk| {
            stream::iter(split(chunk, max_chunk).into_iter().map(Ok::<_, StorageError>))
        })
        .try_flatten()
        .boxed()
}

fn split(mut chunk: Bytes, max_chunk: usize) -> Vec<Bytes> {
    let mut pieces = Vec::with_capacity(chunk.len() / max_chunk + 1);
    while chunk.len() > max_chunk {
        pieces.push(chunk.split_to(max_chunk));
    }
    if !chunk.is_empty() {
        pieces.push(chunk);
    }
    pieces
}

pub fn content_from(data: impl Into<Bytes>) -> ContentStream<'static> {
    stream::once(futures::future::ready(Ok(data.into()))).boxed()
}

pub async fn collect_bytes(mut content: ContentStream<'_>) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = content.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chunks_never_exceed_buffer() {
        let data = vec![7u8; 20_000];
        let chunks: Vec<Bytes> = bounded_chunks(content_from(data.clone()), DEFAULT_BUFFER_SIZE)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() <= DEFAULT_BUFFER_SIZE));
        assert_eq!(chunks.concat(), data);
    }

    #[tokio::test]
    async fn errors_pass_through() {
        let failing: ByteStream = stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(StorageError::unavailable("connection reset")),
        ])
        .boxed();
        let mut chunked = bounded_chunks(failing, 2);
        assert_eq!(chunked.next().await.unwrap().unwrap(), Bytes::from_static(b"ab"));
        assert_eq!(chunked.next().await.unwrap().unwrap(), Bytes::from_static(b"c"));
        assert!(chunked.next().await.unwrap().is_err());
    }

    #[tokio::test]
    async fn empty_chunks_are_dropped() {
        let content: ByteStream =
            stream::iter(vec![Ok(Bytes::new()), Ok(Bytes::from_static(b"x"))]).boxed();
        let chunks: Vec<Bytes> = bounded_chunks(content, 4).try_collect().await.unwrap();
        assert_eq!(chunks, vec![Bytes::from_static(b"x")]);
    }
}
