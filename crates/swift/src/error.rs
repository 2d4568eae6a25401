use archstor_core::StorageError;
use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SwiftError>;

#[derive(Debug, Error)]
pub enum SwiftError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned {status}")]
    Status {
        method: reqwest::Method,
        url: String,
        status: StatusCode,
    },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("malformed listing from {url}: {source}")]
    Listing {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl From<SwiftError> for StorageError {
    fn from(err: SwiftError) -> Self {
        StorageError::BackendUnavailable(err.to_string())
    }
}
