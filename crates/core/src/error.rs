use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Every failure a backend can report. Each variant maps to exactly one
/// HTTP status and wire name.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("insecure identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("object already exists: {0}")]
    ObjectAlreadyExists(String),

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("{0}")]
    FunctionalityOmitted(String),

    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("{0}")]
    MalformedRequest(String),
}

impl StorageError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::BackendUnavailable(err.to_string())
    }

    pub fn listing_omitted() -> Self {
        Self::FunctionalityOmitted(
            "This functionality is not available while using this storage backend".to_string(),
        )
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidIdentifier(_)
            | Self::ObjectAlreadyExists(_)
            | Self::MalformedRequest(_) => 400,
            Self::ObjectNotFound(_) => 404,
            Self::FunctionalityOmitted(_) => 501,
            Self::BackendUnavailable(_) => 500,
        }
    }

    pub fn error_name(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) | Self::MalformedRequest(_) => "UserError",
            Self::ObjectAlreadyExists(_) => "ObjectAlreadyExistsError",
            Self::ObjectNotFound(_) => "ObjectNotFoundError",
            Self::FunctionalityOmitted(_) => "FunctionalityOmittedError",
            Self::BackendUnavailable(_) => "ServerError",
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::unavailable(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_statuses() {
        assert_eq!(StorageError::InvalidIdentifier("..".into()).status_code(), 400);
        assert_eq!(StorageError::ObjectAlreadyExists("a".into()).status_code(), 400);
        assert_eq!(StorageError::ObjectNotFound("a".into()).status_code(), 404);
        assert_eq!(StorageError::listing_omitted().status_code(), 501);
        assert_eq!(StorageError::unavailable("down").status_code(), 500);
        assert_eq!(StorageError::MalformedRequest("x".into()).status_code(), 400);
    }

    #[test]
    fn io_errors_are_backend_failures() {
        let err: StorageError = std::io::Error::other("disk gone").into();
        assert!(matches!(err, StorageError::BackendUnavailable(_)));
        assert_eq!(err.error_name(), "ServerError");
    }
}
