use archstor_core::StorageError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, error};

/// Wire form of a [`StorageError`]: `{message, error_name}` with the
/// taxonomy's status code.
#[derive(Debug)]
pub struct ApiError(pub StorageError);

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    error_name: &'static str,
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match &self.0 {
            StorageError::BackendUnavailable(_) => error!(error = %self.0, "backend failure"),
            _ => debug!(status = %status, error = %self.0, "request rejected"),
        }
        let body = ErrorBody {
            message: self.0.to_string(),
            error_name: self.0.error_name(),
        };
        (status, Json(body)).into_response()
    }
}
