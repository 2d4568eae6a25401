//! HTTP resources over a [`StorageBackend`]: the collection root, single
//! objects, and the service version.

pub mod error;
pub mod routes;

use std::sync::Arc;

use archstor_core::StorageBackend;
use archstor_core::cursor::DEFAULT_MAX_LIMIT;
use archstor_core::stream::DEFAULT_BUFFER_SIZE;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Request-handling knobs, fixed at startup.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Largest chunk written to a GET response body.
    pub buffer_size: usize,
    /// Ceiling applied to the `limit` listing parameter.
    pub max_limit: usize,
    /// Largest accepted PUT body; `None` accepts any size.
    pub max_upload_bytes: Option<usize>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_limit: DEFAULT_MAX_LIMIT,
            max_upload_bytes: None,
        }
    }
}

/// Shared by every request: one backend handle for the process lifetime.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn StorageBackend>,
    pub settings: Arc<ApiSettings>,
}

impl AppState {
    pub fn new(backend: Arc<dyn StorageBackend>, settings: ApiSettings) -> Self {
        Self {
            backend,
            settings: Arc::new(settings),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = match state.settings.max_upload_bytes {
        Some(max) => DefaultBodyLimit::max(max),
        None => DefaultBodyLimit::disable(),
    };
    Router::new()
        .merge(routes::version::routes())
        .merge(routes::root::routes())
        .merge(routes::object::routes())
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
