use archstor_core::stream::bounded_chunks;
use archstor_core::{ObjectId, StorageError};
use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::{debug, info};

use crate::{ApiError, AppState};

/// Multipart field carrying the object body on PUT.
pub const OBJECT_FIELD: &str = "object";

#[derive(Debug, Serialize)]
pub struct AddedResponse {
    pub identifier: String,
    pub added: bool,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub identifier: String,
    pub deleted: bool,
}

async fn get_object(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = ObjectId::parse(&raw_id)?;
    if !state.backend.exists(&id).await? {
        return Err(StorageError::ObjectNotFound(id.into_inner()).into());
    }
    let content = state.backend.read(&id).await?;
    let body = Body::from_stream(bounded_chunks(content, state.settings.buffer_size));
    Ok(([(CONTENT_TYPE, "application/octet-stream")], body).into_response())
}

async fn put_object(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AddedResponse>, ApiError> {
    let id = ObjectId::parse(&raw_id)?;
    if state.backend.exists(&id).await? {
        return Err(StorageError::ObjectAlreadyExists(id.into_inner()).into());
    }

    let mut multipart = multipart.map_err(|e| StorageError::MalformedRequest(e.body_text()))?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| StorageError::MalformedRequest(e.body_text()))?
    {
        if field.name() != Some(OBJECT_FIELD) {
            continue;
        }
        let content = field
            .map_err(|e| {
                StorageError::MalformedRequest(format!("upload interrupted: {}", e.body_text()))
            })
            .boxed();
        state.backend.write(&id, content).await?;
        info!(%id, backend = state.backend.name(), "object added");
        return Ok(Json(AddedResponse {
            identifier: id.into_inner(),
            added: true,
        }));
    }

    Err(StorageError::MalformedRequest(format!("missing multipart field '{OBJECT_FIELD}'")).into())
}

async fn delete_object(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let id = ObjectId::parse(&raw_id)?;
    if state.backend.exists(&id).await? {
        state.backend.delete(&id).await?;
        info!(%id, backend = state.backend.name(), "object deleted");
    } else {
        debug!(%id, "delete of absent object");
    }
    Ok(Json(DeletedResponse {
        identifier: id.into_inner(),
        deleted: true,
    }))
}

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        get(get_object).put(put_object).delete(delete_object),
    )
}
