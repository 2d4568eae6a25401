use archstor_core::cursor::clamp_limit;
use archstor_core::{Cursor, StorageError};
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::Link;
use crate::{ApiError, AppState};

const DEFAULT_LIMIT: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub cursor: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub limit: usize,
    pub cursor: String,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub objects: Vec<Link>,
    pub pagination: Pagination,
    #[serde(rename = "_self")]
    pub self_link: Link,
}

fn parse_limit(raw: Option<&str>) -> Result<usize, StorageError> {
    match raw {
        None => Ok(DEFAULT_LIMIT),
        Some(raw) => raw.trim().parse().map_err(|_| {
            StorageError::MalformedRequest(format!("limit {raw:?} is not a non-negative integer"))
        }),
    }
}

async fn list_objects(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError> {
    let cursor = params.cursor.map(Cursor::new).unwrap_or_default();
    let limit = clamp_limit(parse_limit(params.limit.as_deref())?, state.settings.max_limit);

    let page = state.backend.list_ids(&cursor, limit).await?;

    Ok(Json(ListResponse {
        objects: page.ids.into_iter().map(Link::object).collect(),
        pagination: Pagination {
            limit,
            cursor: cursor.to_string(),
            next_cursor: page.next_cursor.map(|c| c.to_string()),
        },
        self_link: Link::root(),
    }))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_objects))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_parses() {
        assert_eq!(parse_limit(None).unwrap(), 1000);
        assert_eq!(parse_limit(Some("200")).unwrap(), 200);
        assert!(parse_limit(Some("-1")).is_err());
        assert!(parse_limit(Some("many")).is_err());
    }
}
