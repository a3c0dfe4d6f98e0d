use crate::api::AppState;
use crate::state::StateRecord;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Query parameters for state listing
#[derive(Deserialize)]
pub struct StatesQueryParams {
    /// Filter by entity ID prefix (e.g., ?prefix=person.)
    pub prefix: Option<String>,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create snapshot query router
pub fn create_states_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/states", get(list_states))
        .route("/api/states/:entity_id", get(get_entity_states))
        .with_state(state)
}

/// GET /api/states - Snapshot of every stored record
///
/// In ring mode an entity appears once per retained record. Output is sorted
/// by entity id, then by `last_updated`.
async fn list_states(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatesQueryParams>,
) -> Json<Vec<StateRecord>> {
    let mut records: Vec<StateRecord> = state
        .store
        .list()
        .into_iter()
        .filter(|record| match params.prefix {
            Some(ref prefix) => record.entity_id.starts_with(prefix),
            None => true,
        })
        .collect();

    sort_records(&mut records);
    Json(records)
}

/// GET /api/states/:entity_id - Stored records for one entity
async fn get_entity_states(
    State(state): State<Arc<AppState>>,
    Path(entity_id): Path<String>,
) -> Result<Json<Vec<StateRecord>>, QueryError> {
    let mut records: Vec<StateRecord> = state
        .store
        .list()
        .into_iter()
        .filter(|record| record.entity_id == entity_id)
        .collect();

    if records.is_empty() {
        return Err(QueryError::NotFound);
    }

    sort_records(&mut records);
    Ok(Json(records))
}

fn sort_records(records: &mut [StateRecord]) {
    records.sort_by(|a, b| {
        a.entity_id
            .cmp(&b.entity_id)
            .then(a.last_updated.cmp(&b.last_updated))
    });
}

/// Query error types
#[derive(Debug)]
enum QueryError {
    NotFound,
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            QueryError::NotFound => (StatusCode::NOT_FOUND, "Entity not found"),
        };

        let body = Json(ErrorResponse {
            error: error_message.to_string(),
        });

        (status, body).into_response()
    }
}
