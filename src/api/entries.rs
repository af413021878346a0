//! Entry API endpoints
//!
//! - POST   /api/entries - Create an entry
//! - PUT    /api/entries - Replace an entry and its tags
//! - GET    /api/entries - One page of entries matching the criteria
//! - GET    /api/entries/count - Count entries matching the criteria
//! - GET    /api/entries/{id} - Get an entry with its tags
//! - DELETE /api/entries/{id} - Delete an entry

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};

use crate::api::common::{
    alert_headers, created_headers, pagination_headers, parse_id, parse_list, Alert,
};
use crate::api::middleware::{ApiError, AppState};
use crate::criteria::ENTRY_SCHEMA;
use crate::models::EntryInput;
use crate::services::EntryDto;

const BASE: &str = "/api/entries";
const ENTITY: &str = "entry";

/// Build the entries router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_entries).post(create_entry).put(update_entry))
        .route("/count", get(count_entries))
        .route("/{id}", get(get_entry).delete(delete_entry))
}

/// POST /api/entries
async fn create_entry(
    State(state): State<AppState>,
    body: Result<Json<EntryInput>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<EntryDto>), ApiError> {
    let Json(input) = body?;
    let created = state.entry_service.create(input).await?;
    let headers = created_headers(BASE, ENTITY, created.id);
    Ok((StatusCode::CREATED, headers, Json(created)))
}

/// PUT /api/entries
async fn update_entry(
    State(state): State<AppState>,
    body: Result<Json<EntryInput>, JsonRejection>,
) -> Result<(HeaderMap, Json<EntryDto>), ApiError> {
    let Json(input) = body?;
    let updated = state.entry_service.update(input).await?;
    let headers = alert_headers(ENTITY, Alert::Updated, &updated.id.to_string());
    Ok((headers, Json(updated)))
}

/// GET /api/entries
///
/// Paged: the body holds one page, `X-Total-Count` the number of matches
/// and `Link` the neighbouring pages.
async fn list_entries(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<(HeaderMap, Json<Vec<EntryDto>>), ApiError> {
    let query = parse_list(&ENTRY_SCHEMA, &pairs, &state.pagination)?;
    let page = state
        .entry_query
        .find_page_by_criteria(&query.criteria, &query.page)
        .await?;

    let headers = pagination_headers(BASE, &pairs, &page);
    Ok((headers, Json(page.items)))
}

/// GET /api/entries/count
async fn count_entries(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<i64>, ApiError> {
    let query = parse_list(&ENTRY_SCHEMA, &pairs, &state.pagination)?;
    Ok(Json(state.entry_query.count_by_criteria(&query.criteria).await?))
}

/// GET /api/entries/{id}
async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EntryDto>, ApiError> {
    let id = parse_id(&id)?;
    state
        .entry_service
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Entry with ID {} not found", id)))
}

/// DELETE /api/entries/{id}
async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<HeaderMap, ApiError> {
    let id = parse_id(&id)?;
    state.entry_service.delete(id).await?;
    Ok(alert_headers(ENTITY, Alert::Deleted, &id.to_string()))
}
