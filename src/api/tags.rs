//! Tag API endpoints
//!
//! - POST   /api/tags - Create a tag
//! - PUT    /api/tags - Replace a tag
//! - GET    /api/tags - List tags matching the criteria
//! - GET    /api/tags/count - Count tags matching the criteria
//! - GET    /api/tags/{id} - Get a tag
//! - DELETE /api/tags/{id} - Delete a tag and unlink it from entries

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};

use crate::api::common::{alert_headers, created_headers, parse_id, parse_list, Alert};
use crate::api::middleware::{ApiError, AppState};
use crate::criteria::TAG_SCHEMA;
use crate::models::TagInput;
use crate::services::TagDto;

const BASE: &str = "/api/tags";
const ENTITY: &str = "tag";

/// Build the tags router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags).post(create_tag).put(update_tag))
        .route("/count", get(count_tags))
        .route("/{id}", get(get_tag).delete(delete_tag))
}

/// POST /api/tags
async fn create_tag(
    State(state): State<AppState>,
    body: Result<Json<TagInput>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<TagDto>), ApiError> {
    let Json(input) = body?;
    let created = state.tag_service.create(input).await?;
    let headers = created_headers(BASE, ENTITY, created.id);
    Ok((StatusCode::CREATED, headers, Json(created)))
}

/// PUT /api/tags
async fn update_tag(
    State(state): State<AppState>,
    body: Result<Json<TagInput>, JsonRejection>,
) -> Result<(HeaderMap, Json<TagDto>), ApiError> {
    let Json(input) = body?;
    let updated = state.tag_service.update(input).await?;
    let headers = alert_headers(ENTITY, Alert::Updated, &updated.id.to_string());
    Ok((headers, Json(updated)))
}

/// GET /api/tags
async fn list_tags(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<TagDto>>, ApiError> {
    let query = parse_list(&TAG_SCHEMA, &pairs, &state.pagination)?;
    let tags = state
        .tag_query
        .find_by_criteria(&query.criteria, &query.page.sort)
        .await?;
    Ok(Json(tags))
}

/// GET /api/tags/count
async fn count_tags(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<i64>, ApiError> {
    let query = parse_list(&TAG_SCHEMA, &pairs, &state.pagination)?;
    Ok(Json(state.tag_query.count_by_criteria(&query.criteria).await?))
}

/// GET /api/tags/{id}
async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TagDto>, ApiError> {
    let id = parse_id(&id)?;
    state
        .tag_service
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Tag with ID {} not found", id)))
}

/// DELETE /api/tags/{id}
async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<HeaderMap, ApiError> {
    let id = parse_id(&id)?;
    state.tag_service.delete(id).await?;
    Ok(alert_headers(ENTITY, Alert::Deleted, &id.to_string()))
}
