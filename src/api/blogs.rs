//! Blog API endpoints
//!
//! - POST   /api/blogs - Create a blog
//! - PUT    /api/blogs - Replace a blog
//! - GET    /api/blogs - List blogs matching the criteria
//! - GET    /api/blogs/count - Count blogs matching the criteria
//! - GET    /api/blogs/{id} - Get a blog
//! - DELETE /api/blogs/{id} - Delete a blog

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};

use crate::api::common::{alert_headers, created_headers, parse_id, parse_list, Alert};
use crate::api::middleware::{ApiError, AppState};
use crate::criteria::BLOG_SCHEMA;
use crate::models::BlogInput;
use crate::services::BlogDto;

const BASE: &str = "/api/blogs";
const ENTITY: &str = "blog";

/// Build the blogs router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_blogs).post(create_blog).put(update_blog))
        .route("/count", get(count_blogs))
        .route("/{id}", get(get_blog).delete(delete_blog))
}

/// POST /api/blogs
async fn create_blog(
    State(state): State<AppState>,
    body: Result<Json<BlogInput>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<BlogDto>), ApiError> {
    let Json(input) = body?;
    let created = state.blog_service.create(input).await?;
    let headers = created_headers(BASE, ENTITY, created.id);
    Ok((StatusCode::CREATED, headers, Json(created)))
}

/// PUT /api/blogs
async fn update_blog(
    State(state): State<AppState>,
    body: Result<Json<BlogInput>, JsonRejection>,
) -> Result<(HeaderMap, Json<BlogDto>), ApiError> {
    let Json(input) = body?;
    let updated = state.blog_service.update(input).await?;
    let headers = alert_headers(ENTITY, Alert::Updated, &updated.id.to_string());
    Ok((headers, Json(updated)))
}

/// GET /api/blogs
async fn list_blogs(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<BlogDto>>, ApiError> {
    let query = parse_list(&BLOG_SCHEMA, &pairs, &state.pagination)?;
    let blogs = state
        .blog_query
        .find_by_criteria(&query.criteria, &query.page.sort)
        .await?;
    Ok(Json(blogs))
}

/// GET /api/blogs/count
async fn count_blogs(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<i64>, ApiError> {
    let query = parse_list(&BLOG_SCHEMA, &pairs, &state.pagination)?;
    Ok(Json(state.blog_query.count_by_criteria(&query.criteria).await?))
}

/// GET /api/blogs/{id}
async fn get_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BlogDto>, ApiError> {
    let id = parse_id(&id)?;
    state
        .blog_service
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Blog with ID {} not found", id)))
}

/// DELETE /api/blogs/{id}
async fn delete_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<HeaderMap, ApiError> {
    let id = parse_id(&id)?;
    state.blog_service.delete(id).await?;
    Ok(alert_headers(ENTITY, Alert::Deleted, &id.to_string()))
}
