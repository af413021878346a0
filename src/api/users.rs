//! User API endpoints
//!
//! - GET /api/users/{login} - Get a user by login

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::services::UserDto;

/// Build the users router
pub fn router() -> Router<AppState> {
    Router::new().route("/{login}", get(get_user))
}

/// GET /api/users/{login}
async fn get_user(
    State(state): State<AppState>,
    Path(login): Path<String>,
) -> Result<Json<UserDto>, ApiError> {
    state
        .user_service
        .get_by_login(&login)
        .await?
        .map(|user| Json(UserDto::from(user)))
        .ok_or_else(|| ApiError::not_found(format!("User '{}' not found", login)))
}
