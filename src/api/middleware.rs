//! API middleware
//!
//! Contains the shared application state and the JSON error type every
//! handler returns, together with its mapping from service errors.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::CacheManager;
use crate::config::PaginationConfig;
use crate::criteria::CriteriaError;
use crate::db::repositories::{
    SqlxBlogRepository, SqlxEntryRepository, SqlxTagRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    BlogQueryService, BlogService, EntityServiceError, EntryQueryService, EntryService,
    QueryServiceError, TagQueryService, TagService, UserService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pagination: PaginationConfig,
    pub cache: Arc<CacheManager>,
    pub user_service: Arc<UserService>,
    pub blog_service: Arc<BlogService>,
    pub blog_query: Arc<BlogQueryService>,
    pub entry_service: Arc<EntryService>,
    pub entry_query: Arc<EntryQueryService>,
    pub tag_service: Arc<TagService>,
    pub tag_query: Arc<TagQueryService>,
}

impl AppState {
    /// Wire repositories and services over one pool and one set of cache
    /// regions
    pub fn new(pool: DynDatabasePool, cache: Arc<CacheManager>, pagination: PaginationConfig) -> Self {
        let blog_repo = Arc::new(SqlxBlogRepository::new(pool.clone()));
        let entry_repo = Arc::new(SqlxEntryRepository::new(pool.clone()));
        let tag_repo = Arc::new(SqlxTagRepository::new(pool.clone()));

        let user_service = Arc::new(UserService::new(
            SqlxUserRepository::boxed(pool),
            cache.clone(),
        ));
        let blog_service = Arc::new(BlogService::new(
            blog_repo.clone(),
            user_service.clone(),
            cache.clone(),
        ));
        let tag_service = Arc::new(TagService::new(tag_repo.clone(), cache.clone()));
        let entry_service = Arc::new(EntryService::new(
            entry_repo.clone(),
            blog_service.clone(),
            tag_service.clone(),
            cache.clone(),
        ));

        Self {
            pagination,
            cache,
            user_service,
            blog_service,
            blog_query: Arc::new(BlogQueryService::for_blogs(blog_repo)),
            entry_service,
            entry_query: Arc::new(EntryQueryService::for_entries(entry_repo)),
            tag_service,
            tag_query: Arc::new(TagQueryService::for_tags(tag_repo)),
        }
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<EntityServiceError> for ApiError {
    fn from(err: EntityServiceError) -> Self {
        match err {
            EntityServiceError::NotFound(message) => ApiError::not_found(message),
            EntityServiceError::ValidationError(message) => ApiError::validation_error(message),
            EntityServiceError::InternalError(e) => {
                tracing::error!("Request failed: {:#}", e);
                ApiError::internal_error(format!("{:#}", e))
            }
        }
    }
}

impl From<QueryServiceError> for ApiError {
    fn from(err: QueryServiceError) -> Self {
        match err {
            QueryServiceError::WrongEntity { .. } => ApiError::validation_error(err.to_string()),
            QueryServiceError::InternalError(e) => {
                tracing::error!("Criteria query failed: {:#}", e);
                ApiError::internal_error(format!("{:#}", e))
            }
        }
    }
}

impl From<CriteriaError> for ApiError {
    fn from(err: CriteriaError) -> Self {
        ApiError::validation_error(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::with_details(
            "VALIDATION_ERROR",
            "Malformed request body",
            serde_json::Value::String(rejection.body_text()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::not_found("x"), StatusCode::NOT_FOUND),
            (ApiError::validation_error("x"), StatusCode::BAD_REQUEST),
            (ApiError::internal_error("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_service_error_mapping() {
        let err: ApiError = EntityServiceError::NotFound("Blog with ID 1 not found".into()).into();
        assert_eq!(err.error.code, "NOT_FOUND");

        let err: ApiError = EntityServiceError::ValidationError("'name' is required".into()).into();
        assert_eq!(err.error.code, "VALIDATION_ERROR");
        assert_eq!(err.error.message, "'name' is required");

        let err: ApiError = EntityServiceError::InternalError(anyhow::anyhow!("db down")).into();
        assert_eq!(err.error.code, "INTERNAL_ERROR");
    }

    #[test]
    fn test_error_body_shape() {
        let json = serde_json::to_value(ApiError::validation_error("bad")).unwrap();
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["message"], "bad");
        assert!(json["error"].get("details").is_none());
    }
}
