//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints of blogkit:
//! - Blog endpoints
//! - Entry endpoints
//! - Tag endpoints
//! - User lookup

pub mod blogs;
pub mod common;
pub mod entries;
pub mod middleware;
pub mod tags;
pub mod users;


use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState};

/// Build the `/api` router
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .nest("/blogs", blogs::router())
        .nest("/entries", entries::router())
        .nest("/tags", tags::router())
        .nest("/users", users::router())
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let origin = match cors_origin.parse::<HeaderValue>() {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            tracing::warn!("Invalid CORS origin '{}', allowing none", cors_origin);
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([
            header::LINK,
            header::LOCATION,
            common::X_TOTAL_COUNT,
            common::X_ALERT,
            common::X_PARAMS,
        ]);

    Router::new()
        .nest("/api", build_api_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
