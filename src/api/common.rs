//! Common API utilities and shared types
//!
//! This module contains shared utilities used across the resource
//! endpoints: id parsing, criteria parsing, pagination headers and the
//! notification headers sent on writes.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::api::middleware::ApiError;
use crate::config::PaginationConfig;
use crate::criteria::{parse_query, EntitySchema, ListQuery};
use crate::models::Page;

pub const X_TOTAL_COUNT: HeaderName = HeaderName::from_static("x-total-count");
pub const X_ALERT: HeaderName = HeaderName::from_static("x-blogkit-alert");
pub const X_PARAMS: HeaderName = HeaderName::from_static("x-blogkit-params");

/// Parse an `{id}` path segment
pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::validation_error(format!("Invalid id '{}'", raw)))
}

/// Read criteria, paging and sorting from the query string
pub fn parse_list(
    schema: &'static EntitySchema,
    pairs: &[(String, String)],
    pagination: &PaginationConfig,
) -> Result<ListQuery, ApiError> {
    Ok(parse_query(schema, pairs, pagination)?)
}

// ============================================================================
// Pagination headers
// ============================================================================

/// `X-Total-Count` and `Link` headers for a page of results.
///
/// Link targets keep every query parameter of the request except
/// `page` and `size`.
pub fn pagination_headers<T>(base: &str, pairs: &[(String, String)], page: &Page<T>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(X_TOTAL_COUNT, HeaderValue::from(page.total));

    let kept: String = pairs
        .iter()
        .filter(|(key, _)| key != "page" && key != "size")
        .map(|(key, value)| {
            format!(
                "&{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect();
    let link = |number: u32, rel: &str| {
        format!(
            "<{}?page={}&size={}{}>; rel=\"{}\"",
            base, number, page.size, kept, rel
        )
    };

    let mut links = Vec::new();
    if let Some(next) = page.page.checked_add(1).filter(|_| page.has_next()) {
        links.push(link(next, "next"));
    }
    if let Some(prev) = page.page.checked_sub(1) {
        links.push(link(prev, "prev"));
    }
    links.push(link(page.total_pages().saturating_sub(1), "last"));
    links.push(link(0, "first"));

    if let Ok(value) = HeaderValue::from_str(&links.join(",")) {
        headers.insert(header::LINK, value);
    }
    headers
}

// ============================================================================
// Notification headers
// ============================================================================

/// Write operation reported to the client
#[derive(Debug, Clone, Copy)]
pub enum Alert {
    Created,
    Updated,
    Deleted,
}

impl Alert {
    fn as_str(&self) -> &'static str {
        match self {
            Alert::Created => "created",
            Alert::Updated => "updated",
            Alert::Deleted => "deleted",
        }
    }
}

/// `X-Blogkit-Alert: blogkit.{entity}.{action}` and `X-Blogkit-Params: {param}`
pub fn alert_headers(entity: &str, alert: Alert, param: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!("blogkit.{}.{}", entity, alert.as_str())) {
        headers.insert(X_ALERT, value);
    }
    if let Ok(value) = HeaderValue::from_str(param) {
        headers.insert(X_PARAMS, value);
    }
    headers
}

/// Headers of a `201 Created` answer
pub fn created_headers(base: &str, entity: &str, id: i64) -> HeaderMap {
    let mut headers = alert_headers(entity, Alert::Created, &id.to_string());
    if let Ok(value) = HeaderValue::from_str(&format!("{}/{}", base, id)) {
        headers.insert(header::LOCATION, value);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageRequest;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").unwrap(), 42);
        let err = parse_id("abc").unwrap_err();
        assert_eq!(err.error.code, "VALIDATION_ERROR");
    }

    #[test]
    fn test_pagination_headers_middle_page() {
        let page: Page<i64> = Page::new(vec![1, 2], 10, &PageRequest::new(1, 2));
        let headers = pagination_headers(
            "/api/entries",
            &pairs(&[("page", "1"), ("size", "2"), ("title.contains", "a b")]),
            &page,
        );

        assert_eq!(headers[&X_TOTAL_COUNT], "10");
        let link = headers[header::LINK].to_str().unwrap();
        assert!(link.contains("</api/entries?page=2&size=2&title.contains=a%20b>; rel=\"next\""));
        assert!(link.contains("</api/entries?page=0&size=2&title.contains=a%20b>; rel=\"prev\""));
        assert!(link.contains("page=4&size=2&title.contains=a%20b>; rel=\"last\""));
        assert!(link.ends_with("rel=\"first\""));
    }

    #[test]
    fn test_pagination_headers_empty_result() {
        let page: Page<i64> = Page::new(vec![], 0, &PageRequest::new(0, 20));
        let headers = pagination_headers("/api/entries", &[], &page);

        assert_eq!(headers[&X_TOTAL_COUNT], "0");
        let link = headers[header::LINK].to_str().unwrap();
        assert!(!link.contains("next"));
        assert!(!link.contains("prev"));
        assert!(link.contains("page=0&size=20>; rel=\"last\""));
    }

    #[test]
    fn test_pagination_headers_past_last_page() {
        let page: Page<i64> = Page::new(vec![], 5, &PageRequest::new(u32::MAX, 1));
        let headers = pagination_headers("/api/entries", &[], &page);

        let link = headers[header::LINK].to_str().unwrap();
        assert!(!link.contains("rel=\"next\""));
        assert!(link.contains(&format!("page={}&size=1>; rel=\"prev\"", u32::MAX - 1)));
        assert!(link.contains("page=4&size=1>; rel=\"last\""));
    }

    #[test]
    fn test_created_headers() {
        let headers = created_headers("/api/blogs", "blog", 7);
        assert_eq!(headers[header::LOCATION], "/api/blogs/7");
        assert_eq!(headers[&X_ALERT], "blogkit.blog.created");
        assert_eq!(headers[&X_PARAMS], "7");
    }
}
