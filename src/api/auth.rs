//! Bearer-token auth and CORS policy

use super::types::ErrorResponse;
use super::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Routes reachable without a token
const PUBLIC_PATHS: &[&str] = &["/", "/api/hello"];

const DEFAULT_ORIGINS: &[&str] = &[
    "http://localhost*",
    "http://127.0.0.1*",
    "https://localhost*",
    "https://127.0.0.1*",
];

/// Reject requests without the configured bearer token
pub async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.access_token.as_deref() else {
        return next.run(request).await;
    };
    if request.method() == Method::OPTIONS || PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if token_matches(token.trim(), expected) => next.run(request).await,
        Some(_) => unauthorized("Invalid access token"),
        None => unauthorized("Unauthorized"),
    }
}

/// Comparison time does not depend on where the tokens first differ
fn token_matches(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

fn unauthorized(message: &str) -> Response {
    tracing::debug!(reason = message, "Rejected unauthenticated request");
    (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new(message))).into_response()
}

#[derive(Debug)]
enum OriginPattern {
    Exact(String),
    Wildcard(Regex),
    Any,
}

impl OriginPattern {
    fn parse(item: &str) -> Option<Self> {
        if item == "*" {
            return Some(Self::Any);
        }
        if !item.contains('*') {
            return Some(Self::Exact(item.to_string()));
        }
        let pattern = format!("^{}$", regex::escape(item).replace(r"\*", ".*"));
        match Regex::new(&pattern) {
            Ok(re) => Some(Self::Wildcard(re)),
            Err(e) => {
                tracing::warn!(origin = item, error = %e, "Ignoring unusable CORS origin pattern");
                None
            }
        }
    }

    fn matches(&self, origin: &str) -> bool {
        match self {
            Self::Exact(value) => value == origin,
            Self::Wildcard(re) => re.is_match(origin),
            Self::Any => true,
        }
    }
}

fn parse_origins(raw: Option<&str>) -> Vec<OriginPattern> {
    let items: Vec<&str> = match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(list) => list.split(',').map(str::trim).filter(|s| !s.is_empty()).collect(),
        None => DEFAULT_ORIGINS.to_vec(),
    };
    items.into_iter().filter_map(OriginPattern::parse).collect()
}

/// CORS layer for the configured origins.
///
/// `*` echoes the caller's origin so credentials stay allowed.
pub fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let patterns = parse_origins(origins);
    let allow_origin = if patterns.iter().any(|p| matches!(p, OriginPattern::Any)) {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .is_ok_and(|origin| patterns.iter().any(|p| p.matches(origin)))
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ])
        .expose_headers([header::CONTENT_LENGTH, HeaderName::from_static("x-request-id")])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_comparison() {
        assert!(token_matches("s3cret-token", "s3cret-token"));
        assert!(!token_matches("s3cret-tokex", "s3cret-token"));
        assert!(!token_matches("s3cret", "s3cret-token"));
        assert!(!token_matches("", "s3cret-token"));
    }

    #[test]
    fn test_default_origins_allow_localhost_ports() {
        let patterns = parse_origins(None);
        let allowed = |origin: &str| patterns.iter().any(|p| p.matches(origin));
        assert!(allowed("http://localhost:5173"));
        assert!(allowed("https://127.0.0.1:8443"));
        assert!(!allowed("https://example.com"));
    }

    #[test]
    fn test_configured_origins() {
        let patterns = parse_origins(Some("https://app.example.com, https://*.preview.example.com"));
        let allowed = |origin: &str| patterns.iter().any(|p| p.matches(origin));
        assert!(allowed("https://app.example.com"));
        assert!(allowed("https://pr-12.preview.example.com"));
        assert!(!allowed("https://app.example.com.evil.io"));
        assert!(!allowed("http://localhost:3000"));
    }

    #[test]
    fn test_wildcard_dots_are_literal() {
        let patterns = parse_origins(Some("https://*.example.com"));
        assert!(!patterns[0].matches("https://aexampleXcom"));
    }

    #[test]
    fn test_star_allows_everything() {
        let patterns = parse_origins(Some("*"));
        assert!(matches!(patterns[0], OriginPattern::Any));
    }
}
