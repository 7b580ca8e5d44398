//! Shared outbound HTTP plumbing for provider adapters

use super::ProviderError;
use crate::config::ProviderName;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Longest slice of a raw provider body kept in an error message
const MAX_BODY_IN_ERROR: usize = 500;

/// Build a client bounded by the service's configured timeout
pub(crate) fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// Classify a transport-level failure. Timeouts are upstream failures.
pub(crate) fn transport_error(provider: ProviderName, e: &reqwest::Error) -> ProviderError {
    let err = if e.is_timeout() {
        ProviderError::upstream(format!("Request timeout: {e}"))
    } else if e.is_connect() {
        ProviderError::upstream(format!("Connection failed: {e}"))
    } else {
        ProviderError::upstream(format!("Request failed: {e}"))
    };
    err.from_provider(provider)
}

/// Map a non-success HTTP status onto the provider taxonomy
pub(crate) fn classify_status(status: StatusCode, message: &str) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::authentication(format!("Authentication failed: {message}")),
        // 456 is DeepL's "quota exceeded"
        429 | 456 => ProviderError::rate_limit(format!("Rate limit exceeded: {message}")),
        400 | 413 | 415 | 422 => {
            ProviderError::unsupported_input(format!("Invalid request: {message}"))
        }
        500..=599 => ProviderError::upstream(format!("Server error: {message}")),
        _ => ProviderError::upstream(format!("HTTP {status}: {message}")),
    }
}

/// Pull a human-readable message out of the error body shapes providers use:
/// `{"error": {"message": ..}}`, `{"error": ".."}` and `{"message": ..}`.
pub(crate) fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.get("error"))
            .or_else(|| v.get("message"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
    });
    message.unwrap_or_else(|| truncate(body))
}

fn truncate(body: &str) -> String {
    if body.chars().count() > MAX_BODY_IN_ERROR {
        let head: String = body.chars().take(MAX_BODY_IN_ERROR).collect();
        format!("{head}...")
    } else {
        body.to_string()
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
        .map(Duration::from_secs)
}

/// Read a provider response: classify failures, then decode the JSON body
pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: ProviderName,
    response: Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    let retry = retry_after(&response);
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(provider, &e))?;

    if !status.is_success() {
        let mut err = classify_status(status, &error_message(&body));
        if let Some(duration) = retry {
            err = err.with_retry_after(duration);
        }
        return Err(err.from_provider(provider));
    }

    decode(provider, &body)
}

/// Decode a success body, treating malformed JSON as an upstream failure
pub(crate) fn decode<T: DeserializeOwned>(provider: ProviderName, body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| {
        ProviderError::upstream(format!(
            "Failed to parse response: {e} - body: {}",
            truncate(body)
        ))
        .from_provider(provider)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderErrorKind;

    #[test]
    fn test_classify_status() {
        let kind = |code: u16| classify_status(StatusCode::from_u16(code).unwrap(), "x").kind;
        assert_eq!(kind(401), ProviderErrorKind::Authentication);
        assert_eq!(kind(403), ProviderErrorKind::Authentication);
        assert_eq!(kind(429), ProviderErrorKind::RateLimit);
        assert_eq!(kind(456), ProviderErrorKind::RateLimit);
        assert_eq!(kind(400), ProviderErrorKind::UnsupportedInput);
        assert_eq!(kind(415), ProviderErrorKind::UnsupportedInput);
        assert_eq!(kind(500), ProviderErrorKind::Upstream);
        assert_eq!(kind(503), ProviderErrorKind::Upstream);
        assert_eq!(kind(404), ProviderErrorKind::Upstream);
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(r#"{"error": {"message": "Incorrect API key", "type": "invalid_request_error"}}"#),
            "Incorrect API key"
        );
        assert_eq!(error_message(r#"{"error": "model not found"}"#), "model not found");
        assert_eq!(error_message(r#"{"message": "Quota exceeded"}"#), "Quota exceeded");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_error_message_truncates_raw_bodies() {
        let body = "x".repeat(2_000);
        let message = error_message(&body);
        assert_eq!(message.chars().count(), MAX_BODY_IN_ERROR + 3);
    }

    #[test]
    fn test_decode_failure_is_upstream() {
        let err = decode::<serde_json::Value>(ProviderName::OpenAI, "<html>").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Upstream);
        assert_eq!(err.provider, Some(ProviderName::OpenAI));
    }
}
