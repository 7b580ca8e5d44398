//! Provider error taxonomy

use crate::config::ProviderName;
use std::time::Duration;
use thiserror::Error;

/// Failure record for one provider call.
///
/// Carries full provider detail for server-side logs. Clients only ever see
/// the generic message chosen by the error normalizer.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub provider: Option<ProviderName>,
    pub retry_after: Option<Duration>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider: None,
            retry_after: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Authentication, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimit, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Upstream, message)
    }

    pub fn unsupported_input(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::UnsupportedInput, message)
    }

    pub fn with_retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    /// Attribute the failure to a provider unless it already is
    pub fn from_provider(mut self, provider: ProviderName) -> Self {
        self.provider.get_or_insert(provider);
        self
    }

    pub fn is_retriable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Error classification shared by every provider adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Missing or rejected credential - not retryable
    Authentication,
    /// Quota or throttling signalled by the provider - retryable
    RateLimit,
    /// Provider-side failure, timeout, or unparseable response - retryable
    Upstream,
    /// Provider rejected the payload shape - not retryable
    UnsupportedInput,
}

impl ProviderErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimit | Self::Upstream)
    }
}
