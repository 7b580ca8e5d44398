//! Error normalization: failure taxonomy to HTTP status and client body

use crate::providers::{ProviderError, ProviderErrorKind};
use crate::registry::NoServiceError;
use crate::validate::ValidationError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Any failure an operation can end in
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    NoService(#[from] NoServiceError),
}

impl GatewayError {
    /// Attach the operation that failed, for logging and the client message
    pub fn during(self, operation: Operation) -> OperationError {
        OperationError {
            operation,
            error: self,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Summarize,
    Keywords,
    CaptionImage,
    AnalyzeImage,
    Moderate,
    Translate,
    Transcribe,
    Tweet,
    GenerateCode,
    AskPdf,
    Sentiment,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::Keywords => "keywords",
            Self::CaptionImage => "caption-image",
            Self::AnalyzeImage => "analyze-image",
            Self::Moderate => "moderate",
            Self::Translate => "translate",
            Self::Transcribe => "transcribe",
            Self::Tweet => "tweet",
            Self::GenerateCode => "generate-code",
            Self::AskPdf => "ask-pdf",
            Self::Sentiment => "sentiment",
        }
    }

    /// Generic client-facing description of a failed call
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::Summarize => "Failed to summarize text",
            Self::Keywords => "Failed to extract keywords from text",
            Self::CaptionImage => "Failed to generate image caption",
            Self::AnalyzeImage => "An unexpected error occurred while analyzing the image",
            Self::Moderate => "Failed to moderate content",
            Self::Translate => "Failed to translate text",
            Self::Transcribe => "Failed to transcribe audio file",
            Self::Tweet => "Failed to generate tweet",
            Self::GenerateCode => "Failed to generate code",
            Self::AskPdf => "Failed to process PDF question",
            Self::Sentiment => "Failed to analyze sentiment",
        }
    }

    /// Transcription reports errors as `{status, message}`
    fn uses_status_body(self) -> bool {
        matches!(self, Self::Transcribe)
    }
}

/// What the client is told about a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<String>,
    pub retry_after_secs: Option<u64>,
}

impl ClientError {
    fn new(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details,
            retry_after_secs: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: &'static str,
    message: String,
}

#[derive(Debug, Error)]
#[error("{} failed: {error}", operation.as_str())]
pub struct OperationError {
    pub operation: Operation,
    pub error: GatewayError,
}

impl OperationError {
    /// Map the failure onto status and a safe message. Provider detail never
    /// appears here; only validation messages written by this crate do.
    pub fn client_error(&self) -> ClientError {
        let generic = || Some(self.operation.failure_message().to_string());
        match &self.error {
            GatewayError::Validation(e) => ClientError::new(StatusCode::BAD_REQUEST, &e.message, e.details.clone()),
            GatewayError::NoService(e) => {
                ClientError::new(StatusCode::INTERNAL_SERVER_ERROR, "Service unavailable", Some(e.message.clone()))
            }
            GatewayError::Provider(e) => match e.kind {
                ProviderErrorKind::UnsupportedInput => {
                    ClientError::new(StatusCode::BAD_REQUEST, "Unsupported input", generic())
                }
                ProviderErrorKind::RateLimit => ClientError {
                    retry_after_secs: e.retry_after.map(|d| d.as_secs()),
                    ..ClientError::new(
                        StatusCode::TOO_MANY_REQUESTS,
                        "API rate limit exceeded",
                        Some("The AI provider is rate limiting requests. Try again later.".to_string()),
                    )
                },
                ProviderErrorKind::Authentication | ProviderErrorKind::Upstream => {
                    ClientError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", generic())
                }
            },
        }
    }

    fn log(&self) {
        let operation = self.operation.as_str();
        match &self.error {
            GatewayError::Validation(e) => {
                tracing::debug!(operation, field = %e.field, constraint = ?e.constraint, "Request rejected");
            }
            GatewayError::NoService(e) => {
                tracing::error!(operation, capability = %e.capability, error = %e, "No service available");
            }
            GatewayError::Provider(e) => {
                tracing::error!(
                    operation,
                    provider = ?e.provider,
                    kind = ?e.kind,
                    error = %e.message,
                    "Operation failed"
                );
            }
        }
    }
}

impl IntoResponse for OperationError {
    fn into_response(self) -> Response {
        self.log();
        let client = self.client_error();

        let mut response = if self.operation.uses_status_body() {
            let message = match &client.details {
                Some(details) => format!("{}. {details}", client.error),
                None => client.error.clone(),
            };
            (
                client.status,
                Json(StatusBody {
                    status: "error",
                    message,
                }),
            )
                .into_response()
        } else {
            (
                client.status,
                Json(ErrorBody {
                    error: client.error,
                    details: client.details,
                }),
            )
                .into_response()
        };

        if let Some(secs) = client.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
