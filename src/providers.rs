//! Provider capability clients
//!
//! One trait per capability, one adapter per (capability, provider) pair.
//! Adapters turn a normalized request into a provider call and the raw
//! provider response into a `ProviderResult` with normalized usage, or fail
//! with a classified `ProviderError`.

mod deepl;
mod error;
mod gemini;
mod http;
mod moderation;
mod ollama;
mod openai;
mod translation;
mod usage;
mod vision;

#[cfg(test)]
mod proptests;

pub use deepl::DeepLClient;
pub use error::{ProviderError, ProviderErrorKind};
pub use gemini::GeminiClient;
pub use moderation::{ModerationVerdict, UNSAFE_CATEGORIES};
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;
pub use translation::TextTranslator;
pub use usage::*;
pub use vision::{analyze_image, AnalysisType, DetectedObject, ImageInput, VisionAnalysis};

use crate::config::{Capability, ProviderName};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

/// Normalized outcome of one provider call
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResult<T, U = TokenUsage> {
    pub payload: T,
    pub usage: U,
    /// Provider that actually served the call
    pub provider: ProviderName,
}

impl<T, U> ProviderResult<T, U> {
    pub fn map<V>(self, f: impl FnOnce(T) -> V) -> ProviderResult<V, U> {
        ProviderResult {
            payload: f(self.payload),
            usage: self.usage,
            provider: self.provider,
        }
    }

    pub fn map_usage<V>(self, f: impl FnOnce(U) -> V) -> ProviderResult<T, V> {
        ProviderResult {
            payload: self.payload,
            usage: f(self.usage),
            provider: self.provider,
        }
    }
}

/// Named JSON schema the provider output must conform to
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub name: &'static str,
    pub schema: Value,
}

impl OutputSchema {
    pub fn new(name: &'static str, schema: Value) -> Self {
        Self { name, schema }
    }
}

/// Single-prompt request expecting schema-conforming JSON back
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub prompt: String,
    pub schema: OutputSchema,
    /// Overrides the service's default model
    pub model: Option<String>,
}

/// Free-text generation request
#[derive(Debug, Clone, Default)]
pub struct TextRequest {
    pub instructions: Option<String>,
    pub prompt: String,
    /// Allow the provider to search the web first (ignored where unsupported)
    pub web_search: bool,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub image: ImageInput,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    pub text: String,
    pub target_language: String,
    pub source_language: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub text: String,
    pub detected_source_language: Option<String>,
}

/// Audio upload handed to a transcriber. Owned so it is released with the call.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio: Vec<u8>,
    pub file_name: String,
    pub language: Option<String>,
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    /// Seconds, when the provider reports it
    pub duration: Option<f64>,
    pub language: Option<String>,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn provider(&self) -> ProviderName;

    /// Generate JSON conforming to `request.schema`. The payload is the parsed
    /// JSON document; use [`generate`] for a typed, strictly checked result.
    async fn generate_structured(
        &self,
        request: &StructuredRequest,
    ) -> Result<ProviderResult<Value>, ProviderError>;

    async fn generate_text(&self, request: &TextRequest) -> Result<ProviderResult<String>, ProviderError>;
}

#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    fn provider(&self) -> ProviderName;

    /// Describe an image according to the prompt. Returns the raw model text.
    async fn describe(&self, request: &VisionRequest) -> Result<ProviderResult<String>, ProviderError>;
}

#[async_trait]
pub trait Moderator: Send + Sync {
    fn provider(&self) -> ProviderName;

    async fn moderate(
        &self,
        text: &str,
    ) -> Result<ProviderResult<ModerationVerdict, EstimatedUsage>, ProviderError>;
}

#[async_trait]
pub trait Translator: Send + Sync {
    fn provider(&self) -> ProviderName;

    async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<ProviderResult<Translation, Usage>, ProviderError>;
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    fn provider(&self) -> ProviderName;

    async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<ProviderResult<Transcript>, ProviderError>;
}

/// Run a structured generation and decode it into `T`.
///
/// Output that does not deserialize into `T` is rejected as an upstream
/// failure, never coerced. Result types use `deny_unknown_fields`.
pub async fn generate<T: DeserializeOwned>(
    generator: &dyn TextGenerator,
    request: &StructuredRequest,
) -> Result<ProviderResult<T>, ProviderError> {
    let result = generator.generate_structured(request).await?;
    let provider = result.provider;
    let payload = serde_json::from_value(result.payload).map_err(|e| {
        ProviderError::upstream(format!(
            "Output did not match the `{}` schema: {e}",
            request.schema.name
        ))
        .from_provider(provider)
    })?;
    Ok(ProviderResult {
        payload,
        usage: result.usage,
        provider,
    })
}

/// Logging wrapper for provider clients
pub struct Logged<T: ?Sized> {
    inner: Arc<T>,
}

impl<T: ?Sized> Logged<T> {
    pub fn new(inner: Arc<T>) -> Self {
        Self { inner }
    }
}

fn record<P, U: Debug>(
    provider: ProviderName,
    capability: Capability,
    started: Instant,
    result: &Result<ProviderResult<P, U>, ProviderError>,
) {
    let duration = started.elapsed();
    match result {
        Ok(response) => {
            tracing::info!(
                provider = %provider,
                capability = %capability,
                duration_ms = %duration.as_millis(),
                usage = ?response.usage,
                "Provider call completed"
            );
        }
        Err(e) => {
            tracing::error!(
                provider = %provider,
                capability = %capability,
                duration_ms = %duration.as_millis(),
                kind = ?e.kind,
                error = %e.message,
                retryable = e.is_retriable(),
                "Provider call failed"
            );
        }
    }
}

#[async_trait]
impl TextGenerator for Logged<dyn TextGenerator> {
    fn provider(&self) -> ProviderName {
        self.inner.provider()
    }

    async fn generate_structured(
        &self,
        request: &StructuredRequest,
    ) -> Result<ProviderResult<Value>, ProviderError> {
        let started = Instant::now();
        let result = self.inner.generate_structured(request).await;
        record(self.provider(), Capability::TextGeneration, started, &result);
        result
    }

    async fn generate_text(&self, request: &TextRequest) -> Result<ProviderResult<String>, ProviderError> {
        let started = Instant::now();
        let result = self.inner.generate_text(request).await;
        record(self.provider(), Capability::TextGeneration, started, &result);
        result
    }
}

#[async_trait]
impl VisionAnalyzer for Logged<dyn VisionAnalyzer> {
    fn provider(&self) -> ProviderName {
        self.inner.provider()
    }

    async fn describe(&self, request: &VisionRequest) -> Result<ProviderResult<String>, ProviderError> {
        let started = Instant::now();
        let result = self.inner.describe(request).await;
        record(self.provider(), Capability::Vision, started, &result);
        result
    }
}

#[async_trait]
impl Moderator for Logged<dyn Moderator> {
    fn provider(&self) -> ProviderName {
        self.inner.provider()
    }

    async fn moderate(
        &self,
        text: &str,
    ) -> Result<ProviderResult<ModerationVerdict, EstimatedUsage>, ProviderError> {
        let started = Instant::now();
        let result = self.inner.moderate(text).await;
        record(self.provider(), Capability::Moderation, started, &result);
        result
    }
}

#[async_trait]
impl Translator for Logged<dyn Translator> {
    fn provider(&self) -> ProviderName {
        self.inner.provider()
    }

    async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<ProviderResult<Translation, Usage>, ProviderError> {
        let started = Instant::now();
        let result = self.inner.translate(request).await;
        record(self.provider(), Capability::Translation, started, &result);
        result
    }
}

#[async_trait]
impl Transcriber for Logged<dyn Transcriber> {
    fn provider(&self) -> ProviderName {
        self.inner.provider()
    }

    async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<ProviderResult<Transcript>, ProviderError> {
        let started = Instant::now();
        let result = self.inner.transcribe(request).await;
        record(self.provider(), Capability::Transcription, started, &result);
        result
    }
}
