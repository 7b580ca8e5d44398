//! Translation with single-level fallback to the text-generation translator

use crate::config::ProviderName;
use crate::error::GatewayError;
use crate::providers::{TranslationRequest, Usage};
use crate::registry::ServiceRegistry;
use crate::validate::{JsonBody, ValidationError};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct TranslateRequest {
    pub text: String,
    pub target_language: String,
    pub provider: ProviderName,
    pub source_language: Option<String>,
}

impl TranslateRequest {
    pub fn from_json(body: Value) -> Result<Self, ValidationError> {
        let body = JsonBody::parse(body)?;
        body.require(&[("text", "Text"), ("targetLanguage", "Target language")])?;
        let text = body.string("text", "Text")?;
        let target_language = body.string("targetLanguage", "Target language")?;
        let provider = body
            .optional_choice("provider", "Provider", &["openai", "deepl"])?
            .and_then(|p| ProviderName::parse(&p))
            .unwrap_or(ProviderName::OpenAI);
        let source_language = body.optional_string("sourceLanguage", "Source language")?;
        Ok(Self {
            text,
            target_language,
            provider,
            source_language,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub translated_text: String,
    /// Provider that actually served the request
    pub provider: ProviderName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_source_language: Option<String>,
    pub usage: Usage,
}

pub async fn translate(registry: &ServiceRegistry, request: TranslateRequest) -> Result<TranslateResponse, GatewayError> {
    let translation = TranslationRequest {
        text: request.text,
        target_language: request.target_language,
        source_language: request.source_language,
    };

    let attempt = match registry.translator(Some(request.provider)) {
        Ok(translator) => translator.translate(&translation).await.map_err(GatewayError::from),
        Err(e) => Err(e.into()),
    };

    let result = match attempt {
        Ok(result) => result,
        Err(error) => {
            let Some(fallback) = registry.fallback_translator(request.provider) else {
                return Err(error);
            };
            if registry.is_enabled(request.provider.as_str()) {
                tracing::warn!(
                    failed = %request.provider,
                    fallback = %fallback.provider(),
                    error = %error,
                    "Translation failed, falling back"
                );
            } else {
                tracing::info!(
                    requested = %request.provider,
                    fallback = %fallback.provider(),
                    "Translation provider not configured, falling back"
                );
            }
            fallback.translate(&translation).await?
        }
    };

    Ok(TranslateResponse {
        translated_text: result.payload.text,
        provider: result.provider,
        detected_source_language: result.payload.detected_source_language,
        usage: result.usage,
    })
}
