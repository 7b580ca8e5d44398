//! Google Gemini vision provider

use super::http::{build_client, read_json, transport_error};
use super::{ImageInput, ProviderError, ProviderResult, TokenUsage, VisionAnalyzer, VisionRequest};
use crate::config::{ProviderName, Secret, ServiceConfig};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub struct GeminiClient {
    client: Client,
    api_key: Option<Secret>,
    url: String,
}

impl GeminiClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(config.timeout())?,
            api_key: config.credentials().cloned(),
            url: format!(
                "{}/models/{}:generateContent",
                config.endpoint(),
                config.vision_model()
            ),
        })
    }
}

/// Gemini only takes inline image bytes; remote URLs are refused up front
fn vision_body(request: &VisionRequest) -> Result<GeminiRequest, ProviderError> {
    let ImageInput::Inline { bytes, mime_type } = &request.image else {
        return Err(ProviderError::unsupported_input(
            "Gemini accepts inline image data only, not image URLs",
        )
        .from_provider(ProviderName::Gemini));
    };
    Ok(GeminiRequest {
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![
                GeminiPart::Text {
                    text: request.prompt.clone(),
                },
                GeminiPart::InlineData {
                    inline_data: InlineData {
                        mime_type: mime_type.clone(),
                        data: base64::engine::general_purpose::STANDARD.encode(bytes),
                    },
                },
            ],
        }],
        generation_config: Some(GeminiGenerationConfig {
            max_output_tokens: Some(request.max_tokens),
            temperature: request.temperature,
        }),
    })
}

fn normalize_response(resp: GeminiResponse, prompt: &str) -> Result<ProviderResult<String>, ProviderError> {
    let Some(candidate) = resp.candidates.into_iter().next() else {
        let reason = resp
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(
            ProviderError::upstream(format!("Empty Gemini response: {reason}")).from_provider(ProviderName::Gemini)
        );
    };

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| match part {
            GeminiPart::Text { text } => Some(text),
            GeminiPart::InlineData { .. } => None,
        })
        .collect::<Vec<_>>()
        .join("");

    let usage = match resp.usage_metadata {
        Some(u) => TokenUsage::reported_or_estimated(
            u.prompt_token_count,
            u.candidates_token_count,
            u.total_token_count,
            prompt,
            &text,
        ),
        None => TokenUsage::estimate(prompt, &text),
    };

    Ok(ProviderResult {
        payload: text.trim().to_string(),
        usage,
        provider: ProviderName::Gemini,
    })
}

#[async_trait]
impl VisionAnalyzer for GeminiClient {
    fn provider(&self) -> ProviderName {
        ProviderName::Gemini
    }

    async fn describe(&self, request: &VisionRequest) -> Result<ProviderResult<String>, ProviderError> {
        let key = self.api_key.as_ref().ok_or_else(|| {
            ProviderError::authentication("Gemini API key not configured").from_provider(ProviderName::Gemini)
        })?;
        let body = vision_body(request)?;

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(ProviderName::Gemini, &e))?;
        let response: GeminiResponse = read_json(ProviderName::Gemini, response).await?;
        normalize_response(response, &request.prompt)
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_field_names)]
struct GeminiUsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
    total_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}
