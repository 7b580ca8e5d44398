//! `OpenAI` provider: structured/text generation, vision, moderation, transcription

use super::http::{build_client, decode, read_json, transport_error};
use super::{
    EstimatedUsage, ImageInput, ModerationVerdict, Moderator, ProviderError, ProviderResult,
    StructuredRequest, TextGenerator, TextRequest, TokenUsage, Transcriber, Transcript,
    TranscriptionRequest, VisionAnalyzer, VisionRequest,
};
use crate::config::{ProviderName, Secret, ServiceConfig};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const MODERATION_MODEL: &str = "omni-moderation-latest";
const TRANSCRIPTION_MODEL: &str = "whisper-1";

/// `OpenAI` API client shared by every capability it serves
pub struct OpenAIClient {
    client: Client,
    api_key: Option<Secret>,
    base_url: String,
    model: String,
    vision_model: String,
}

impl OpenAIClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(config.timeout())?,
            api_key: config.credentials().cloned(),
            base_url: config.endpoint().to_string(),
            model: config.model().to_string(),
            vision_model: config.vision_model().to_string(),
        })
    }

    fn authorized(&self, path: &str) -> Result<RequestBuilder, ProviderError> {
        let key = self.api_key.as_ref().ok_or_else(|| {
            ProviderError::authentication("OpenAI API key not configured")
                .from_provider(ProviderName::OpenAI)
        })?;
        Ok(self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(key.expose()))
    }

    async fn post_json<B: Serialize + Sync, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ProviderError> {
        let response = self
            .authorized(path)?
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(ProviderName::OpenAI, &e))?;
        read_json(ProviderName::OpenAI, response).await
    }

    fn structured_body(&self, request: &StructuredRequest) -> ResponsesRequest {
        ResponsesRequest {
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            input: vec![InputMessage {
                role: "user",
                content: request.prompt.clone(),
            }],
            instructions: None,
            text: Some(TextConfig {
                format: json_schema_format(&request.schema.schema),
            }),
            tools: None,
            temperature: None,
            max_output_tokens: None,
        }
    }

    fn text_body(&self, request: &TextRequest) -> ResponsesRequest {
        ResponsesRequest {
            model: self.model.clone(),
            input: vec![InputMessage {
                role: "user",
                content: request.prompt.clone(),
            }],
            instructions: request.instructions.clone(),
            text: None,
            tools: request
                .web_search
                .then(|| vec![serde_json::json!({"type": "web_search_preview"})]),
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
        }
    }

    fn vision_body(&self, request: &VisionRequest) -> ChatRequest {
        ChatRequest {
            model: self.vision_model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: request.prompt.clone(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image_url(&request.image),
                        },
                    },
                ],
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

/// `OpenAI` strict JSON-schema output format. The schema is always named
/// "result" on the wire.
fn json_schema_format(schema: &Value) -> Value {
    serde_json::json!({
        "type": "json_schema",
        "name": "result",
        "schema": schema,
        "strict": true,
    })
}

fn image_url(image: &ImageInput) -> String {
    match image {
        ImageInput::Url(url) => url.clone(),
        ImageInput::Inline { .. } => image.data_url(),
    }
}

/// Concatenate every `output_text` part of every message output item
fn output_text(response: &ResponsesResponse) -> Result<String, ProviderError> {
    let mut text = String::new();
    let mut refusal = None;
    for item in response.output.iter().filter(|o| o.r#type == "message") {
        for part in item.content.iter().flatten() {
            match part.r#type.as_str() {
                "output_text" => text.push_str(part.text.as_deref().unwrap_or_default()),
                "refusal" => refusal = part.refusal.clone(),
                _ => {}
            }
        }
    }
    if text.is_empty() {
        if let Some(reason) = refusal {
            return Err(
                ProviderError::upstream(format!("Model refused: {reason}")).from_provider(ProviderName::OpenAI)
            );
        }
    }
    Ok(text)
}

fn responses_usage(usage: Option<&ResponsesUsage>, prompt: &str, completion: &str) -> TokenUsage {
    let Some(usage) = usage else {
        return TokenUsage::estimate(prompt, completion);
    };
    TokenUsage::reported_or_estimated(
        usage.input_tokens,
        usage.output_tokens,
        usage.total_tokens,
        prompt,
        completion,
    )
    .with_details(
        usage.input_tokens_details.as_ref().map(|d| d.cached_tokens),
        usage.output_tokens_details.as_ref().map(|d| d.reasoning_tokens),
    )
}

fn normalize_structured(response: &ResponsesResponse, prompt: &str) -> Result<ProviderResult<Value>, ProviderError> {
    let text = output_text(response)?;
    let payload: Value = decode(ProviderName::OpenAI, &text)?;
    Ok(ProviderResult {
        usage: responses_usage(response.usage.as_ref(), prompt, &text),
        payload,
        provider: ProviderName::OpenAI,
    })
}

fn normalize_text(response: &ResponsesResponse, prompt: &str) -> Result<ProviderResult<String>, ProviderError> {
    let text = output_text(response)?;
    Ok(ProviderResult {
        usage: responses_usage(response.usage.as_ref(), prompt, &text),
        payload: text.trim().to_string(),
        provider: ProviderName::OpenAI,
    })
}

fn normalize_chat(response: ChatResponse, prompt: &str) -> Result<ProviderResult<String>, ProviderError> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ProviderError::upstream("No choices in response").from_provider(ProviderName::OpenAI))?;
    let usage = match response.usage {
        Some(u) => TokenUsage::reported_or_estimated(
            u.prompt_tokens,
            u.completion_tokens,
            u.total_tokens,
            prompt,
            &text,
        ),
        None => TokenUsage::estimate(prompt, &text),
    };
    Ok(ProviderResult {
        payload: text.trim().to_string(),
        usage,
        provider: ProviderName::OpenAI,
    })
}

fn normalize_moderation(
    response: ModerationResponse,
    text: &str,
) -> Result<ProviderResult<ModerationVerdict, EstimatedUsage>, ProviderError> {
    let result = response.results.into_iter().next().ok_or_else(|| {
        ProviderError::upstream("No results in moderation response").from_provider(ProviderName::OpenAI)
    })?;
    Ok(ProviderResult {
        payload: ModerationVerdict::new(result.flagged, result.categories, result.category_scores),
        // The moderation endpoint reports no usage
        usage: EstimatedUsage::from_input(text),
        provider: ProviderName::OpenAI,
    })
}

fn normalize_transcription(response: TranscriptionResponse, prompt: &str) -> ProviderResult<Transcript> {
    ProviderResult {
        usage: TokenUsage::estimate(prompt, &response.text),
        payload: Transcript {
            text: response.text,
            duration: response.duration,
            language: response.language,
        },
        provider: ProviderName::OpenAI,
    }
}

#[async_trait]
impl TextGenerator for OpenAIClient {
    fn provider(&self) -> ProviderName {
        ProviderName::OpenAI
    }

    async fn generate_structured(
        &self,
        request: &StructuredRequest,
    ) -> Result<ProviderResult<Value>, ProviderError> {
        let response: ResponsesResponse = self.post_json("/responses", &self.structured_body(request)).await?;
        normalize_structured(&response, &request.prompt)
    }

    async fn generate_text(&self, request: &TextRequest) -> Result<ProviderResult<String>, ProviderError> {
        let response: ResponsesResponse = self.post_json("/responses", &self.text_body(request)).await?;
        normalize_text(&response, &request.prompt)
    }
}

#[async_trait]
impl VisionAnalyzer for OpenAIClient {
    fn provider(&self) -> ProviderName {
        ProviderName::OpenAI
    }

    async fn describe(&self, request: &VisionRequest) -> Result<ProviderResult<String>, ProviderError> {
        let response: ChatResponse = self.post_json("/chat/completions", &self.vision_body(request)).await?;
        normalize_chat(response, &request.prompt)
    }
}

#[async_trait]
impl Moderator for OpenAIClient {
    fn provider(&self) -> ProviderName {
        ProviderName::OpenAI
    }

    async fn moderate(
        &self,
        text: &str,
    ) -> Result<ProviderResult<ModerationVerdict, EstimatedUsage>, ProviderError> {
        let body = ModerationRequest {
            model: MODERATION_MODEL,
            input: text,
        };
        let response: ModerationResponse = self.post_json("/moderations", &body).await?;
        normalize_moderation(response, text)
    }
}

#[async_trait]
impl Transcriber for OpenAIClient {
    fn provider(&self) -> ProviderName {
        ProviderName::OpenAI
    }

    async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<ProviderResult<Transcript>, ProviderError> {
        let mime = mime_guess::from_path(&request.file_name).first_or_octet_stream();
        let part = Part::bytes(request.audio)
            .file_name(request.file_name)
            .mime_str(mime.essence_str())
            .map_err(|e| {
                ProviderError::unsupported_input(format!("Invalid audio content type: {e}"))
                    .from_provider(ProviderName::OpenAI)
            })?;

        let mut form = Form::new()
            .text("model", TRANSCRIPTION_MODEL)
            .text("response_format", "verbose_json")
            .part("file", part);
        if let Some(language) = request.language {
            form = form.text("language", language);
        }
        let prompt = request.prompt.unwrap_or_default();
        if !prompt.is_empty() {
            form = form.text("prompt", prompt.clone());
        }

        let response = self
            .authorized("/audio/transcriptions")?
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(ProviderName::OpenAI, &e))?;
        let response: TranscriptionResponse = read_json(ProviderName::OpenAI, response).await?;
        Ok(normalize_transcription(response, &prompt))
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct ResponsesRequest {
    model: String,
    input: Vec<InputMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<TextConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct InputMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct TextConfig {
    format: Value,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output: Vec<ResponsesOutput>,
    #[serde(default)]
    usage: Option<ResponsesUsage>,
}

#[derive(Debug, Deserialize)]
struct ResponsesOutput {
    r#type: String,
    #[serde(default)]
    content: Option<Vec<ResponsesContent>>,
}

#[derive(Debug, Deserialize)]
struct ResponsesContent {
    r#type: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponsesUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
    total_tokens: Option<u64>,
    #[serde(default)]
    input_tokens_details: Option<CachedTokens>,
    #[serde(default)]
    output_tokens_details: Option<ReasoningTokens>,
}

#[derive(Debug, Deserialize)]
struct CachedTokens {
    #[serde(default)]
    cached_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ReasoningTokens {
    #[serde(default)]
    reasoning_tokens: u64,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ModerationRequest<'a> {
    model: &'static str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationResult {
    flagged: bool,
    categories: BTreeMap<String, bool>,
    category_scores: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    language: Option<String>,
}
