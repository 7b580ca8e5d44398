//! Ollama (local models) text-generation provider

use super::http::{build_client, decode, read_json, transport_error};
use super::{ProviderError, ProviderResult, StructuredRequest, TextGenerator, TextRequest, TokenUsage};
use crate::config::{ProviderName, ServiceConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub struct OllamaClient {
    client: Client,
    url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(config.timeout())?,
            url: format!("{}/api/chat", config.endpoint()),
            model: config.model().to_string(),
        })
    }

    async fn chat(&self, body: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let response = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(ProviderName::Ollama, &e))?;
        read_json(ProviderName::Ollama, response).await
    }

    fn structured_body(&self, request: &StructuredRequest) -> ChatRequest {
        ChatRequest {
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            messages: vec![ChatMessage::user(&request.prompt)],
            stream: false,
            format: Some(request.schema.schema.clone()),
            options: None,
        }
    }

    /// Web search has no Ollama equivalent and is dropped
    fn text_body(&self, request: &TextRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(instructions) = &request.instructions {
            messages.push(ChatMessage {
                role: "system",
                content: instructions.clone(),
            });
        }
        messages.push(ChatMessage::user(&request.prompt));

        let options = (request.temperature.is_some() || request.max_output_tokens.is_some()).then(|| {
            ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_output_tokens,
            }
        });

        ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            format: None,
            options,
        }
    }
}

fn usage(response: &ChatResponse, prompt: &str) -> TokenUsage {
    TokenUsage::reported_or_estimated(
        response.prompt_eval_count,
        response.eval_count,
        None,
        prompt,
        &response.message.content,
    )
}

#[async_trait]
impl TextGenerator for OllamaClient {
    fn provider(&self) -> ProviderName {
        ProviderName::Ollama
    }

    async fn generate_structured(
        &self,
        request: &StructuredRequest,
    ) -> Result<ProviderResult<Value>, ProviderError> {
        let response = self.chat(&self.structured_body(request)).await?;
        let payload = decode(ProviderName::Ollama, &response.message.content)?;
        Ok(ProviderResult {
            usage: usage(&response, &request.prompt),
            payload,
            provider: ProviderName::Ollama,
        })
    }

    async fn generate_text(&self, request: &TextRequest) -> Result<ProviderResult<String>, ProviderError> {
        if request.web_search {
            tracing::debug!("Ollama has no web search; generating without it");
        }
        let response = self.chat(&self.text_body(request)).await?;
        Ok(ProviderResult {
            usage: usage(&response, &request.prompt),
            payload: response.message.content.trim().to_string(),
            provider: ProviderName::Ollama,
        })
    }
}

// Ollama API types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl ChatMessage {
    fn user(content: &str) -> Self {
        Self {
            role: "user",
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}
