//! Text-generation operations: summarize, keywords, sentiment, code, tweet

use super::object_schema;
use crate::config::ProviderName;
use crate::error::GatewayError;
use crate::prompts;
use crate::providers::{generate, OutputSchema, ProviderError, StructuredRequest, TextRequest, TokenUsage};
use crate::registry::ServiceRegistry;
use crate::validate::{max_chars, JsonBody, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const SENTIMENT_MAX_CHARS: usize = 10_000;

/// Appended to every generated tweet
pub const TWEET_AUTHOR: &str = "— @AITweetBot";

// ============================================================================
// Summarize
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SummarizeRequest {
    pub text: String,
    pub max_length: Option<u32>,
}

impl SummarizeRequest {
    pub fn from_json(body: Value) -> Result<Self, ValidationError> {
        let body = JsonBody::parse(body)?;
        body.require(&[("text", "Text")])?;
        Ok(Self {
            text: body.string("text", "Text")?,
            max_length: body.optional_positive_int("maxLength", "Max length")?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub summary: String,
    pub usage: TokenUsage,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Summary {
    summary: String,
}

pub async fn summarize(
    registry: &ServiceRegistry,
    request: SummarizeRequest,
) -> Result<SummarizeResponse, GatewayError> {
    let generator = registry.text_generator(None)?;
    let structured = StructuredRequest {
        prompt: prompts::summarize(&request.text, request.max_length),
        schema: OutputSchema::new("summary", object_schema(&json!({"summary": {"type": "string"}}))),
        model: None,
    };
    let result = generate::<Summary>(generator.as_ref(), &structured).await?;
    Ok(SummarizeResponse {
        summary: result.payload.summary,
        usage: result.usage,
    })
}

// ============================================================================
// Keywords
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordsRequest {
    pub text: String,
    pub max_keywords: Option<u32>,
}

impl KeywordsRequest {
    pub fn from_json(body: Value) -> Result<Self, ValidationError> {
        let body = JsonBody::parse(body)?;
        body.require(&[("text", "Text")])?;
        Ok(Self {
            text: body.string("text", "Text")?,
            max_keywords: body.optional_positive_int("maxKeywords", "Max keywords")?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct KeywordsResponse {
    pub keywords: Vec<String>,
    pub usage: TokenUsage,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Keywords {
    keywords: Vec<String>,
}

pub async fn keywords(registry: &ServiceRegistry, request: KeywordsRequest) -> Result<KeywordsResponse, GatewayError> {
    let generator = registry.text_generator(None)?;
    let structured = StructuredRequest {
        prompt: prompts::keywords(&request.text, request.max_keywords),
        schema: OutputSchema::new(
            "keywords",
            object_schema(&json!({"keywords": {"type": "array", "items": {"type": "string"}}})),
        ),
        model: None,
    };
    let result = generate::<Keywords>(generator.as_ref(), &structured).await?;
    Ok(KeywordsResponse {
        keywords: result.payload.keywords,
        usage: result.usage,
    })
}

// ============================================================================
// Sentiment
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SentimentRequest {
    pub text: String,
    pub categories: Vec<String>,
    /// `None` means the primary text-generation service
    pub service: Option<ProviderName>,
    pub model: Option<String>,
}

impl SentimentRequest {
    pub fn from_json(body: Value) -> Result<Self, ValidationError> {
        let body = JsonBody::parse(body)?;
        body.require(&[("text", "Text")])?;
        let text = body.string("text", "Text")?;
        let categories = body.optional_string_list("categories", "Categories")?.unwrap_or_default();
        let service = body
            .optional_choice("service", "Service", &["openai", "ollama", "auto"])?
            .and_then(|s| ProviderName::parse(&s));
        let model = body.optional_string("model", "Model")?;
        max_chars("text", "Text", &text, SENTIMENT_MAX_CHARS)?;
        Ok(Self {
            text,
            categories,
            service,
            model,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Emotion {
    pub emotion: String,
    pub score: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Sentiment {
    sentiment: String,
    confidence: f64,
    emotions: Vec<Emotion>,
}

#[derive(Debug, Serialize)]
pub struct SentimentResponse {
    pub sentiment: String,
    pub confidence: f64,
    pub emotions: Vec<Emotion>,
    /// Service that actually answered
    pub service: ProviderName,
    pub usage: TokenUsage,
}

fn sentiment_schema() -> OutputSchema {
    OutputSchema::new(
        "sentiment",
        object_schema(&json!({
            "sentiment": {"type": "string"},
            "confidence": {"type": "number"},
            "emotions": {
                "type": "array",
                "items": object_schema(&json!({
                    "emotion": {"type": "string"},
                    "score": {"type": "number"},
                })),
            },
        })),
    )
}

pub async fn sentiment(
    registry: &ServiceRegistry,
    request: SentimentRequest,
) -> Result<SentimentResponse, GatewayError> {
    let generator = registry.text_generator(request.service)?;
    let structured = StructuredRequest {
        prompt: prompts::sentiment(&request.text, &request.categories),
        schema: sentiment_schema(),
        model: request.model,
    };
    let result = generate::<Sentiment>(generator.as_ref(), &structured).await?;
    let payload = result.payload;
    if !(0.0..=1.0).contains(&payload.confidence) {
        return Err(ProviderError::upstream(format!(
            "Sentiment confidence {} is outside [0, 1]",
            payload.confidence
        ))
        .from_provider(result.provider)
        .into());
    }
    Ok(SentimentResponse {
        sentiment: payload.sentiment,
        confidence: payload.confidence,
        emotions: payload.emotions,
        service: result.provider,
        usage: result.usage,
    })
}

// ============================================================================
// Code generation
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateCodeRequest {
    pub prompt: String,
    pub language: Option<String>,
    pub framework: Option<String>,
    pub complexity: String,
    pub include_comments: bool,
}

impl GenerateCodeRequest {
    pub fn from_json(body: Value) -> Result<Self, ValidationError> {
        let body = JsonBody::parse(body)?;
        body.require(&[("prompt", "Prompt")])?;
        Ok(Self {
            prompt: body.string("prompt", "Prompt")?,
            language: body.optional_string("language", "Language")?,
            framework: body.optional_string("framework", "Framework")?,
            complexity: body
                .optional_choice("complexity", "Complexity", &["simple", "intermediate", "advanced"])?
                .unwrap_or_else(|| "intermediate".to_string()),
            include_comments: body.optional_bool("includeComments", "Include comments")?.unwrap_or(true),
        })
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneratedCode {
    code: String,
    language: String,
    explanation: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateCodeResponse {
    pub code: String,
    pub language: String,
    pub explanation: String,
    pub usage: TokenUsage,
}

pub async fn generate_code(
    registry: &ServiceRegistry,
    request: GenerateCodeRequest,
) -> Result<GenerateCodeResponse, GatewayError> {
    let generator = registry.text_generator(None)?;
    let structured = StructuredRequest {
        prompt: prompts::generate_code(
            &request.prompt,
            request.language.as_deref(),
            request.framework.as_deref(),
            &request.complexity,
            request.include_comments,
        ),
        schema: OutputSchema::new(
            "code",
            object_schema(&json!({
                "code": {"type": "string"},
                "language": {"type": "string"},
                "explanation": {"type": "string"},
            })),
        ),
        model: None,
    };
    let result = generate::<GeneratedCode>(generator.as_ref(), &structured).await?;
    Ok(GenerateCodeResponse {
        code: result.payload.code,
        language: result.payload.language,
        explanation: result.payload.explanation,
        usage: result.usage,
    })
}

// ============================================================================
// Tweet
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TweetRequest {
    pub topic: String,
}

impl TweetRequest {
    pub fn from_json(body: Value) -> Result<Self, ValidationError> {
        let body = JsonBody::parse(body)?;
        body.require(&[("topic", "Topic")])?;
        Ok(Self {
            topic: body.string("topic", "Topic")?,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetResponse {
    pub tweet: String,
    pub character_count: u64,
    pub author: &'static str,
    pub usage: TokenUsage,
}

pub async fn tweet(registry: &ServiceRegistry, request: TweetRequest) -> Result<TweetResponse, GatewayError> {
    let generator = registry.text_generator(None)?;
    let text_request = TextRequest {
        instructions: Some(prompts::TWEET_INSTRUCTIONS.to_string()),
        prompt: prompts::tweet(&request.topic),
        web_search: true,
        temperature: Some(1.0),
        max_output_tokens: Some(2048),
    };
    let result = generator.generate_text(&text_request).await?;
    let tweet = format!("{}\n\n{TWEET_AUTHOR}", result.payload.trim());
    Ok(TweetResponse {
        character_count: crate::providers::char_count(&tweet),
        tweet,
        author: TWEET_AUTHOR,
        usage: result.usage,
    })
}
