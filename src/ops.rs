//! Operation handlers
//!
//! Each operation runs once per request: validate, pick a provider, make one
//! call, normalize. Translation is the only operation with a second attempt.
//! Handlers take already-parsed bodies and return typed responses; mapping
//! failures to HTTP happens in the api layer.

mod document;
mod moderate;
mod text;
mod transcribe;
mod translate;
mod vision;

pub use document::{ask_pdf, AskPdfRequest, AskPdfResponse};
pub use moderate::{moderate, ModerateRequest, ModerateResponse};
pub use text::{
    generate_code, keywords, sentiment, summarize, tweet, GenerateCodeRequest, GenerateCodeResponse,
    KeywordsRequest, KeywordsResponse, SentimentRequest, SentimentResponse, SummarizeRequest, SummarizeResponse,
    TweetRequest, TweetResponse,
};
pub use transcribe::{transcribe, TranscribeRequest, TranscribeResponse};
pub use translate::{translate, TranslateRequest, TranslateResponse};
pub use vision::{analyze, caption, AnalyzeImageRequest, CaptionRequest, CaptionResponse};

use serde_json::{json, Value};

/// Strict JSON schema for an object whose properties are all required
fn object_schema(properties: &Value) -> Value {
    let required: Vec<&String> = properties
        .as_object()
        .map(|props| props.keys().collect())
        .unwrap_or_default();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}
