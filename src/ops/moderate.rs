//! Content moderation

use crate::error::GatewayError;
use crate::providers::{EstimatedUsage, ModerationVerdict};
use crate::registry::ServiceRegistry;
use crate::validate::{max_chars, JsonBody, ValidationError};
use serde::Serialize;
use serde_json::Value;

const MODERATION_MAX_CHARS: usize = 32_768;

#[derive(Debug, Clone, PartialEq)]
pub struct ModerateRequest {
    pub text: String,
}

impl ModerateRequest {
    pub fn from_json(body: Value) -> Result<Self, ValidationError> {
        let body = JsonBody::parse(body)?;
        body.require(&[("text", "Text")])?;
        let text = body.string("text", "Text")?;
        max_chars("text", "Text", &text, MODERATION_MAX_CHARS)?;
        Ok(Self { text })
    }
}

#[derive(Debug, Serialize)]
pub struct ModerateResponse {
    #[serde(flatten)]
    pub verdict: ModerationVerdict,
    pub usage: EstimatedUsage,
}

pub async fn moderate(registry: &ServiceRegistry, request: ModerateRequest) -> Result<ModerateResponse, GatewayError> {
    let moderator = registry.moderator(None)?;
    let result = moderator.moderate(&request.text).await?;
    Ok(ModerateResponse {
        verdict: result.payload,
        usage: result.usage,
    })
}
