//! Audio transcription

use crate::error::GatewayError;
use crate::providers::{TokenUsage, TranscriptionRequest};
use crate::registry::ServiceRegistry;
use crate::validate::{FormData, UploadPolicy, ValidationError};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub struct TranscribeRequest {
    pub audio: Vec<u8>,
    pub file_name: String,
    pub language: Option<String>,
    pub prompt: Option<String>,
}

impl TranscribeRequest {
    pub fn from_form(mut form: FormData) -> Result<Self, ValidationError> {
        let policy = UploadPolicy::AUDIO;
        let upload = policy.require(form.take_file(policy.field))?;
        policy.check(&upload)?;

        let file_name = upload
            .file_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| default_file_name(upload.content_type.as_deref()));
        Ok(Self {
            audio: upload.bytes,
            file_name,
            language: form.text("language").map(str::to_string),
            prompt: form.text("prompt").map(str::to_string),
        })
    }
}

/// The transcription endpoint infers the format from the file name
fn default_file_name(content_type: Option<&str>) -> String {
    let extension = content_type
        .and_then(mime_guess::get_mime_extensions_str)
        .and_then(|extensions| extensions.first())
        .copied()
        .unwrap_or("mp3");
    format!("audio.{extension}")
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub status: &'static str,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub usage: TokenUsage,
}

pub async fn transcribe(
    registry: &ServiceRegistry,
    request: TranscribeRequest,
) -> Result<TranscribeResponse, GatewayError> {
    let transcriber = registry.transcriber(None)?;
    let result = transcriber
        .transcribe(TranscriptionRequest {
            audio: request.audio,
            file_name: request.file_name,
            language: request.language,
            prompt: request.prompt,
        })
        .await?;
    Ok(TranscribeResponse {
        status: "success",
        text: result.payload.text,
        duration: result.payload.duration,
        language: result.payload.language,
        usage: result.usage,
    })
}
