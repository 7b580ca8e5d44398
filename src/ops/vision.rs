//! Image operations: caption from a URL or data URL, analysis of an upload

use crate::config::ProviderName;
use crate::error::GatewayError;
use crate::prompts;
use crate::providers::{
    analyze_image, AnalysisType, ImageInput, ProviderError, TokenUsage, VisionAnalysis, VisionRequest,
};
use crate::registry::ServiceRegistry;
use crate::validate::{max_value, FormData, JsonBody, UploadPolicy, ValidationError};
use serde::Serialize;
use serde_json::Value;

const CAPTION_STYLES: &[&str] = &["descriptive", "concise", "creative", "technical"];
const CAPTION_MAX_WORDS: u32 = 500;
const CAPTION_MAX_TOKENS: u32 = 500;
const CAPTION_TEMPERATURE: f32 = 0.7;

// ============================================================================
// Caption
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionRequest {
    pub image: ImageInput,
    pub style: String,
    pub max_length: Option<u32>,
    pub include_details: bool,
}

impl CaptionRequest {
    pub fn from_json(body: Value) -> Result<Self, ValidationError> {
        let body = JsonBody::parse(body)?;
        body.require(&[("image", "Image")])?;
        let raw = body.string("image", "Image")?;
        let style = body
            .optional_choice("style", "Style", CAPTION_STYLES)?
            .unwrap_or_else(|| "descriptive".to_string());
        let max_length = body.optional_positive_int("maxLength", "Max length")?;
        let include_details = body.optional_bool("includeDetails", "Include details")?.unwrap_or(false);
        let image = parse_image(&raw)?;

        max_value("maxLength", "Max length", max_length, CAPTION_MAX_WORDS)?;
        if let ImageInput::Inline { bytes, mime_type } = &image {
            UploadPolicy::IMAGE.check_size(bytes.len())?;
            UploadPolicy::IMAGE.check_type(Some(mime_type.as_str()), None)?;
        }

        Ok(Self {
            image,
            style,
            max_length,
            include_details,
        })
    }
}

/// `http(s)` URLs pass through; `data:image/` URLs are decoded
fn parse_image(raw: &str) -> Result<ImageInput, ValidationError> {
    let invalid = || {
        ValidationError::shape("image", "Invalid image")
            .with_details("Image must be either a URL or base64 encoded data with proper data:image/ prefix")
    };
    if raw.starts_with("http://") || raw.starts_with("https://") {
        Ok(ImageInput::Url(raw.to_string()))
    } else if raw.starts_with("data:image/") {
        ImageInput::from_data_url(raw).ok_or_else(invalid)
    } else {
        Err(invalid())
    }
}

#[derive(Debug, Serialize)]
pub struct CaptionResponse {
    pub caption: String,
    pub style: String,
    pub usage: TokenUsage,
}

pub async fn caption(registry: &ServiceRegistry, request: CaptionRequest) -> Result<CaptionResponse, GatewayError> {
    let analyzer = registry.vision_analyzer(None)?;
    let vision_request = VisionRequest {
        image: request.image,
        prompt: prompts::image_caption(&request.style, request.max_length, request.include_details),
        max_tokens: CAPTION_MAX_TOKENS,
        temperature: Some(CAPTION_TEMPERATURE),
    };
    let result = analyzer.describe(&vision_request).await?;
    let caption = result.payload.trim();
    if caption.is_empty() {
        return Err(ProviderError::upstream("Model returned an empty caption")
            .from_provider(result.provider)
            .into());
    }
    Ok(CaptionResponse {
        caption: caption.to_string(),
        style: request.style,
        usage: result.usage,
    })
}

// ============================================================================
// Analyze
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeImageRequest {
    pub image: ImageInput,
    pub analysis_type: AnalysisType,
    pub provider: Option<ProviderName>,
}

impl AnalyzeImageRequest {
    pub fn from_form(mut form: FormData) -> Result<Self, ValidationError> {
        let policy = UploadPolicy::IMAGE;
        let upload = policy.require(form.take_file(policy.field))?;

        let analysis_type = match form.text("analysisType") {
            None => AnalysisType::default(),
            Some(value) => AnalysisType::parse(value).ok_or_else(|| {
                ValidationError::shape("analysisType", "Invalid analysis type")
                    .with_details("Analysis type must be 'caption', 'objects', or 'both'")
            })?,
        };
        let provider = match form.text("provider") {
            None => None,
            Some(value) => Some(
                ProviderName::parse(value)
                    .filter(|p| matches!(p, ProviderName::OpenAI | ProviderName::Gemini))
                    .ok_or_else(|| {
                        ValidationError::shape("provider", "Invalid provider")
                            .with_details("Provider must be 'openai' or 'gemini'")
                    })?,
            ),
        };

        policy.check(&upload)?;
        let mime_type = upload
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();

        Ok(Self {
            image: ImageInput::Inline {
                bytes: upload.bytes,
                mime_type,
            },
            analysis_type,
            provider,
        })
    }
}

pub async fn analyze(registry: &ServiceRegistry, request: AnalyzeImageRequest) -> Result<VisionAnalysis, GatewayError> {
    let analyzer = registry.vision_analyzer(request.provider)?;
    Ok(analyze_image(analyzer.as_ref(), request.image, request.analysis_type).await?)
}
