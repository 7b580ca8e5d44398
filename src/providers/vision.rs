//! Image inputs and the caption/object analysis built on `VisionAnalyzer`

use super::{ProviderError, TokenUsage, VisionAnalyzer, VisionRequest};
use crate::config::ProviderName;
use crate::prompts;
use base64::Engine;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Matches a line-tail beginning at an object/item/thing mention
static OBJECT_MENTION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)(?:objects?|items?|things?).*?(?:\n|\z)").ok());

const ANALYSIS_MAX_TOKENS: u32 = 1000;

/// Image handed to a vision provider
#[derive(Clone, PartialEq)]
pub enum ImageInput {
    /// Remote `http(s)` image
    Url(String),
    /// Raw image bytes with their declared MIME type
    Inline { bytes: Vec<u8>, mime_type: String },
}

impl std::fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageInput::Url(url) => f.debug_tuple("Url").field(url).finish(),
            ImageInput::Inline { bytes, mime_type } => f
                .debug_struct("Inline")
                .field("mime_type", mime_type)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

impl ImageInput {
    /// `data:` URL form of the image. URLs are returned unchanged.
    pub fn data_url(&self) -> String {
        match self {
            ImageInput::Url(url) => url.clone(),
            ImageInput::Inline { bytes, mime_type } => format!(
                "data:{mime_type};base64,{}",
                base64::engine::general_purpose::STANDARD.encode(bytes)
            ),
        }
    }

    /// Decode a base64 `data:` URL. Returns `None` for anything else.
    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (meta, data) = rest.split_once(',')?;
        let mime_type = meta.strip_suffix(";base64")?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .ok()?;
        Some(ImageInput::Inline {
            bytes,
            mime_type: mime_type.to_ascii_lowercase(),
        })
    }
}

/// What the caller wants out of an image analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    Caption,
    Objects,
    #[default]
    Both,
}

impl AnalysisType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "caption" => Some(Self::Caption),
            "objects" => Some(Self::Objects),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    fn wants_caption(self) -> bool {
        matches!(self, Self::Caption | Self::Both)
    }

    fn wants_objects(self) -> bool {
        matches!(self, Self::Objects | Self::Both)
    }
}

/// Object mention pulled from free-text model output.
///
/// This is a best-effort text heuristic, not a detector: `name` is the
/// mentioning line and `confidence`/`bounding_box` are never filled by the
/// current providers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedObject {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisionAnalysis {
    pub provider: ProviderName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<DetectedObject>>,
    /// Raw model output
    pub analysis: String,
    pub usage: TokenUsage,
}

/// Every object mention in `text`, or `None` if there are none
fn object_mentions(text: &str) -> Option<Vec<DetectedObject>> {
    let objects: Vec<_> = OBJECT_MENTION
        .as_ref()?
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(|name| DetectedObject {
            name: name.to_string(),
            confidence: None,
            bounding_box: None,
        })
        .collect();
    (!objects.is_empty()).then_some(objects)
}

/// Run one analysis call and split the output into caption and objects
pub async fn analyze_image(
    analyzer: &dyn VisionAnalyzer,
    image: ImageInput,
    analysis_type: AnalysisType,
) -> Result<VisionAnalysis, ProviderError> {
    let request = VisionRequest {
        image,
        prompt: prompts::image_analysis(analysis_type).to_string(),
        max_tokens: ANALYSIS_MAX_TOKENS,
        temperature: None,
    };
    let result = analyzer.describe(&request).await?;
    let analysis = result.payload;

    Ok(VisionAnalysis {
        provider: result.provider,
        caption: analysis_type.wants_caption().then(|| analysis.clone()),
        objects: if analysis_type.wants_objects() {
            object_mentions(&analysis)
        } else {
            None
        },
        analysis,
        usage: result.usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubVisionAnalyzer;

    #[test]
    fn test_data_url_round_trip() {
        let image = ImageInput::from_data_url("data:image/PNG;base64,AQID").unwrap();
        assert_eq!(
            image,
            ImageInput::Inline {
                bytes: vec![1, 2, 3],
                mime_type: "image/png".to_string()
            }
        );
        assert_eq!(image.data_url(), "data:image/png;base64,AQID");
    }

    #[test]
    fn test_from_data_url_rejects_non_base64() {
        assert!(ImageInput::from_data_url("https://example.com/a.png").is_none());
        assert!(ImageInput::from_data_url("data:image/png,rawbytes").is_none());
        assert!(ImageInput::from_data_url("data:image/png;base64,***").is_none());
    }

    #[test]
    fn test_object_mentions() {
        let text = "A kitchen scene.\nObjects visible: a kettle, two mugs\nOther items: a spoon";
        let objects = object_mentions(text).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].name, "Objects visible: a kettle, two mugs");
        assert_eq!(objects[1].name, "items: a spoon");
        assert!(objects.iter().all(|o| o.confidence.is_none()));

        assert!(object_mentions("A quiet beach at dusk.").is_none());
    }

    #[tokio::test]
    async fn test_analysis_type_controls_fields() {
        let stub = StubVisionAnalyzer::returning(ProviderName::Gemini, "Objects: a red ball");
        let image = ImageInput::Inline {
            bytes: vec![0],
            mime_type: "image/png".to_string(),
        };

        let caption_only = analyze_image(&stub, image.clone(), AnalysisType::Caption)
            .await
            .unwrap();
        assert_eq!(caption_only.caption.as_deref(), Some("Objects: a red ball"));
        assert!(caption_only.objects.is_none());

        let objects_only = analyze_image(&stub, image.clone(), AnalysisType::Objects)
            .await
            .unwrap();
        assert!(objects_only.caption.is_none());
        assert_eq!(objects_only.objects.unwrap().len(), 1);

        let both = analyze_image(&stub, image, AnalysisType::Both).await.unwrap();
        assert_eq!(both.provider, ProviderName::Gemini);
        assert!(both.caption.is_some() && both.objects.is_some());
        assert_eq!(stub.calls(), 3);
    }
}
