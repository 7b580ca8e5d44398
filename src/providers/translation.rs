//! Translation served by a general text-generation provider

use super::{
    generate, OutputSchema, ProviderError, ProviderResult, StructuredRequest, TextGenerator, Translation,
    TranslationRequest, Translator, Usage,
};
use crate::config::ProviderName;
use crate::prompts;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TranslatedText {
    translated_text: String,
}

fn schema() -> OutputSchema {
    OutputSchema::new(
        "translation",
        json!({
            "type": "object",
            "properties": {"translatedText": {"type": "string"}},
            "required": ["translatedText"],
            "additionalProperties": false
        }),
    )
}

/// Adapts a `TextGenerator` to the `Translator` interface. Reports the
/// generator's provider and token usage.
pub struct TextTranslator {
    generator: Arc<dyn TextGenerator>,
}

impl TextTranslator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Translator for TextTranslator {
    fn provider(&self) -> ProviderName {
        self.generator.provider()
    }

    async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<ProviderResult<Translation, Usage>, ProviderError> {
        let structured = StructuredRequest {
            prompt: prompts::translate(
                &request.text,
                &request.target_language,
                request.source_language.as_deref(),
            ),
            schema: schema(),
            model: None,
        };
        let result = generate::<TranslatedText>(self.generator.as_ref(), &structured).await?;
        Ok(result
            .map(|t| Translation {
                text: t.translated_text,
                detected_source_language: None,
            })
            .map_usage(Usage::from))
    }
}
