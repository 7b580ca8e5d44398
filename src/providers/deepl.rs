//! `DeepL` translation provider

use super::http::{build_client, read_json, transport_error};
use super::{
    char_count, CharacterUsage, ProviderError, ProviderResult, Translation, TranslationRequest,
    Translator, Usage,
};
use crate::config::{ProviderName, Secret, ServiceConfig};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

/// Language names accepted in place of `DeepL` codes
const LANGUAGE_CODES: &[(&str, &str)] = &[
    ("arabic", "AR"),
    ("bulgarian", "BG"),
    ("chinese", "ZH"),
    ("czech", "CS"),
    ("danish", "DA"),
    ("dutch", "NL"),
    ("english", "EN"),
    ("estonian", "ET"),
    ("finnish", "FI"),
    ("french", "FR"),
    ("german", "DE"),
    ("greek", "EL"),
    ("hungarian", "HU"),
    ("indonesian", "ID"),
    ("italian", "IT"),
    ("japanese", "JA"),
    ("korean", "KO"),
    ("latvian", "LV"),
    ("lithuanian", "LT"),
    ("norwegian", "NB"),
    ("polish", "PL"),
    ("portuguese", "PT"),
    ("romanian", "RO"),
    ("russian", "RU"),
    ("slovak", "SK"),
    ("slovenian", "SL"),
    ("spanish", "ES"),
    ("swedish", "SV"),
    ("turkish", "TR"),
    ("ukrainian", "UK"),
];

/// Map a language name or code to `DeepL`'s code.
///
/// Anything of three characters or fewer is taken as a code already.
/// Unknown names are upper-cased and passed through for `DeepL` to judge.
pub fn language_code(language: &str) -> String {
    let language = language.trim();
    if language.chars().count() <= 3 {
        return language.to_uppercase();
    }
    let lower = language.to_lowercase();
    LANGUAGE_CODES
        .iter()
        .find(|(name, _)| *name == lower)
        .map_or_else(|| language.to_uppercase(), |(_, code)| (*code).to_string())
}

/// Target codes `DeepL` no longer accepts without a regional variant
fn target_code(language: &str) -> String {
    let code = language_code(language);
    match code.as_str() {
        "EN" => "EN-US".to_string(),
        "PT" => "PT-PT".to_string(),
        _ => code,
    }
}

pub struct DeepLClient {
    client: Client,
    api_key: Option<Secret>,
    base_url: String,
}

impl DeepLClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(config.timeout())?,
            api_key: config.credentials().cloned(),
            base_url: config.endpoint().to_string(),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, ProviderError> {
        let key = self.api_key.as_ref().ok_or_else(|| {
            ProviderError::authentication("DEEPL_API_KEY is not set").from_provider(ProviderName::DeepL)
        })?;
        Ok(request.header("Authorization", format!("DeepL-Auth-Key {}", key.expose())))
    }

    /// Plan character limit. Failure only costs the limit in the usage record.
    async fn character_limit(&self) -> Option<u64> {
        let request = self
            .authorize(self.client.get(format!("{}/v2/usage", self.base_url)))
            .ok()?;
        let result = match request.send().await {
            Ok(response) => read_json::<UsageResponse>(ProviderName::DeepL, response).await,
            Err(e) => Err(transport_error(ProviderName::DeepL, &e)),
        };
        match result {
            Ok(usage) => usage.character_limit,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch DeepL usage");
                None
            }
        }
    }
}

fn translate_body(request: &TranslationRequest) -> TranslateRequest {
    TranslateRequest {
        text: vec![request.text.clone()],
        target_lang: target_code(&request.target_language),
        source_lang: request.source_language.as_deref().map(language_code),
    }
}

fn normalize_translation(
    response: TranslateResponse,
    source_text: &str,
    character_limit: Option<u64>,
) -> Result<ProviderResult<Translation, Usage>, ProviderError> {
    let translation = response.translations.into_iter().next().ok_or_else(|| {
        ProviderError::upstream("No translations in response").from_provider(ProviderName::DeepL)
    })?;
    Ok(ProviderResult {
        payload: Translation {
            text: translation.text,
            detected_source_language: translation.detected_source_language,
        },
        usage: CharacterUsage {
            character_count: char_count(source_text),
            character_limit,
        }
        .into(),
        provider: ProviderName::DeepL,
    })
}

#[async_trait]
impl Translator for DeepLClient {
    fn provider(&self) -> ProviderName {
        ProviderName::DeepL
    }

    async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<ProviderResult<Translation, Usage>, ProviderError> {
        let response = self
            .authorize(self.client.post(format!("{}/v2/translate", self.base_url)))?
            .json(&translate_body(request))
            .send()
            .await
            .map_err(|e| transport_error(ProviderName::DeepL, &e))?;
        let response: TranslateResponse = read_json(ProviderName::DeepL, response).await?;
        let limit = self.character_limit().await;
        normalize_translation(response, &request.text, limit)
    }
}

// DeepL API types

#[derive(Debug, Serialize)]
struct TranslateRequest {
    text: Vec<String>,
    target_lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_lang: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    #[serde(default)]
    detected_source_language: Option<String>,
    text: String,
}

#[derive(Debug, Deserialize)]
struct UsageResponse {
    #[serde(default)]
    character_limit: Option<u64>,
}
