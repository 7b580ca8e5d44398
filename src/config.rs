//! Process configuration
//!
//! Read once from the environment at startup. Nothing here is mutated
//! afterwards; the registry takes ownership of the service configs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Category of AI operation a service can perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    TextGeneration,
    Vision,
    Moderation,
    Translation,
    Transcription,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::TextGeneration => "text-generation",
            Capability::Vision => "vision",
            Capability::Moderation => "moderation",
            Capability::Translation => "translation",
            Capability::Transcription => "transcription",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External provider backing one or more capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    OpenAI,
    Ollama,
    Gemini,
    DeepL,
}

impl ProviderName {
    /// Wire identifier used in request and response bodies
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderName::OpenAI => "openai",
            ProviderName::Ollama => "ollama",
            ProviderName::Gemini => "gemini",
            ProviderName::DeepL => "deepl",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ProviderName::OpenAI => "OpenAI",
            ProviderName::Ollama => "Ollama",
            ProviderName::Gemini => "Gemini",
            ProviderName::DeepL => "DeepL",
        }
    }

    /// Case-insensitive parse of either the wire id or the display name
    pub fn parse(name: &str) -> Option<Self> {
        [
            ProviderName::OpenAI,
            ProviderName::Ollama,
            ProviderName::Gemini,
            ProviderName::DeepL,
        ]
        .into_iter()
        .find(|p| p.as_str().eq_ignore_ascii_case(name) || p.display_name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credential string that never shows up in `Debug` output or logs
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Configuration for one logical service.
///
/// `enabled` is derived from the presence of credentials / env flags when the
/// config is built and has no setter.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    name: ProviderName,
    enabled: bool,
    /// Lower number = higher precedence
    priority: u32,
    credentials: Option<Secret>,
    endpoint: String,
    model: String,
    vision_model: Option<String>,
    capabilities: Vec<Capability>,
    timeout: Duration,
}

impl ServiceConfig {
    pub fn new(
        name: ProviderName,
        enabled: bool,
        priority: u32,
        capabilities: &[Capability],
    ) -> Self {
        Self {
            name,
            enabled,
            priority,
            credentials: None,
            endpoint: String::new(),
            model: String::new(),
            vision_model: None,
            capabilities: capabilities.to_vec(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_credentials(mut self, credentials: Option<String>) -> Self {
        self.credentials = credentials.map(Secret::new);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> ProviderName {
        self.name
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn credentials(&self) -> Option<&Secret> {
        self.credentials.as_ref()
    }

    /// Base URL of the provider API, without a trailing slash
    pub fn endpoint(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn vision_model(&self) -> &str {
        self.vision_model.as_deref().unwrap_or(&self.model)
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Top-level gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub access_token: Option<String>,
    /// Development mode disables bearer auth
    pub dev_mode: bool,
    /// Raw comma-separated allowed origins, if configured
    pub cors_origins: Option<String>,
    pub services: Vec<ServiceConfig>,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secs = |key: &str, default: u64| {
            Duration::from_secs(var(key).and_then(|v| v.parse().ok()).unwrap_or(default))
        };

        let openai_key = var("OPENAI_API_KEY");
        let openai = ServiceConfig::new(
            ProviderName::OpenAI,
            openai_key.is_some(),
            1,
            &[
                Capability::TextGeneration,
                Capability::Vision,
                Capability::Moderation,
                Capability::Translation,
                Capability::Transcription,
            ],
        )
        .with_credentials(openai_key)
        .with_endpoint(var("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".to_string()))
        .with_model(var("OPENAI_MODEL").unwrap_or_else(|| "gpt-4.1".to_string()))
        .with_vision_model(var("OPENAI_VISION_MODEL").unwrap_or_else(|| "gpt-4o".to_string()))
        .with_timeout(secs("OPENAI_TIMEOUT_SECS", 120));

        let ollama_base = var("OLLAMA_BASE_URL");
        let ollama_enabled =
            var("OLLAMA_ENABLED").is_some_and(|v| v.eq_ignore_ascii_case("true")) || ollama_base.is_some();
        let ollama_timeout_ms = var("OLLAMA_TIMEOUT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(30_000);
        let ollama = ServiceConfig::new(
            ProviderName::Ollama,
            ollama_enabled,
            2,
            &[Capability::TextGeneration],
        )
        .with_endpoint(ollama_base.unwrap_or_else(|| "http://localhost:11434".to_string()))
        .with_model(var("OLLAMA_MODEL").unwrap_or_else(|| "llama3.2".to_string()))
        .with_timeout(Duration::from_millis(ollama_timeout_ms));

        let gemini_key = var("GEMINI_API_KEY");
        let gemini = ServiceConfig::new(
            ProviderName::Gemini,
            gemini_key.is_some(),
            3,
            &[Capability::Vision],
        )
        .with_credentials(gemini_key)
        .with_endpoint(
            var("GEMINI_BASE_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
        )
        .with_model(var("GEMINI_MODEL").unwrap_or_else(|| "gemini-1.5-flash".to_string()))
        .with_timeout(secs("GEMINI_TIMEOUT_SECS", 120));

        let deepl_key = var("DEEPL_API_KEY");
        let deepl_endpoint = var("DEEPL_BASE_URL").unwrap_or_else(|| {
            // Free-plan keys carry a ":fx" suffix and live on a separate host
            if deepl_key.as_deref().is_some_and(|k| k.ends_with(":fx")) {
                "https://api-free.deepl.com".to_string()
            } else {
                "https://api.deepl.com".to_string()
            }
        });
        let deepl = ServiceConfig::new(
            ProviderName::DeepL,
            deepl_key.is_some(),
            4,
            &[Capability::Translation],
        )
        .with_credentials(deepl_key)
        .with_endpoint(deepl_endpoint)
        .with_timeout(secs("DEEPL_TIMEOUT_SECS", 30));

        Self {
            port: var("PORT").and_then(|p| p.parse().ok()).unwrap_or(3000),
            access_token: var("DEFAULT_ACCESS_TOKEN"),
            dev_mode: var("APP_ENV").is_some_and(|v| v == "development"),
            cors_origins: var("CORS_ORIGINS").or_else(|| var("ALLOWED_ORIGINS")),
            services: vec![openai, ollama, gemini, deepl],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> GatewayConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        GatewayConfig::from_lookup(|key| env.get(key).cloned())
    }

    fn service(config: &GatewayConfig, name: ProviderName) -> &ServiceConfig {
        config.services.iter().find(|s| s.name() == name).unwrap()
    }

    #[test]
    fn test_no_env_nothing_enabled() {
        let config = config_from(&[]);
        assert!(config.services.iter().all(|s| !s.enabled()));
        assert_eq!(config.port, 3000);
        assert!(config.access_token.is_none());
    }

    #[test]
    fn test_credentials_enable_services() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-test"), ("GEMINI_API_KEY", "g-test")]);
        assert!(service(&config, ProviderName::OpenAI).enabled());
        assert!(service(&config, ProviderName::Gemini).enabled());
        assert!(!service(&config, ProviderName::DeepL).enabled());
        assert!(!service(&config, ProviderName::Ollama).enabled());
    }

    #[test]
    fn test_blank_key_does_not_enable() {
        let config = config_from(&[("OPENAI_API_KEY", "  ")]);
        assert!(!service(&config, ProviderName::OpenAI).enabled());
    }

    #[test]
    fn test_ollama_enabled_by_flag_or_url() {
        let by_flag = config_from(&[("OLLAMA_ENABLED", "true")]);
        assert!(service(&by_flag, ProviderName::Ollama).enabled());

        let by_url = config_from(&[("OLLAMA_BASE_URL", "http://gpu-box:11434/")]);
        let ollama = service(&by_url, ProviderName::Ollama);
        assert!(ollama.enabled());
        assert_eq!(ollama.endpoint(), "http://gpu-box:11434");
    }

    #[test]
    fn test_ollama_timeout_in_millis() {
        let config = config_from(&[("OLLAMA_ENABLED", "true"), ("OLLAMA_TIMEOUT", "1500")]);
        assert_eq!(
            service(&config, ProviderName::Ollama).timeout(),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_deepl_free_key_uses_free_endpoint() {
        let config = config_from(&[("DEEPL_API_KEY", "abc:fx")]);
        assert_eq!(
            service(&config, ProviderName::DeepL).endpoint(),
            "https://api-free.deepl.com"
        );

        let config = config_from(&[("DEEPL_API_KEY", "abc")]);
        assert_eq!(service(&config, ProviderName::DeepL).endpoint(), "https://api.deepl.com");
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-very-secret")]);
        let rendered = format!("{:?}", service(&config, ProviderName::OpenAI));
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("Secret(***)"));
    }

    #[test]
    fn test_provider_name_parse() {
        assert_eq!(ProviderName::parse("OPENAI"), Some(ProviderName::OpenAI));
        assert_eq!(ProviderName::parse("DeepL"), Some(ProviderName::DeepL));
        assert_eq!(ProviderName::parse("azure"), None);
    }

    #[test]
    fn test_cors_origins_fallback_variable() {
        let config = config_from(&[("ALLOWED_ORIGINS", "https://app.example.com")]);
        assert_eq!(config.cors_origins.as_deref(), Some("https://app.example.com"));
    }
}
