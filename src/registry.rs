//! Service registry and provider selection
//!
//! Built once at startup and shared read-only by every request.

use crate::config::{Capability, ProviderName, ServiceConfig};
use crate::providers::{
    DeepLClient, GeminiClient, Logged, Moderator, OllamaClient, OpenAIClient, TextGenerator, TextTranslator,
    Transcriber, Translator, VisionAnalyzer,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// No usable client for a capability (or for the requested provider)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct NoServiceError {
    pub capability: Capability,
    pub requested: Option<ProviderName>,
    pub message: String,
}

impl NoServiceError {
    pub fn new(capability: Capability, requested: Option<ProviderName>) -> Self {
        let message = match requested {
            Some(provider) => format!("{} is not configured for {capability}", provider.display_name()),
            None => format!("No enabled service provides {capability}"),
        };
        Self {
            capability,
            requested,
            message,
        }
    }
}

/// Live clients keyed by provider, one map per capability
#[derive(Default, Clone)]
pub struct ProviderSet {
    text: HashMap<ProviderName, Arc<dyn TextGenerator>>,
    vision: HashMap<ProviderName, Arc<dyn VisionAnalyzer>>,
    moderation: HashMap<ProviderName, Arc<dyn Moderator>>,
    translation: HashMap<ProviderName, Arc<dyn Translator>>,
    transcription: HashMap<ProviderName, Arc<dyn Transcriber>>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, client: Arc<dyn TextGenerator>) -> Self {
        self.text.insert(client.provider(), client);
        self
    }

    pub fn with_vision(mut self, client: Arc<dyn VisionAnalyzer>) -> Self {
        self.vision.insert(client.provider(), client);
        self
    }

    pub fn with_moderation(mut self, client: Arc<dyn Moderator>) -> Self {
        self.moderation.insert(client.provider(), client);
        self
    }

    pub fn with_translation(mut self, client: Arc<dyn Translator>) -> Self {
        self.translation.insert(client.provider(), client);
        self
    }

    pub fn with_transcription(mut self, client: Arc<dyn Transcriber>) -> Self {
        self.transcription.insert(client.provider(), client);
        self
    }
}

/// Registry of configured services and their clients
pub struct ServiceRegistry {
    services: Vec<ServiceConfig>,
    clients: ProviderSet,
}

impl ServiceRegistry {
    pub fn new(services: Vec<ServiceConfig>, clients: ProviderSet) -> Self {
        Self { services, clients }
    }

    /// Build logged clients for every enabled service, one per capability it declares
    pub fn from_config(services: Vec<ServiceConfig>) -> Result<Self, reqwest::Error> {
        let mut clients = ProviderSet::new();

        for service in services.iter().filter(|s| s.enabled()) {
            let supports = |capability| service.supports(capability);
            match service.name() {
                ProviderName::OpenAI => {
                    let client = Arc::new(OpenAIClient::new(service)?);
                    if supports(Capability::TextGeneration) {
                        clients = clients.with_text(Arc::new(Logged::new(client.clone() as Arc<dyn TextGenerator>)));
                    }
                    if supports(Capability::Vision) {
                        clients =
                            clients.with_vision(Arc::new(Logged::new(client.clone() as Arc<dyn VisionAnalyzer>)));
                    }
                    if supports(Capability::Moderation) {
                        clients =
                            clients.with_moderation(Arc::new(Logged::new(client.clone() as Arc<dyn Moderator>)));
                    }
                    if supports(Capability::Translation) {
                        let translator: Arc<dyn Translator> = Arc::new(TextTranslator::new(client.clone()));
                        clients = clients.with_translation(Arc::new(Logged::new(translator)));
                    }
                    if supports(Capability::Transcription) {
                        clients = clients.with_transcription(Arc::new(Logged::new(client as Arc<dyn Transcriber>)));
                    }
                }
                ProviderName::Ollama => {
                    let client: Arc<dyn TextGenerator> = Arc::new(OllamaClient::new(service)?);
                    if supports(Capability::TextGeneration) {
                        clients = clients.with_text(Arc::new(Logged::new(client.clone())));
                    }
                    if supports(Capability::Translation) {
                        let translator: Arc<dyn Translator> = Arc::new(TextTranslator::new(client));
                        clients = clients.with_translation(Arc::new(Logged::new(translator)));
                    }
                }
                ProviderName::Gemini => {
                    if supports(Capability::Vision) {
                        let client: Arc<dyn VisionAnalyzer> = Arc::new(GeminiClient::new(service)?);
                        clients = clients.with_vision(Arc::new(Logged::new(client)));
                    }
                }
                ProviderName::DeepL => {
                    if supports(Capability::Translation) {
                        let client: Arc<dyn Translator> = Arc::new(DeepLClient::new(service)?);
                        clients = clients.with_translation(Arc::new(Logged::new(client)));
                    }
                }
            }
            tracing::info!(
                service = %service.name(),
                priority = service.priority(),
                capabilities = ?service.capabilities(),
                "Service enabled"
            );
        }

        Ok(Self::new(services, clients))
    }

    /// Every configured service in declaration order, enabled or not
    pub fn list_services(&self) -> &[ServiceConfig] {
        &self.services
    }

    /// Enabled services for a capability, highest precedence first.
    /// Equal priorities keep declaration order.
    pub fn enabled_services(&self, capability: Capability) -> Vec<&ServiceConfig> {
        let mut enabled: Vec<_> = self
            .services
            .iter()
            .filter(|s| s.enabled() && s.supports(capability))
            .collect();
        enabled.sort_by_key(|s| s.priority());
        enabled
    }

    pub fn primary_service(&self, capability: Capability) -> Option<&ServiceConfig> {
        self.enabled_services(capability).into_iter().next()
    }

    /// Case-insensitive lookup by wire id or display name
    pub fn service_by_name(&self, name: &str) -> Option<&ServiceConfig> {
        let provider = ProviderName::parse(name)?;
        self.services.iter().find(|s| s.name() == provider)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.service_by_name(name).is_some_and(ServiceConfig::enabled)
    }

    fn select<T: ?Sized>(
        &self,
        capability: Capability,
        preferred: Option<ProviderName>,
        clients: &HashMap<ProviderName, Arc<T>>,
    ) -> Result<Arc<T>, NoServiceError> {
        let missing = NoServiceError::new(capability, preferred);
        let provider = match preferred {
            Some(provider) => {
                let usable = self
                    .services
                    .iter()
                    .any(|s| s.name() == provider && s.enabled() && s.supports(capability));
                if !usable {
                    return Err(missing);
                }
                provider
            }
            None => self.primary_service(capability).ok_or(missing.clone())?.name(),
        };
        clients.get(&provider).cloned().ok_or(missing)
    }

    pub fn text_generator(&self, preferred: Option<ProviderName>) -> Result<Arc<dyn TextGenerator>, NoServiceError> {
        self.select(Capability::TextGeneration, preferred, &self.clients.text)
    }

    pub fn vision_analyzer(
        &self,
        preferred: Option<ProviderName>,
    ) -> Result<Arc<dyn VisionAnalyzer>, NoServiceError> {
        self.select(Capability::Vision, preferred, &self.clients.vision)
    }

    pub fn moderator(&self, preferred: Option<ProviderName>) -> Result<Arc<dyn Moderator>, NoServiceError> {
        self.select(Capability::Moderation, preferred, &self.clients.moderation)
    }

    pub fn translator(&self, preferred: Option<ProviderName>) -> Result<Arc<dyn Translator>, NoServiceError> {
        self.select(Capability::Translation, preferred, &self.clients.translation)
    }

    pub fn transcriber(&self, preferred: Option<ProviderName>) -> Result<Arc<dyn Transcriber>, NoServiceError> {
        self.select(Capability::Transcription, preferred, &self.clients.transcription)
    }

    /// Text-generation-backed translator to retry with after `failed` could
    /// not translate. `None` when `failed` is itself that kind of translator
    /// (fallback is single-level) or none is enabled.
    pub fn fallback_translator(&self, failed: ProviderName) -> Option<Arc<dyn Translator>> {
        let failed_is_generic = self
            .services
            .iter()
            .any(|s| s.name() == failed && s.supports(Capability::TextGeneration));
        if failed_is_generic {
            return None;
        }
        self.enabled_services(Capability::Translation)
            .into_iter()
            .filter(|s| s.name() != failed && s.supports(Capability::TextGeneration))
            .find_map(|s| self.clients.translation.get(&s.name()).cloned())
    }
}

#[cfg(test)]
mod proptests;
