//! Stub providers for testing
//!
//! Each stub returns one fixed result on every call and counts its calls, so
//! tests can assert both the response and whether a provider was reached.

use crate::config::{Capability, ProviderName, ServiceConfig};
use crate::providers::{
    EstimatedUsage, ModerationVerdict, Moderator, ProviderError, ProviderResult, StructuredRequest,
    TextGenerator, TextRequest, TokenUsage, Transcriber, Transcript, TranscriptionRequest, Translation,
    TranslationRequest, Translator, Usage, VisionAnalyzer, VisionRequest,
};
use crate::registry::{ProviderSet, ServiceRegistry};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Usage every stub reports
pub fn stub_usage() -> TokenUsage {
    TokenUsage::new(10, 5)
}

fn ok<T>(provider: ProviderName, payload: T) -> Result<ProviderResult<T>, ProviderError> {
    Ok(ProviderResult {
        payload,
        usage: stub_usage(),
        provider,
    })
}

// ============================================================================
// Text generation
// ============================================================================

pub struct StubTextGenerator {
    provider: ProviderName,
    structured: Result<ProviderResult<Value>, ProviderError>,
    text: Result<ProviderResult<String>, ProviderError>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    text_requests: Mutex<Vec<TextRequest>>,
}

impl StubTextGenerator {
    /// Answers structured requests with `payload`; plain text requests with its JSON text
    pub fn returning(provider: ProviderName, payload: Value) -> Self {
        let text = payload.as_str().map_or_else(|| payload.to_string(), str::to_string);
        Self {
            provider,
            structured: ok(provider, payload),
            text: ok(provider, text),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            text_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(provider: ProviderName, error: ProviderError) -> Self {
        let error = error.from_provider(provider);
        Self {
            provider,
            structured: Err(error.clone()),
            text: Err(error),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            text_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }

    pub fn last_text_request(&self) -> Option<TextRequest> {
        self.text_requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for StubTextGenerator {
    fn provider(&self) -> ProviderName {
        self.provider
    }

    async fn generate_structured(
        &self,
        request: &StructuredRequest,
    ) -> Result<ProviderResult<Value>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        self.structured.clone()
    }

    async fn generate_text(&self, request: &TextRequest) -> Result<ProviderResult<String>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        self.text_requests.lock().unwrap().push(request.clone());
        self.text.clone()
    }
}

// ============================================================================
// Vision
// ============================================================================

pub struct StubVisionAnalyzer {
    provider: ProviderName,
    result: Result<ProviderResult<String>, ProviderError>,
    calls: AtomicUsize,
    requests: Mutex<Vec<VisionRequest>>,
}

impl StubVisionAnalyzer {
    pub fn returning(provider: ProviderName, text: &str) -> Self {
        Self {
            provider,
            result: ok(provider, text.to_string()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(provider: ProviderName, error: ProviderError) -> Self {
        Self {
            provider,
            result: Err(error.from_provider(provider)),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<VisionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl VisionAnalyzer for StubVisionAnalyzer {
    fn provider(&self) -> ProviderName {
        self.provider
    }

    async fn describe(&self, request: &VisionRequest) -> Result<ProviderResult<String>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.result.clone()
    }
}

// ============================================================================
// Moderation
// ============================================================================

pub struct StubModerator {
    verdict: ModerationVerdict,
    calls: AtomicUsize,
}

impl StubModerator {
    /// Verdict with the named categories flagged
    pub fn flagging(flagged: &[&str]) -> Self {
        let categories: BTreeMap<String, bool> = ["hate", "harassment", "sexual", "violence", "self-harm"]
            .into_iter()
            .map(|c| (c.to_string(), flagged.contains(&c)))
            .collect();
        let scores = categories
            .iter()
            .map(|(c, f)| (c.clone(), if *f { 0.9 } else { 0.01 }))
            .collect();
        Self {
            verdict: ModerationVerdict::new(!flagged.is_empty(), categories, scores),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Moderator for StubModerator {
    fn provider(&self) -> ProviderName {
        ProviderName::OpenAI
    }

    async fn moderate(
        &self,
        text: &str,
    ) -> Result<ProviderResult<ModerationVerdict, EstimatedUsage>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ProviderResult {
            payload: self.verdict.clone(),
            usage: EstimatedUsage::from_input(text),
            provider: ProviderName::OpenAI,
        })
    }
}

// ============================================================================
// Translation
// ============================================================================

pub struct StubTranslator {
    provider: ProviderName,
    result: Result<ProviderResult<Translation, Usage>, ProviderError>,
    calls: AtomicUsize,
}

impl StubTranslator {
    /// Succeeds in the provider's native usage unit
    pub fn succeeding(provider: ProviderName, text: &str) -> Self {
        let usage = if provider == ProviderName::DeepL {
            Usage::Characters(crate::providers::CharacterUsage {
                character_count: 5,
                character_limit: Some(500_000),
            })
        } else {
            Usage::Tokens(stub_usage())
        };
        Self {
            provider,
            result: Ok(ProviderResult {
                payload: Translation {
                    text: text.to_string(),
                    detected_source_language: None,
                },
                usage,
                provider,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(provider: ProviderName, error: ProviderError) -> Self {
        Self {
            provider,
            result: Err(error.from_provider(provider)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for StubTranslator {
    fn provider(&self) -> ProviderName {
        self.provider
    }

    async fn translate(
        &self,
        _request: &TranslationRequest,
    ) -> Result<ProviderResult<Translation, Usage>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

// ============================================================================
// Transcription
// ============================================================================

pub struct StubTranscriber {
    transcript: Transcript,
    calls: AtomicUsize,
    file_names: Mutex<Vec<String>>,
}

impl StubTranscriber {
    pub fn returning(text: &str) -> Self {
        Self {
            transcript: Transcript {
                text: text.to_string(),
                duration: Some(2.5),
                language: Some("english".to_string()),
            },
            calls: AtomicUsize::new(0),
            file_names: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_file_name(&self) -> Option<String> {
        self.file_names.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Transcriber for StubTranscriber {
    fn provider(&self) -> ProviderName {
        ProviderName::OpenAI
    }

    async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<ProviderResult<Transcript>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.file_names.lock().unwrap().push(request.file_name);
        ok(ProviderName::OpenAI, self.transcript.clone())
    }
}

// ============================================================================
// Registry helpers
// ============================================================================

/// Service config enabled for the given capabilities
pub fn service(name: ProviderName, priority: u32, capabilities: &[Capability]) -> ServiceConfig {
    ServiceConfig::new(name, true, priority, capabilities)
}

/// Registry with the default service layout, all enabled
pub fn registry(clients: ProviderSet) -> Arc<ServiceRegistry> {
    Arc::new(ServiceRegistry::new(
        vec![
            service(
                ProviderName::OpenAI,
                1,
                &[
                    Capability::TextGeneration,
                    Capability::Vision,
                    Capability::Moderation,
                    Capability::Translation,
                    Capability::Transcription,
                ],
            ),
            service(ProviderName::Ollama, 2, &[Capability::TextGeneration]),
            service(ProviderName::Gemini, 3, &[Capability::Vision]),
            service(ProviderName::DeepL, 4, &[Capability::Translation]),
        ],
        clients,
    ))
}

// ============================================================================
// Documents
// ============================================================================

/// Flate-compressed PDF with one page per entry, each showing its line of
/// text. An empty line leaves the page without text.
pub fn pdf_document(pages: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for line in pages {
        // Save/restore padding so compression always pays off
        let mut operations: Vec<Operation> = (0..64)
            .flat_map(|_| [Operation::new("q", vec![]), Operation::new("Q", vec![])])
            .collect();
        if !line.is_empty() {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 712.into()]),
                Operation::new("Tj", vec![Object::string_literal(*line)]),
                Operation::new("ET", vec![]),
            ]);
        }
        let content = Content { operations }.encode().unwrap();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    let count = i64::try_from(kids.len()).unwrap();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
