//! Question answering over an uploaded PDF

use super::object_schema;
use crate::document::{extract_pdf, DocumentError, ExtractedDocument};
use crate::error::GatewayError;
use crate::prompts;
use crate::providers::{char_count, generate, OutputSchema, StructuredRequest, TokenUsage};
use crate::registry::ServiceRegistry;
use crate::validate::{FormData, UploadPolicy, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq)]
pub struct AskPdfRequest {
    pub document: ExtractedDocument,
    pub question: String,
    pub max_length: Option<u32>,
}

impl AskPdfRequest {
    pub fn from_form(mut form: FormData) -> Result<Self, ValidationError> {
        let policy = UploadPolicy::PDF;
        let upload = policy.require(form.take_file(policy.field))?;
        let question = form
            .text("question")
            .map(str::to_string)
            .ok_or_else(|| ValidationError::required("question", "Question"))?;
        let max_length = form.optional_positive_int("maxLength", "Max length")?;
        policy.check(&upload)?;

        let document = extract_pdf(&upload.bytes).map_err(|e: DocumentError| {
            tracing::debug!(error = ?e, "PDF parse failed");
            ValidationError::shape("pdf", e.to_string())
                .with_details("Failed to parse PDF file. Please ensure it's a valid PDF.")
        })?;
        if document.text.trim().is_empty() {
            return Err(ValidationError::shape(
                "pdf",
                "PDF appears to be empty or contains no readable text",
            ));
        }

        Ok(Self {
            document,
            question,
            max_length,
        })
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Answer {
    answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfMetadata {
    pub number_of_pages: usize,
    pub text_length: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskPdfResponse {
    pub answer: String,
    pub usage: TokenUsage,
    pub pdf_metadata: PdfMetadata,
}

pub async fn ask_pdf(registry: &ServiceRegistry, request: AskPdfRequest) -> Result<AskPdfResponse, GatewayError> {
    let generator = registry.text_generator(None)?;
    let structured = StructuredRequest {
        prompt: prompts::document_question(&request.document.text, &request.question, request.max_length),
        schema: OutputSchema::new("answer", object_schema(&json!({"answer": {"type": "string"}}))),
        model: None,
    };
    let result = generate::<Answer>(generator.as_ref(), &structured).await?;
    Ok(AskPdfResponse {
        answer: result.payload.answer,
        usage: result.usage,
        pdf_metadata: PdfMetadata {
            number_of_pages: request.document.page_count,
            text_length: char_count(&request.document.text),
        },
    })
}
