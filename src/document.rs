//! PDF text extraction
//!
//! Text comes from the text-show operators of each page's content streams,
//! decoded through their filters (Flate and friends). Scanned pages and
//! fonts without a usable encoding yield little or no text.

use lopdf::Document;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Invalid PDF file")]
    NotPdf,
    #[error("Invalid PDF file")]
    Unreadable(#[from] lopdf::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub text: String,
    pub page_count: usize,
}

pub fn extract_pdf(bytes: &[u8]) -> Result<ExtractedDocument, DocumentError> {
    if !bytes.starts_with(b"%PDF-") {
        return Err(DocumentError::NotPdf);
    }
    let document = Document::load_mem(bytes)?;
    let pages = document.get_pages();

    let mut lines = Vec::new();
    for &number in pages.keys() {
        match document.extract_text(&[number]) {
            Ok(text) => lines.extend(
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string),
            ),
            // One bad page should not sink the rest
            Err(e) => tracing::debug!(page = number, error = %e, "Skipping unreadable PDF page"),
        }
    }

    Ok(ExtractedDocument {
        text: lines.join("\n"),
        page_count: pages.len(),
    })
}
