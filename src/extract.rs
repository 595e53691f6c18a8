//! PDF text extraction.
//!
//! Turns a PDF byte stream into a flat text stream. Page boundaries are
//! preserved as newlines so chunking never glues the last line of one page
//! to the first line of the next. A corpus is extracted with a
//! skip-and-report policy: one unreadable file never aborts the batch.

use crate::models::{DocumentInfo, ExtractedDocument, PdfFile, SkippedFile};

/// Extraction failure for a single document.
#[derive(Debug)]
pub enum ExtractionError {
    Read(String),
    Parse(String),
    EmptyText,
}

impl std::fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionError::Read(e) => write!(f, "could not read file: {}", e),
            ExtractionError::Parse(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractionError::EmptyText => write!(f, "document contains no extractable text"),
        }
    }
}

impl std::error::Error for ExtractionError {}

/// Extracts plain text from PDF bytes, one newline guaranteed after every
/// page boundary.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let raw = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ExtractionError::Parse(e.to_string()))?;

    if raw.trim().is_empty() {
        return Err(ExtractionError::EmptyText);
    }

    Ok(normalize_page_breaks(&raw))
}

/// Form feeds mark page boundaries in extractor output; each becomes a
/// newline, and the text always ends with one.
fn normalize_page_breaks(raw: &str) -> String {
    let mut text = raw.replace('\u{c}', "\n");
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

/// Extract every file in the corpus, skipping and reporting failures.
pub fn extract_corpus(files: &[PdfFile]) -> (Vec<ExtractedDocument>, Vec<SkippedFile>) {
    let mut documents = Vec::new();
    let mut skipped = Vec::new();

    for file in files {
        let bytes = match std::fs::read(&file.path) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(file = %file.file_name, error = %e, "skipping unreadable file");
                skipped.push(SkippedFile {
                    file_name: file.file_name.clone(),
                    reason: ExtractionError::Read(e.to_string()).to_string(),
                });
                continue;
            }
        };

        match extract_text(&bytes) {
            Ok(text) => documents.push(ExtractedDocument {
                info: DocumentInfo {
                    id: file.file_name.clone(),
                    file_name: file.file_name.clone(),
                    modified_at: file.modified_at,
                },
                text,
            }),
            Err(e) => {
                tracing::warn!(file = %file.file_name, error = %e, "skipping unparsable file");
                skipped.push(SkippedFile {
                    file_name: file.file_name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    (documents, skipped)
}
