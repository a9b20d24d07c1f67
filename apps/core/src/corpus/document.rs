//! Uploaded documents: text extraction, sentence splitting and n-gram
//! context windows.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::panic::{self, AssertUnwindSafe};
use tracing::{info, warn};
use unicode_segmentation::UnicodeSegmentation;

/// Default n-gram window bounds, in sentences.
pub const MIN_WINDOW: usize = 1;
pub const MAX_WINDOW: usize = 6;

/// Raw text of one uploaded file plus a fingerprint of its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub text: String,
    /// SHA-256 of the uploaded bytes, hex encoded.
    pub fingerprint: String,
}

impl Document {
    /// Extracts `bytes` into a document. Extraction failures degrade to an
    /// empty text so downstream matching answers with a fallback.
    pub fn from_upload(file_name: &str, bytes: &[u8]) -> Self {
        let text = match extract_text(file_name, bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!("Treating {} as empty document: {}", file_name, e);
                String::new()
            }
        };
        Self {
            name: file_name.to_string(),
            text,
            fingerprint: fingerprint(bytes),
        }
    }

    /// A document built from text already in memory.
    pub fn from_text(name: &str, text: &str) -> Self {
        Self {
            name: name.to_string(),
            text: text.to_string(),
            fingerprint: fingerprint(text.as_bytes()),
        }
    }

    pub fn sentences(&self) -> Vec<String> {
        split_sentences(&self.text)
    }
}

/// Hex SHA-256 of `bytes`.
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{digest:x}")
}

/// Extract text based on content sniffing first, file extension second.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<String, AppError> {
    if bytes.is_empty() {
        return Ok(String::new());
    }

    let sniffed_pdf = infer::get(bytes)
        .map(|kind| kind.mime_type() == "application/pdf")
        .unwrap_or(false);
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    info!("Extracting text from file: {} (type: {})", file_name, extension);

    if sniffed_pdf || extension == "pdf" {
        return extract_pdf_text(bytes);
    }

    match extension.as_str() {
        "txt" | "md" | "text" | "" => String::from_utf8(bytes.to_vec())
            .map_err(|e| AppError::Extraction(format!("Invalid UTF-8 content: {}", e))),
        _ => Err(AppError::Extraction(format!(
            "Unsupported file extension: {}",
            extension
        ))),
    }
}

/// PDF text, pages separated by newlines. The parser is known to panic on
/// some malformed files; that is reported as an extraction error.
fn extract_pdf_text(bytes: &[u8]) -> Result<String, AppError> {
    info!("Extracting text from PDF...");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(bytes)
    }));

    match outcome {
        Ok(Ok(text)) => {
            let text = text.replace('\u{c}', "\n");
            info!("PDF extraction successful: {} characters", text.len());
            Ok(text)
        }
        Ok(Err(e)) => {
            warn!("PDF extraction failed: {}", e);
            Err(AppError::Extraction(format!("Failed to extract PDF text: {}", e)))
        }
        Err(_) => {
            warn!("PDF parser panicked");
            Err(AppError::Extraction("PDF parser panicked".to_string()))
        }
    }
}

/// Splits text into trimmed, non-blank sentences.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.unicode_sentences()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A retrievable granule: a run of sentences `start..=end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextUnit {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl TextUnit {
    pub fn sentence(index: usize, text: &str) -> Self {
        Self {
            text: text.to_string(),
            start: index,
            end: index,
        }
    }
}

/// Every contiguous run of `min_n..=max_n` sentences, grouped by size then
/// position. A document of `k` sentences yields
/// `sum(max(0, k - n + 1))` windows.
pub fn ngram_contexts(sentences: &[String], min_n: usize, max_n: usize) -> Vec<TextUnit> {
    let min_n = min_n.max(1);
    let mut contexts = Vec::new();
    for n in min_n..=max_n {
        if n > sentences.len() {
            break;
        }
        for start in 0..=(sentences.len() - n) {
            let end = start + n - 1;
            contexts.push(TextUnit {
                text: sentences[start..=end].join(" "),
                start,
                end,
            });
        }
    }
    contexts
}

/// One unit per sentence.
pub fn sentence_units(sentences: &[String]) -> Vec<TextUnit> {
    sentences
        .iter()
        .enumerate()
        .map(|(i, s)| TextUnit::sentence(i, s))
        .collect()
}
