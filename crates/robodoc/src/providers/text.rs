//! Text extraction from uploaded source files

use async_trait::async_trait;
use std::path::Path;

use crate::error::{Error, Result};

/// Reads the text content of a source file
///
/// A missing or unreadable file is an `Error::Input`. Returning an empty
/// string is allowed; the caller decides whether that is acceptable.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, path: &Path) -> Result<String>;
}

/// Extracts text from PDFs with pdf-extract; other files are read as UTF-8
#[derive(Debug, Clone, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }

    fn is_pdf(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract_text(&self, path: &Path) -> Result<String> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            Error::input(format!("Cannot read source file {}: {}", path.display(), e))
        })?;

        if !Self::is_pdf(path) {
            return Ok(String::from_utf8_lossy(&data).into_owned());
        }

        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
            .await
            .map_err(|e| Error::input(format!("PDF parser crashed on {}: {}", path.display(), e)))?
            .map_err(|e| {
                Error::input(format!("Failed to extract text from {}: {}", path.display(), e))
            })?;

        Ok(cleanup_pdf_text(&text))
    }
}

/// Normalize characters pdf-extract commonly leaves behind
fn cleanup_pdf_text(text: &str) -> String {
    text.replace('\0', "")
        .replace('\u{00A0}', " ")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{2013}', "-")
        .replace('\u{2019}', "'")
}
