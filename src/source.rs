//! Page text sources.
//!
//! The engine only sees an ordered list of page strings. This module turns a
//! file on disk into that list: PDFs go through `pdf-extract`, plain-text
//! dumps are read as-is, and both are split into pages on form feeds.

use anyhow::{Context, Result};
use encoding_rs::WINDOWS_1252;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::StatementError;

const PAGE_BREAK: char = '\x0C';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Pdf,
    Text,
}

/// Text for one page, with an optional OCR alternative supplied by the
/// extraction step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub text: String,
    pub ocr: Option<String>,
}

impl PageText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ocr: None,
        }
    }

    pub fn with_ocr(mut self, ocr: impl Into<String>) -> Self {
        self.ocr = Some(ocr.into());
        self
    }
}

/// Prefer whichever of the extracted and OCR texts is longer, ignoring a
/// blank alternative
pub fn select_page_text(page: &PageText) -> &str {
    match page.ocr.as_deref() {
        Some(ocr) if !ocr.trim().is_empty() => {
            if page.text.trim().is_empty() || ocr.trim().len() > page.text.trim().len() {
                ocr
            } else {
                &page.text
            }
        }
        _ => &page.text,
    }
}

pub fn detect_input_kind(path: &Path) -> Result<InputKind, StatementError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or_else(|| {
            StatementError::UnsupportedInput(format!("{} has no extension", path.display()))
        })?;

    match extension.as_str() {
        "pdf" => Ok(InputKind::Pdf),
        "txt" => Ok(InputKind::Text),
        other => Err(StatementError::UnsupportedInput(format!(
            "{} (.{} files are not supported)",
            path.display(),
            other
        ))),
    }
}

/// UTF-8 when valid, otherwise Windows-1252 (a superset of Latin-1, which
/// older statement dumps use)
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            debug!("Input is not UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Split a document dump into pages on form feeds. A trailing form feed does
/// not start an extra page.
pub fn split_pages(text: &str) -> Vec<PageText> {
    let mut pages: Vec<&str> = text.split(PAGE_BREAK).collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages.into_iter().map(PageText::new).collect()
}

pub fn load_pages(path: &Path) -> Result<Vec<PageText>> {
    let kind = detect_input_kind(path)?;
    let text = match kind {
        InputKind::Pdf => pdf_extract::extract_text(path)
            .map_err(|e| StatementError::Extraction(format!("{}: {}", path.display(), e)))?,
        InputKind::Text => {
            let bytes = fs::read(path)
                .map_err(StatementError::from)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            decode_text(&bytes)
        }
    };

    let pages = split_pages(&text);
    info!("Loaded {} pages from {}", pages.len(), path.display());
    Ok(pages)
}

/// The page strings the engine consumes
pub fn load_document(path: &Path) -> Result<Vec<String>> {
    Ok(load_pages(path)?
        .iter()
        .map(|page| select_page_text(page).to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_select_prefers_longer_text() {
        let page = PageText::new("curto").with_ocr("texto bem mais longo");
        assert_eq!(select_page_text(&page), "texto bem mais longo");

        let page = PageText::new("texto extraido longo").with_ocr("ocr");
        assert_eq!(select_page_text(&page), "texto extraido longo");

        let page = PageText::new("   ").with_ocr("ocr");
        assert_eq!(select_page_text(&page), "ocr");

        let page = PageText::new("texto").with_ocr("  \n ");
        assert_eq!(select_page_text(&page), "texto");
    }

    #[test]
    fn test_split_pages_on_form_feed() {
        let pages = split_pages("pagina 1\x0Cpagina 2\x0C");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].text, "pagina 2");
        assert_eq!(split_pages("").len(), 1);
    }

    #[test]
    fn test_decode_latin1_fallback() {
        // "Lançamentos" in Latin-1
        let bytes = b"Lan\xe7amentos";
        assert_eq!(decode_text(bytes), "Lançamentos");
        assert_eq!(decode_text("Emissão".as_bytes()), "Emissão");
    }

    #[test]
    fn test_unsupported_extension() {
        let err = detect_input_kind(Path::new("fatura.docx")).unwrap_err();
        assert!(matches!(err, StatementError::UnsupportedInput(_)));
        assert!(detect_input_kind(Path::new("semextensao")).is_err());
        assert_eq!(
            detect_input_kind(Path::new("FATURA.PDF")).unwrap(),
            InputKind::Pdf
        );
    }

    #[test]
    fn test_load_text_document() {
        let mut file = Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "primeira\x0Csegunda").unwrap();
        let pages = load_document(file.path()).unwrap();
        assert_eq!(pages, vec!["primeira".to_string(), "segunda".to_string()]);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_pages(Path::new("/nonexistent/fatura.txt")).is_err());
    }
}
