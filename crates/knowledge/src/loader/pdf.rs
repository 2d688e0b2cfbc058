//! PDF loader backed by `pdf-extract`.

use super::{read_bytes, DocumentLoader, DocumentType, ExtractedText};
use lexora_core::{AppError, AppResult};
use std::path::Path;

pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn document_type(&self) -> DocumentType {
        DocumentType::Pdf
    }

    /// One segment per page. Blank pages are dropped but keep their number
    /// so later pages are still labelled correctly.
    fn load(&self, path: &Path) -> AppResult<Vec<ExtractedText>> {
        let bytes = read_bytes(path)?;
        let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| {
            AppError::Extraction(format!("PDF extraction failed for {}: {}", path.display(), e))
        })?;

        Ok(pages
            .into_iter()
            .zip(1u32..)
            .filter(|(text, _)| !text.trim().is_empty())
            .map(|(text, number)| ExtractedText::page(text, number))
            .collect())
    }
}
