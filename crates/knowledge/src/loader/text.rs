//! Plain-text and markdown loader.

use super::{read_bytes, DocumentLoader, DocumentType, ExtractedText};
use lexora_core::{AppError, AppResult};
use std::path::Path;

pub struct TextLoader;

impl DocumentLoader for TextLoader {
    fn document_type(&self) -> DocumentType {
        DocumentType::PlainText
    }

    fn load(&self, path: &Path) -> AppResult<Vec<ExtractedText>> {
        let bytes = read_bytes(path)?;
        let text = decode_text(&bytes)
            .map_err(|reason| AppError::Extraction(format!("{}: {}", path.display(), reason)))?;
        Ok(vec![ExtractedText::whole(text)])
    }
}

fn decode_text(bytes: &[u8]) -> Result<String, &'static str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(|_| "not valid UTF-8 text")?;

    // NUL bytes mean a binary file renamed to .txt
    if text.contains('\0') {
        return Err("looks like a binary file");
    }
    Ok(text.to_string())
}
