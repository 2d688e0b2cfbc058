//! DOCX loader.
//!
//! A .docx file is a zip archive; the body text lives in `word/document.xml`
//! as `<w:t>` runs grouped into `<w:p>` paragraphs.

use super::{read_bytes, DocumentLoader, DocumentType, ExtractedText};
use lexora_core::{AppError, AppResult};
use std::io::{Cursor, Read};
use std::path::Path;

const DOCUMENT_XML: &str = "word/document.xml";

pub struct DocxLoader;

impl DocumentLoader for DocxLoader {
    fn document_type(&self) -> DocumentType {
        DocumentType::Docx
    }

    fn load(&self, path: &Path) -> AppResult<Vec<ExtractedText>> {
        let bytes = read_bytes(path)?;
        let fail = |reason: String| AppError::Extraction(format!("{}: {}", path.display(), reason));

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| fail(format!("Invalid docx archive: {}", e)))?;
        let mut entry = archive
            .by_name(DOCUMENT_XML)
            .map_err(|e| fail(format!("Missing {}: {}", DOCUMENT_XML, e)))?;

        let mut xml = String::new();
        entry
            .read_to_string(&mut xml)
            .map_err(|e| fail(format!("Unreadable {}: {}", DOCUMENT_XML, e)))?;

        Ok(vec![ExtractedText::whole(extract_plaintext_from_docx_xml(&xml))])
    }
}

/// Pull the visible text out of a WordprocessingML body.
///
/// Paragraph ends become newlines, `<w:tab/>` a tab, `<w:br/>` and `<w:cr/>`
/// line breaks. Everything outside `<w:t>` elements is ignored.
pub fn extract_plaintext_from_docx_xml(xml: &str) -> String {
    let mut out = String::new();
    let mut in_text = false;
    let mut rest = xml;

    while let Some(open) = rest.find('<') {
        if in_text {
            out.push_str(&unescape_xml(&rest[..open]));
        }
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        let tag = &rest[open + 1..open + close];
        rest = &rest[open + close + 1..];

        let closing = tag.starts_with('/');
        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("");

        match (name, closing) {
            ("w:t", false) => in_text = !self_closing,
            ("w:t", true) => in_text = false,
            ("w:p", true) => out.push('\n'),
            ("w:tab", false) => out.push('\t'),
            ("w:br", false) | ("w:cr", false) => out.push('\n'),
            _ => {}
        }
    }

    out.trim_end().to_string()
}

fn unescape_xml(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp..];
        match after.find(';').and_then(|semi| decode_entity(&after[1..semi]).map(|c| (c, semi))) {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}
