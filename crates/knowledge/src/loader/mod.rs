//! Document loaders.
//!
//! Each supported file type is a [`DocumentType`] tag mapped to a
//! [`DocumentLoader`] in the [`LoaderRegistry`]. Supporting a new format means
//! registering another loader, not editing the callers.

mod docx;
mod pdf;
mod text;

pub use docx::{extract_plaintext_from_docx_xml, DocxLoader};
pub use pdf::PdfLoader;
pub use text::TextLoader;

use lexora_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Normalized document type tag, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentType {
    pub const ALL: [DocumentType; 3] = [Self::Pdf, Self::Docx, Self::PlainText];

    /// Map an extension (case-insensitive, without the dot) to a type.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" | "text" | "md" | "markdown" => Some(Self::PlainText),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Like [`DocumentType::from_path`], but unsupported files are an error.
    pub fn detect(path: &Path) -> AppResult<Self> {
        Self::from_path(path).ok_or_else(|| {
            AppError::UnsupportedFileType(
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
            )
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::PlainText => "plain-text",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted segment of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    /// 1-based page number, when the format has pages
    pub page: Option<u32>,
}

impl ExtractedText {
    pub fn whole(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            page: None,
        }
    }

    pub fn page(text: impl Into<String>, page: u32) -> Self {
        Self {
            text: text.into(),
            page: Some(page),
        }
    }
}

/// Extracts text from one document type.
///
/// Implementations are synchronous; the registry runs them on the blocking
/// pool. A missing file is `DocumentNotFound`, unreadable content is
/// `Extraction`.
pub trait DocumentLoader: Send + Sync {
    fn document_type(&self) -> DocumentType;

    fn load(&self, path: &Path) -> AppResult<Vec<ExtractedText>>;
}

/// Read a file, distinguishing "not there" from other I/O failures.
pub(crate) fn read_bytes(path: &Path) -> AppResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AppError::DocumentNotFound(path.to_path_buf()),
        _ => AppError::Extraction(format!("Failed to read {}: {}", path.display(), e)),
    })
}

/// Loaders keyed by document type.
#[derive(Clone)]
pub struct LoaderRegistry {
    loaders: HashMap<DocumentType, Arc<dyn DocumentLoader>>,
}

impl LoaderRegistry {
    pub fn empty() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }

    pub fn register(&mut self, loader: Arc<dyn DocumentLoader>) {
        self.loaders.insert(loader.document_type(), loader);
    }

    pub fn get(&self, doc_type: DocumentType) -> Option<Arc<dyn DocumentLoader>> {
        self.loaders.get(&doc_type).cloned()
    }

    pub fn supports(&self, path: &Path) -> bool {
        DocumentType::from_path(path).is_some_and(|t| self.loaders.contains_key(&t))
    }

    /// Load a document on the blocking pool.
    ///
    /// A loader that panics on malformed input is reported as an
    /// `Extraction` error for that file.
    pub async fn load(&self, path: &Path) -> AppResult<(DocumentType, Vec<ExtractedText>)> {
        let doc_type = DocumentType::detect(path)?;
        let loader = self
            .get(doc_type)
            .ok_or_else(|| AppError::UnsupportedFileType(doc_type.to_string()))?;

        let owned: PathBuf = path.to_path_buf();
        let segments = tokio::task::spawn_blocking(move || loader.load(&owned))
            .await
            .map_err(|e| {
                AppError::Extraction(format!("Loader for {} failed: {}", path.display(), e))
            })??;

        tracing::debug!(
            path = %path.display(),
            doc_type = %doc_type,
            segments = segments.len(),
            "Extracted document"
        );

        Ok((doc_type, segments))
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(PdfLoader));
        registry.register(Arc::new(DocxLoader));
        registry.register(Arc::new(TextLoader));
        registry
    }
}
