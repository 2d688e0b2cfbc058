//! The documents directory.
//!
//! Documents are plain files identified by their bare filename. Uploading a
//! file with an existing name overwrites it.

use crate::loader::DocumentType;
use chrono::{DateTime, Utc};
use lexora_core::{AppError, AppResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDocument {
    pub name: String,
    pub path: PathBuf,
    pub document_type: DocumentType,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> AppResult<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Supported documents, sorted by name. A missing directory holds none.
    pub fn list(&self) -> AppResult<Vec<StoredDocument>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        for entry in WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                AppError::Io(std::io::Error::other(format!(
                    "Failed to read {}: {}",
                    self.dir.display(),
                    e
                )))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            // Hidden files include our own partial uploads.
            if name.starts_with('.') {
                continue;
            }
            let Some(document_type) = DocumentType::from_path(entry.path()) else {
                tracing::debug!(file = %name, "Ignoring unsupported file");
                continue;
            };

            let metadata = entry.metadata().ok();
            documents.push(StoredDocument {
                name,
                path: entry.path().to_path_buf(),
                document_type,
                size_bytes: metadata.as_ref().map(|m| m.len()).unwrap_or(0),
                modified: metadata
                    .and_then(|m| m.modified().ok())
                    .map(DateTime::<Utc>::from),
            });
        }

        Ok(documents)
    }

    pub fn has_documents(&self) -> AppResult<bool> {
        Ok(!self.list()?.is_empty())
    }

    /// Copy a file into the store under its bare filename.
    ///
    /// # Errors
    /// `UnsupportedFileType` before anything is copied; `DocumentNotFound`
    /// if `source` does not exist.
    pub fn save_from(&self, source: &Path) -> AppResult<StoredDocument> {
        let name = bare_name(source)?;
        let document_type = DocumentType::detect(Path::new(&name))?;

        if !source.is_file() {
            return Err(AppError::DocumentNotFound(source.to_path_buf()));
        }

        self.ensure_dir()?;
        let target = self.dir.join(&name);
        let partial = self.dir.join(format!(".{}.upload-{}", name, uuid::Uuid::new_v4()));

        if let Err(e) = fs::copy(source, &partial).and_then(|_| fs::rename(&partial, &target)) {
            let _ = fs::remove_file(&partial);
            return Err(e.into());
        }

        let metadata = fs::metadata(&target)?;
        tracing::info!(document = %name, bytes = metadata.len(), "Stored document");

        Ok(StoredDocument {
            name,
            path: target,
            document_type,
            size_bytes: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    /// Delete a document by name.
    pub fn remove(&self, name: &str) -> AppResult<()> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(document = %name, "Removed document");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::DocumentNotFound(path))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.path_for(name).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Where a document of this name lives. Path components are stripped.
    pub fn path_for(&self, name: &str) -> AppResult<PathBuf> {
        Ok(self.dir.join(bare_name(Path::new(name))?))
    }
}

fn bare_name(path: &Path) -> AppResult<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.starts_with('.'))
        .ok_or_else(|| AppError::DocumentNotFound(path.to_path_buf()))
}
