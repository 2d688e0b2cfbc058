//! Index manager.
//!
//! [`RagEngine`] owns the vector index for the process. The index is either
//! absent (nothing indexed yet) or loaded, and lives behind an async
//! `RwLock`: ingestion and rebuilds hold the write lock from reading the
//! current index until the new one is persisted, queries hold the read lock
//! only while retrieving.

use crate::chunk::{Chunk, ChunkPipeline};
use crate::config::EngineConfig;
use crate::embeddings::{bind_provider, BoundProvider};
use crate::loader::{DocumentType, LoaderRegistry};
use crate::progress::ProgressReporter;
use crate::rag::{RagAnswer, RagPipeline, StreamingAnswer};
use crate::store::{DocumentStore, StoredDocument};
use crate::types::{
    IndexOutcome, IndexStats, IndexStatus, IndexedFile, ReindexReport, SkippedFile,
};
use crate::vector_index::{self, VectorIndex};
use lexora_core::{AppConfig, AppError, AppResult};
use lexora_llm::{create_client, LlmClient, LlmSettings};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

const NO_TEXT_REASON: &str = "No text could be extracted";

enum IndexState {
    Absent,
    Loaded(VectorIndex),
}

impl IndexState {
    fn status(&self) -> IndexStatus {
        match self {
            Self::Absent => IndexStatus::Absent,
            Self::Loaded(_) => IndexStatus::Loaded,
        }
    }
}

pub struct RagEngine {
    config: EngineConfig,
    store: DocumentStore,
    loaders: LoaderRegistry,
    chunker: ChunkPipeline,
    embedder: BoundProvider,
    pipeline: RagPipeline,
    progress: ProgressReporter,
    state: RwLock<IndexState>,
    /// Documents whose last rebuild produced no chunks. Written only under
    /// the state write lock.
    unusable_corpus: Mutex<Option<Vec<StoredDocument>>>,
}

impl RagEngine {
    /// Build an engine around already-bound providers. The index starts
    /// absent; call [`RagEngine::init`] to load it.
    pub fn new(
        config: EngineConfig,
        embedder: BoundProvider,
        llm: Arc<dyn LlmClient>,
    ) -> AppResult<Self> {
        config.validate()?;

        Ok(Self {
            store: DocumentStore::new(&config.documents_dir),
            loaders: LoaderRegistry::default(),
            chunker: ChunkPipeline::new(config.chunking)?,
            pipeline: RagPipeline::new(llm, config.model.clone(), config.top_k),
            progress: ProgressReporter::noop(),
            state: RwLock::new(IndexState::Absent),
            unusable_corpus: Mutex::new(None),
            embedder,
            config,
        })
    }

    /// Bind the configured embedding chain and generation client.
    pub async fn from_app_config(app: &AppConfig) -> AppResult<Self> {
        let embedder = bind_provider(&app.embeddings, &app.llm_endpoint).await?;
        let llm = create_client(&LlmSettings::from_app_config(app))?;
        Self::new(EngineConfig::from_app_config(app), embedder, llm)
    }

    pub fn with_loaders(mut self, loaders: LoaderRegistry) -> Self {
        self.loaders = loaders;
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn embedder(&self) -> &BoundProvider {
        &self.embedder
    }

    pub async fn status(&self) -> IndexStatus {
        self.state.read().await.status()
    }

    /// Load the persisted index, rebuilding it when it cannot be used.
    ///
    /// A missing, corrupt, or differently-embedded index is rebuilt from the
    /// documents directory. With no documents the engine stays absent.
    #[instrument(skip(self), fields(index_dir = %self.config.index_dir.display()))]
    pub async fn init(&self) -> AppResult<IndexStatus> {
        let mut state = self.state.write().await;

        match self.load_persisted() {
            Ok(index) if !index.is_empty() => {
                info!(records = index.len(), "Index loaded");
                *state = IndexState::Loaded(index);
            }
            Ok(_) => {
                if self.store.has_documents()? {
                    warn!("Persisted index is empty but documents exist; rebuilding");
                    self.rebuild_locked(&mut state).await?;
                } else {
                    *state = IndexState::Absent;
                }
            }
            Err(AppError::IndexLoad(reason)) => {
                if self.store.has_documents()? {
                    warn!("Cannot use persisted index ({}); rebuilding", reason);
                    self.rebuild_locked(&mut state).await?;
                } else {
                    debug!("No usable index and no documents: {}", reason);
                    *state = IndexState::Absent;
                }
            }
            Err(e) => return Err(e),
        }

        Ok(state.status())
    }

    fn load_persisted(&self) -> AppResult<VectorIndex> {
        let index = VectorIndex::load(&self.config.index_dir)?;
        let bound = self.embedder.provider.space();

        if let Some(reason) = index.embedding_space().mismatch(&bound) {
            return Err(AppError::IndexLoad(format!(
                "Embedding space changed ({}); index was built with {}",
                reason,
                index.embedding_space()
            )));
        }
        Ok(index)
    }

    /// Add one document to the index.
    ///
    /// Extraction failures skip the file without touching the index. A file
    /// whose name is already indexed is a replacement, so the whole index is
    /// rebuilt to drop the old version's chunks.
    ///
    /// # Errors
    /// `UnsupportedFileType` before any work is done; `Embedding` if the
    /// provider fails (the index is unchanged); `Index` if persisting fails
    /// and the recovery rebuild fails too.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn index_file(&self, path: &Path) -> AppResult<IndexOutcome> {
        DocumentType::detect(path)?;
        if !self.loaders.supports(path) {
            return Err(AppError::UnsupportedFileType(display_name(path)));
        }
        let source = display_name(path);

        let mut state = self.state.write().await;

        if let IndexState::Loaded(index) = &*state {
            if index.contains_source(&source) {
                info!(source = %source, "Document already indexed; rebuilding to replace it");
                let report = self.rebuild_locked(&mut state).await?;
                return Ok(IndexOutcome::Rebuilt { source, report });
            }
        }

        let chunks = match self.extract_and_chunk(path, &source).await {
            Ok(chunks) if chunks.is_empty() => {
                warn!(source = %source, "{}; skipping", NO_TEXT_REASON);
                return Ok(IndexOutcome::Skipped {
                    source,
                    reason: NO_TEXT_REASON.to_string(),
                });
            }
            Ok(chunks) => chunks,
            Err(e) if e.is_per_file() => {
                warn!(source = %source, "Skipping document: {}", e);
                return Ok(IndexOutcome::Skipped {
                    source,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };
        let added = chunks.len();

        let saved = if let IndexState::Loaded(index) = &mut *state {
            let before = index.len();
            index.add(&self.embedder, chunks).await?;
            match index.save(&self.config.index_dir) {
                Ok(()) => Ok(()),
                Err(e) => {
                    index.truncate(before);
                    Err(e)
                }
            }
        } else {
            let index = VectorIndex::create(&self.embedder, chunks).await?;
            let saved = index.save(&self.config.index_dir);
            if saved.is_ok() {
                *state = IndexState::Loaded(index);
            }
            saved
        };

        if let Err(e) = saved {
            warn!(source = %source, "Failed to persist index ({}); rebuilding", e);
            let report = self.rebuild_locked(&mut state).await?;
            return Ok(IndexOutcome::Rebuilt { source, report });
        }

        let total_records = match &*state {
            IndexState::Loaded(index) => index.len(),
            IndexState::Absent => 0,
        };
        info!(source = %source, chunks = added, total_records, "Indexed document");

        Ok(IndexOutcome::Indexed {
            source,
            chunks: added,
            total_records,
        })
    }

    /// Rebuild the index from every document in the documents directory.
    pub async fn reindex_all(&self) -> AppResult<ReindexReport> {
        let mut state = self.state.write().await;
        self.rebuild_locked(&mut state).await
    }

    /// Copy a file into the documents directory and index it.
    pub async fn upload(&self, path: &Path) -> AppResult<IndexOutcome> {
        if !self.loaders.supports(path) {
            return Err(AppError::UnsupportedFileType(display_name(path)));
        }
        let stored = self.store.save_from(path)?;
        self.index_file(&stored.path).await
    }

    /// Delete a document and rebuild the index without it.
    pub async fn remove_document(&self, name: &str) -> AppResult<ReindexReport> {
        self.store.remove(name)?;
        self.reindex_all().await
    }

    #[instrument(skip(self, state), fields(documents_dir = %self.config.documents_dir.display()))]
    async fn rebuild_locked(&self, state: &mut IndexState) -> AppResult<ReindexReport> {
        let start = Instant::now();
        let documents = self.store.list()?;
        let total = documents.len() as u64;
        self.progress
            .discover(total, &self.config.documents_dir.display().to_string());

        let mut corpus: Vec<Chunk> = Vec::new();
        let mut indexed = Vec::new();
        let mut skipped = Vec::new();

        for (i, document) in documents.iter().enumerate() {
            let current = i as u64 + 1;
            self.progress.extract(current, total, &document.name);

            match self.extract_and_chunk(&document.path, &document.name).await {
                Ok(chunks) if chunks.is_empty() => {
                    warn!(source = %document.name, "{}; skipping", NO_TEXT_REASON);
                    skipped.push(SkippedFile {
                        source: document.name.clone(),
                        reason: NO_TEXT_REASON.to_string(),
                    });
                }
                Ok(chunks) => {
                    self.progress
                        .chunk(current, total, &document.name, chunks.len());
                    indexed.push(IndexedFile {
                        source: document.name.clone(),
                        chunks: chunks.len(),
                    });
                    corpus.extend(chunks);
                }
                Err(e) if e.is_per_file() => {
                    warn!(source = %document.name, "Skipping document: {}", e);
                    skipped.push(SkippedFile {
                        source: document.name.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let records = if corpus.is_empty() {
            vector_index::remove_persisted(&self.config.index_dir)?;
            *state = IndexState::Absent;
            self.remember_unusable((!documents.is_empty()).then(|| documents.clone()));
            0
        } else {
            self.remember_unusable(None);
            self.progress
                .embed(corpus.len() as u64, &self.embedder.provider.space().to_string());
            let index = VectorIndex::create(&self.embedder, corpus).await?;

            self.progress
                .persist(index.len() as u64, &self.config.index_dir.display().to_string());
            index.save(&self.config.index_dir)?;

            let records = index.len();
            *state = IndexState::Loaded(index);
            records
        };

        let report = ReindexReport {
            documents: documents.len(),
            indexed,
            skipped,
            records,
            duration_secs: start.elapsed().as_secs_f64(),
        };

        info!(
            documents = report.documents,
            indexed = report.indexed.len(),
            skipped = report.skipped.len(),
            records = report.records,
            "Rebuilt index in {:.2}s",
            report.duration_secs
        );

        Ok(report)
    }

    async fn extract_and_chunk(&self, path: &Path, source: &str) -> AppResult<Vec<Chunk>> {
        let (document_type, segments) = self.loaders.load(path).await?;
        Ok(self.chunker.split_document(source, document_type, &segments))
    }

    /// Answer a question from the indexed documents.
    ///
    /// # Errors
    /// `EmptyQuestion` for a blank question, before any other work.
    #[instrument(skip(self, question))]
    pub async fn query(&self, question: &str) -> AppResult<RagAnswer> {
        let question = validate_question(question)?;
        self.ensure_fresh().await?;

        let retrieval = {
            let state = self.state.read().await;
            match &*state {
                IndexState::Absent => return Ok(RagAnswer::no_documents()),
                IndexState::Loaded(index) => {
                    self.pipeline.retrieve(question, index, &self.embedder).await?
                }
            }
        };

        self.pipeline.generate(retrieval).await
    }

    /// Like [`RagEngine::query`], but the answer arrives as fragments.
    #[instrument(skip(self, question))]
    pub async fn stream_query(&self, question: &str) -> AppResult<StreamingAnswer> {
        let question = validate_question(question)?;
        self.ensure_fresh().await?;

        let retrieval = {
            let state = self.state.read().await;
            match &*state {
                IndexState::Absent => return Ok(StreamingAnswer::no_documents()),
                IndexState::Loaded(index) => {
                    self.pipeline.retrieve(question, index, &self.embedder).await?
                }
            }
        };

        self.pipeline.generate_stream(retrieval).await
    }

    /// Rebuild when documents exist but the index has nothing for them.
    /// Checked again under the write lock so concurrent callers rebuild once.
    async fn ensure_fresh(&self) -> AppResult<()> {
        {
            let state = self.state.read().await;
            if !self.is_drifted(&state)? {
                return Ok(());
            }
        }

        let mut state = self.state.write().await;
        if self.is_drifted(&state)? {
            info!("Index is missing documents on storage; rebuilding before answering");
            self.rebuild_locked(&mut state).await?;
        }
        Ok(())
    }

    fn is_drifted(&self, state: &IndexState) -> AppResult<bool> {
        if let IndexState::Loaded(index) = state {
            if !index.is_empty() {
                return Ok(false);
            }
        }

        let documents = self.store.list()?;
        if documents.is_empty() {
            return Ok(false);
        }
        if self.lock_unusable().as_deref() == Some(documents.as_slice()) {
            debug!(
                documents = documents.len(),
                "Documents on storage yielded no text last time; not rebuilding"
            );
            return Ok(false);
        }
        Ok(true)
    }

    fn remember_unusable(&self, documents: Option<Vec<StoredDocument>>) {
        *self.lock_unusable() = documents;
    }

    fn lock_unusable(&self) -> std::sync::MutexGuard<'_, Option<Vec<StoredDocument>>> {
        self.unusable_corpus
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn stats(&self) -> AppResult<IndexStats> {
        let state = self.state.read().await;
        let (records, indexed_sources) = match &*state {
            IndexState::Absent => (0, Vec::new()),
            IndexState::Loaded(index) => (index.len(), index.sources().into_iter().collect()),
        };

        let saved_at = match &*state {
            IndexState::Loaded(_) => vector_index::read_manifest(&self.config.index_dir)
                .ok()
                .map(|m| m.saved_at),
            IndexState::Absent => None,
        };

        Ok(IndexStats {
            status: state.status(),
            records,
            indexed_sources,
            documents_on_storage: self.store.list()?.len(),
            embedding_space: self.embedder.provider.space(),
            documents_dir: self.config.documents_dir.clone(),
            index_dir: self.config.index_dir.clone(),
            saved_at,
        })
    }
}

fn validate_question(question: &str) -> AppResult<&str> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(AppError::EmptyQuestion);
    }
    Ok(trimmed)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
