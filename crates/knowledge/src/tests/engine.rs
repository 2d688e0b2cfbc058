//! Index manager scenarios against scripted providers.

use super::fakes::{bound, CountingEmbedder, ScriptedLlm};
use crate::config::EngineConfig;
use crate::loader::{LoaderRegistry, TextLoader};
use crate::progress::{ProgressEvent, ProgressPhase, ProgressReporter};
use crate::types::{IndexOutcome, IndexStatus};
use crate::vector_index::{self, VectorIndex};
use crate::RagEngine;
use futures::StreamExt;
use lexora_core::{AppConfig, AppError};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const LEXORA_NOTES: &str = "Lexora is a RAG system. It answers questions from documents.";

struct Harness {
    _temp: TempDir,
    config: EngineConfig,
    embedder: Arc<CountingEmbedder>,
    llm: Arc<ScriptedLlm>,
    engine: RagEngine,
}

impl Harness {
    fn new() -> Self {
        Self::with_dimensions(256)
    }

    fn with_dimensions(dimensions: usize) -> Self {
        let temp = TempDir::new().unwrap();
        let config = EngineConfig::in_dir(temp.path(), "mistral");
        Self::build(temp, config, dimensions)
    }

    fn build(temp: TempDir, config: EngineConfig, dimensions: usize) -> Self {
        let embedder = Arc::new(CountingEmbedder::new(dimensions));
        let llm = Arc::new(ScriptedLlm::new("Lexora is a RAG system."));
        let engine = RagEngine::new(config.clone(), bound(embedder.clone()), llm.clone()).unwrap();
        Self {
            _temp: temp,
            config,
            embedder,
            llm,
            engine,
        }
    }

    /// A second engine over the same directories, as after a restart.
    fn restart(self, dimensions: usize) -> Self {
        let Harness { _temp, config, .. } = self;
        Self::build(_temp, config, dimensions)
    }

    fn write_document(&self, name: &str, content: &[u8]) -> PathBuf {
        fs::create_dir_all(&self.config.documents_dir).unwrap();
        let path = self.config.documents_dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn upload_source(&self, name: &str, content: &str) -> PathBuf {
        let dir = self._temp.path().join("incoming");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }
}

#[tokio::test]
async fn test_lexora_notes_scenario() {
    let h = Harness::new();
    let path = h.write_document("notes.txt", LEXORA_NOTES.as_bytes());

    let outcome = h.engine.index_file(&path).await.unwrap();
    assert_eq!(
        outcome,
        IndexOutcome::Indexed {
            source: "notes.txt".to_string(),
            chunks: 1,
            total_records: 1,
        }
    );

    let answer = h.engine.query("What is Lexora?").await.unwrap();
    assert!(answer.answer.contains("RAG"));
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].source, "notes.txt");
    assert!(h.llm.last_prompt().unwrap().contains(LEXORA_NOTES));

    let stats = h.engine.stats().await.unwrap();
    assert_eq!(stats.status, IndexStatus::Loaded);
    assert_eq!(stats.records, 1);
    assert_eq!(stats.indexed_sources, vec!["notes.txt".to_string()]);
    assert!(stats.saved_at.is_some());
}

#[tokio::test]
async fn test_empty_question_rejected_without_provider_calls() {
    let h = Harness::new();
    h.write_document("notes.txt", LEXORA_NOTES.as_bytes());

    for question in ["", "   \n\t"] {
        assert!(matches!(h.engine.query(question).await, Err(AppError::EmptyQuestion)));
        assert!(matches!(
            h.engine.stream_query(question).await,
            Err(AppError::EmptyQuestion)
        ));
    }

    assert_eq!(h.embedder.calls(), 0);
    assert_eq!(h.llm.calls(), 0);
    assert_eq!(h.engine.status().await, IndexStatus::Absent);
}

#[tokio::test]
async fn test_init_without_documents_stays_absent() {
    let h = Harness::new();

    assert_eq!(h.engine.init().await.unwrap(), IndexStatus::Absent);

    let answer = h.engine.query("Anything?").await.unwrap();
    assert!(answer.is_no_documents());
    assert_eq!(h.embedder.calls(), 0);
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn test_drift_recovery_on_first_query() {
    let h = Harness::new();
    h.engine.init().await.unwrap();

    // Documents appear without going through the engine.
    h.write_document("notes.txt", LEXORA_NOTES.as_bytes());

    let answer = h.engine.query("What is Lexora?").await.unwrap();
    assert!(!answer.is_no_documents());
    assert_eq!(answer.sources[0].source, "notes.txt");
    assert!(VectorIndex::load(&h.config.index_dir).is_ok());
}

#[tokio::test]
async fn test_concurrent_queries_rebuild_once() {
    let h = Harness::new();
    h.write_document("notes.txt", LEXORA_NOTES.as_bytes());

    let (a, b) = tokio::join!(
        h.engine.query("What is Lexora?"),
        h.engine.query("What does it answer?")
    );
    a.unwrap();
    b.unwrap();

    // One batch for the rebuild, one embedding per question.
    assert_eq!(h.embedder.calls(), 3);
}

#[tokio::test]
async fn test_init_loads_persisted_index_without_embedding() {
    let h = Harness::new();
    let path = h.write_document("notes.txt", LEXORA_NOTES.as_bytes());
    h.engine.index_file(&path).await.unwrap();
    let before = h.engine.query("What is Lexora?").await.unwrap();

    let h = h.restart(256);
    assert_eq!(h.engine.init().await.unwrap(), IndexStatus::Loaded);
    assert_eq!(h.embedder.calls(), 0);

    let after = h.engine.query("What is Lexora?").await.unwrap();
    assert_eq!(before.sources, after.sources);
}

#[tokio::test]
async fn test_corrupt_index_is_rebuilt_on_init() {
    let h = Harness::new();
    let path = h.write_document("notes.txt", LEXORA_NOTES.as_bytes());
    h.engine.index_file(&path).await.unwrap();

    fs::write(h.config.index_dir.join(vector_index::DATABASE_FILE), "{ truncated").unwrap();

    let h = h.restart(256);
    assert_eq!(h.engine.init().await.unwrap(), IndexStatus::Loaded);
    assert_eq!(h.embedder.calls(), 1);
    assert_eq!(VectorIndex::load(&h.config.index_dir).unwrap().len(), 1);
}

#[tokio::test]
async fn test_embedding_space_change_triggers_rebuild() {
    let h = Harness::with_dimensions(64);
    let path = h.write_document("notes.txt", LEXORA_NOTES.as_bytes());
    h.engine.index_file(&path).await.unwrap();

    let h = h.restart(128);
    assert_eq!(h.engine.init().await.unwrap(), IndexStatus::Loaded);
    assert_eq!(h.embedder.calls(), 1);

    let manifest = vector_index::read_manifest(&h.config.index_dir).unwrap();
    assert_eq!(manifest.space.dimensions, 128);
    assert!(!h.engine.query("What is Lexora?").await.unwrap().is_no_documents());
}

#[tokio::test]
async fn test_reindex_skips_broken_files() {
    let h = Harness::new();
    h.write_document("good.txt", LEXORA_NOTES.as_bytes());
    h.write_document("broken.pdf", b"not a pdf at all");
    h.write_document("broken.docx", b"not a zip archive");
    h.write_document("empty.md", b"   \n");
    h.write_document("ignored.png", &[0u8, 1, 2, 3]);

    let report = h.engine.reindex_all().await.unwrap();

    assert_eq!(report.documents, 4);
    assert_eq!(report.indexed.len(), 1);
    assert_eq!(report.indexed[0].source, "good.txt");
    let skipped: Vec<&str> = report.skipped.iter().map(|s| s.source.as_str()).collect();
    assert_eq!(skipped, vec!["broken.docx", "broken.pdf", "empty.md"]);
    assert_eq!(report.records, 1);

    let answer = h.engine.query("What is Lexora?").await.unwrap();
    assert_eq!(answer.sources[0].source, "good.txt");
}

#[tokio::test]
async fn test_reindex_with_no_usable_text_removes_index() {
    let h = Harness::new();
    let path = h.write_document("notes.txt", LEXORA_NOTES.as_bytes());
    h.engine.index_file(&path).await.unwrap();
    assert!(h.config.index_dir.exists());

    fs::remove_file(&path).unwrap();
    h.write_document("broken.pdf", b"not a pdf at all");

    let report = h.engine.reindex_all().await.unwrap();
    assert_eq!(report.records, 0);
    assert_eq!(report.status(), IndexStatus::Absent);
    assert_eq!(h.engine.status().await, IndexStatus::Absent);
    assert!(!h.config.index_dir.exists());
}

#[tokio::test]
async fn test_incremental_indexing_matches_full_rebuild() {
    let docs = [
        ("a.txt", "Rust has ownership and borrowing. ".repeat(30)),
        ("b.md", "Tokio is an async runtime.\n\nIt schedules tasks.".to_string()),
    ];

    let incremental = Harness::new();
    for (name, content) in &docs {
        let path = incremental.write_document(name, content.as_bytes());
        incremental.engine.index_file(&path).await.unwrap();
    }

    let full = Harness::new();
    for (name, content) in &docs {
        full.write_document(name, content.as_bytes());
    }
    full.engine.reindex_all().await.unwrap();

    let a = VectorIndex::load(&incremental.config.index_dir).unwrap();
    let b = VectorIndex::load(&full.config.index_dir).unwrap();
    assert_eq!(a, b);
    assert!(a.len() > 2);
}

#[tokio::test]
async fn test_append_does_not_reembed_existing_chunks() {
    let h = Harness::new();
    let first = h.write_document("a.txt", b"First document about gardening.");
    let second = h.write_document("b.txt", b"Second document about cooking.");

    h.engine.index_file(&first).await.unwrap();
    assert_eq!(h.embedder.calls(), 1);
    h.engine.index_file(&second).await.unwrap();
    assert_eq!(h.embedder.calls(), 2);
}

#[tokio::test]
async fn test_unsupported_file_rejected_before_processing() {
    let h = Harness::new();
    let path = h.write_document("photo.jpg", &[0xFF, 0xD8, 0xFF]);

    let result = h.engine.index_file(&path).await;
    assert!(matches!(result, Err(AppError::UnsupportedFileType(name)) if name == "photo.jpg"));
    assert_eq!(h.embedder.calls(), 0);
}

#[tokio::test]
async fn test_loader_registry_decides_supported_types() {
    let temp = TempDir::new().unwrap();
    let config = EngineConfig::in_dir(temp.path(), "mistral");
    let embedder = Arc::new(CountingEmbedder::new(64));
    let mut loaders = LoaderRegistry::empty();
    loaders.register(Arc::new(TextLoader));
    let engine = RagEngine::new(config.clone(), bound(embedder.clone()), Arc::new(ScriptedLlm::new("ok")))
        .unwrap()
        .with_loaders(loaders);

    fs::create_dir_all(&config.documents_dir).unwrap();
    let pdf = config.documents_dir.join("report.pdf");
    fs::write(&pdf, b"%PDF-1.4").unwrap();
    let result = engine.index_file(&pdf).await;
    assert!(matches!(result, Err(AppError::UnsupportedFileType(name)) if name == "report.pdf"));
    assert_eq!(embedder.calls(), 0);

    let notes = config.documents_dir.join("notes.txt");
    fs::write(&notes, LEXORA_NOTES).unwrap();
    assert!(!engine.index_file(&notes).await.unwrap().is_skipped());
}

#[tokio::test]
async fn test_extraction_failure_skips_without_mutation() {
    let h = Harness::new();
    let good = h.write_document("notes.txt", LEXORA_NOTES.as_bytes());
    h.engine.index_file(&good).await.unwrap();
    let before = VectorIndex::load(&h.config.index_dir).unwrap();

    let broken = h.write_document("broken.pdf", b"not a pdf at all");
    let outcome = h.engine.index_file(&broken).await.unwrap();

    assert!(outcome.is_skipped());
    assert_eq!(outcome.source(), "broken.pdf");
    assert_eq!(VectorIndex::load(&h.config.index_dir).unwrap(), before);
    assert_eq!(h.engine.stats().await.unwrap().records, 1);
}

#[tokio::test]
async fn test_embedding_failure_leaves_index_untouched() {
    let h = Harness::new();
    let first = h.write_document("a.txt", LEXORA_NOTES.as_bytes());
    h.engine.index_file(&first).await.unwrap();

    h.embedder.set_failing(true);
    let second = h.write_document("b.txt", b"Another document.");
    let result = h.engine.index_file(&second).await;

    assert!(matches!(result, Err(AppError::Embedding(_))));
    let stats = h.engine.stats().await.unwrap();
    assert_eq!(stats.records, 1);
    assert_eq!(stats.indexed_sources, vec!["a.txt".to_string()]);
}

#[tokio::test]
async fn test_query_surfaces_embedding_failure() {
    let h = Harness::new();
    let path = h.write_document("notes.txt", LEXORA_NOTES.as_bytes());
    h.engine.index_file(&path).await.unwrap();

    h.embedder.set_failing(true);
    assert!(matches!(
        h.engine.query("What is Lexora?").await,
        Err(AppError::Embedding(_))
    ));
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn test_persist_failure_leaves_engine_absent() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("blocker");
    fs::write(&blocker, "a file where a directory should be").unwrap();

    let mut config = EngineConfig::in_dir(temp.path(), "mistral");
    config.index_dir = blocker.join("index");
    let h = Harness::build(temp, config, 64);
    let path = h.write_document("notes.txt", LEXORA_NOTES.as_bytes());

    let result = h.engine.index_file(&path).await;
    assert!(matches!(result, Err(AppError::Index(_))));
    assert_eq!(h.engine.status().await, IndexStatus::Absent);
}

#[tokio::test]
async fn test_persist_failure_on_append_rolls_back() {
    let temp = TempDir::new().unwrap();
    let state_dir = temp.path().join("state");
    let mut config = EngineConfig::in_dir(temp.path(), "mistral");
    config.index_dir = state_dir.join("index");
    let h = Harness::build(temp, config, 64);

    let first = h.write_document("a.txt", LEXORA_NOTES.as_bytes());
    h.engine.index_file(&first).await.unwrap();

    fs::remove_dir_all(&state_dir).unwrap();
    fs::write(&state_dir, "a file where a directory should be").unwrap();

    let second = h.write_document("b.txt", b"Tokio is an async runtime for Rust.");
    let result = h.engine.index_file(&second).await;
    assert!(matches!(result, Err(AppError::Index(_))));

    let stats = h.engine.stats().await.unwrap();
    assert_eq!(stats.status, IndexStatus::Loaded);
    assert_eq!(stats.records, 1);
    assert_eq!(stats.indexed_sources, vec!["a.txt".to_string()]);
}

#[tokio::test]
async fn test_reupload_replaces_old_version() {
    let h = Harness::new();
    let source = h.upload_source("notes.txt", "The old version mentions zebras.");
    h.engine.upload(&source).await.unwrap();

    fs::write(&source, LEXORA_NOTES).unwrap();
    let outcome = h.engine.upload(&source).await.unwrap();

    let IndexOutcome::Rebuilt { report, .. } = outcome else {
        panic!("expected a rebuild, got {:?}", outcome);
    };
    assert_eq!(report.records, 1);

    let index = VectorIndex::load(&h.config.index_dir).unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index.records()[0].text, LEXORA_NOTES);
}

#[tokio::test]
async fn test_delete_then_reindex_drops_document() {
    let h = Harness::new();
    for (name, text) in [("a.txt", "Apples are red."), ("b.txt", "Bananas are yellow.")] {
        let source = h.upload_source(name, text);
        h.engine.upload(&source).await.unwrap();
    }
    assert_eq!(h.engine.stats().await.unwrap().indexed_sources.len(), 2);

    let report = h.engine.remove_document("b.txt").await.unwrap();
    assert_eq!(report.documents, 1);

    let stats = h.engine.stats().await.unwrap();
    assert_eq!(stats.indexed_sources, vec!["a.txt".to_string()]);
    assert_eq!(stats.documents_on_storage, 1);
    assert!(!VectorIndex::load(&h.config.index_dir)
        .unwrap()
        .contains_source("b.txt"));
}

#[tokio::test]
async fn test_stream_query_yields_fragments() {
    let temp = TempDir::new().unwrap();
    let config = EngineConfig::in_dir(temp.path(), "mistral");
    let embedder = Arc::new(CountingEmbedder::new(128));
    let llm = Arc::new(ScriptedLlm::new("").with_fragments(&["Lexora ", "is ", "a RAG system."]));
    let engine = RagEngine::new(config.clone(), bound(embedder), llm.clone()).unwrap();

    fs::create_dir_all(&config.documents_dir).unwrap();
    fs::write(config.documents_dir.join("notes.txt"), LEXORA_NOTES).unwrap();

    let streamed = engine.stream_query("What is Lexora?").await.unwrap();
    assert_eq!(streamed.sources[0].source, "notes.txt");

    let text: Vec<String> = streamed.fragments.map(|f| f.unwrap()).collect().await;
    assert_eq!(text.concat(), "Lexora is a RAG system.");
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn test_abandoned_stream_leaves_index_usable() {
    let temp = TempDir::new().unwrap();
    let config = EngineConfig::in_dir(temp.path(), "mistral");
    let embedder = Arc::new(CountingEmbedder::new(128));
    let llm = Arc::new(ScriptedLlm::new("").with_fragments(&["Lexora ", "is ", "a RAG system."]));
    let engine = RagEngine::new(config.clone(), bound(embedder), llm.clone()).unwrap();

    fs::create_dir_all(&config.documents_dir).unwrap();
    fs::write(config.documents_dir.join("notes.txt"), LEXORA_NOTES).unwrap();

    let mut streamed = engine.stream_query("What is Lexora?").await.unwrap();
    let first = streamed.fragments.next().await.unwrap().unwrap();
    assert_eq!(first, "Lexora ");
    drop(streamed);

    let answer = engine.query("What is Lexora?").await.unwrap();
    assert_eq!(answer.sources[0].source, "notes.txt");
    assert_eq!(engine.status().await, IndexStatus::Loaded);
    assert_eq!(VectorIndex::load(&config.index_dir).unwrap().len(), 1);
    assert_eq!(llm.calls(), 2);
}

#[tokio::test]
async fn test_query_waits_for_inflight_rebuild() {
    let h = Harness::new();
    let path = h.write_document("notes.txt", b"The old version mentions zebras.");
    h.engine.index_file(&path).await.unwrap();

    fs::write(&path, LEXORA_NOTES).unwrap();
    let (report, answer) = tokio::join!(h.engine.reindex_all(), h.engine.query("What is Lexora?"));

    assert_eq!(report.unwrap().records, 1);
    let answer = answer.unwrap();
    assert!(answer.sources[0].snippet.contains("RAG system"));

    let prompt = h.llm.last_prompt().unwrap();
    assert!(prompt.contains(LEXORA_NOTES));
    assert!(!prompt.contains("zebras"));
}

#[tokio::test]
async fn test_rebuild_reports_progress() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let captured = events.clone();

    let temp = TempDir::new().unwrap();
    let config = EngineConfig::in_dir(temp.path(), "mistral");
    let engine = RagEngine::new(
        config.clone(),
        bound(Arc::new(CountingEmbedder::new(64))),
        Arc::new(ScriptedLlm::new("ok")),
    )
    .unwrap()
    .with_progress(ProgressReporter::new(Arc::new(move |event: ProgressEvent| {
        captured.lock().unwrap().push(event.phase);
    })));

    fs::create_dir_all(&config.documents_dir).unwrap();
    fs::write(config.documents_dir.join("notes.txt"), LEXORA_NOTES).unwrap();
    engine.reindex_all().await.unwrap();

    let phases = events.lock().unwrap().clone();
    assert_eq!(
        phases,
        vec![
            ProgressPhase::Discover,
            ProgressPhase::Extract,
            ProgressPhase::Chunk,
            ProgressPhase::Embed,
            ProgressPhase::Persist,
        ]
    );
}

#[tokio::test]
async fn test_unusable_documents_are_not_reextracted_per_query() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let captured = events.clone();

    let temp = TempDir::new().unwrap();
    let config = EngineConfig::in_dir(temp.path(), "mistral");
    let llm = Arc::new(ScriptedLlm::new("Lexora is a RAG system."));
    let engine = RagEngine::new(
        config.clone(),
        bound(Arc::new(CountingEmbedder::new(64))),
        llm.clone(),
    )
    .unwrap()
    .with_progress(ProgressReporter::new(Arc::new(move |event: ProgressEvent| {
        captured.lock().unwrap().push(event.phase);
    })));

    fs::create_dir_all(&config.documents_dir).unwrap();
    fs::write(config.documents_dir.join("broken.pdf"), b"not a pdf at all").unwrap();

    for _ in 0..3 {
        let answer = engine.query("What is Lexora?").await.unwrap();
        assert!(answer.is_no_documents());
    }
    let discovers = |events: &Mutex<Vec<ProgressPhase>>| {
        events
            .lock()
            .unwrap()
            .iter()
            .filter(|phase| **phase == ProgressPhase::Discover)
            .count()
    };
    assert_eq!(discovers(&events), 1);
    assert_eq!(engine.status().await, IndexStatus::Absent);

    // A changed document set is worth another attempt.
    fs::write(config.documents_dir.join("notes.txt"), LEXORA_NOTES).unwrap();
    let answer = engine.query("What is Lexora?").await.unwrap();
    assert!(!answer.is_no_documents());
    assert_eq!(discovers(&events), 2);
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn test_from_app_config_binds_offline_chain() {
    let temp = TempDir::new().unwrap();
    let app = AppConfig {
        workspace: temp.path().to_path_buf(),
        embeddings: vec![lexora_core::config::EmbeddingProviderConfig::trigram(96)],
        ..Default::default()
    };

    let engine = RagEngine::from_app_config(&app).await.unwrap();
    assert_eq!(engine.embedder().provider.dimensions(), 96);
    assert_eq!(engine.config().documents_dir, temp.path().join("documents"));
    assert_eq!(engine.init().await.unwrap(), IndexStatus::Absent);
}
