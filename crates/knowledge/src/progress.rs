//! Structured progress reporting for index rebuilds.
//!
//! A rebuild walks the document store, extracts and chunks each file, embeds
//! the corpus and persists the result. Each step emits a [`ProgressEvent`]
//! so a caller (the CLI) can show incremental feedback.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Discover,
    Extract,
    Chunk,
    Embed,
    Persist,
}

impl ProgressPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::Extract => "extract",
            Self::Chunk => "chunk",
            Self::Embed => "embed",
            Self::Persist => "persist",
        }
    }
}

impl fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress event emitted during a rebuild.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,

    /// Units done so far (files, chunks)
    pub current: u64,

    /// Total expected work, if known
    pub total: Option<u64>,

    /// 0.0 - 100.0
    pub percentage: Option<f64>,

    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: Option<f64>,
}

impl ProgressEvent {
    pub fn new(
        phase: ProgressPhase,
        current: u64,
        total: Option<u64>,
        message: impl Into<String>,
    ) -> Self {
        let percentage =
            total.map(|t| if t > 0 { (current as f64 / t as f64) * 100.0 } else { 0.0 });

        Self {
            phase,
            current,
            total,
            percentage,
            message: message.into(),
            elapsed_secs: None,
        }
    }

    pub fn with_elapsed(mut self, elapsed_secs: f64) -> Self {
        self.elapsed_secs = Some(elapsed_secs);
        self
    }

    /// Format as a simple user-facing line.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => self.current.to_string(),
        };

        let pct = self
            .percentage
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase, progress, pct, self.message)
    }
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Emits events through an optional callback. Cheap to clone.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Instant,
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("enabled", &self.callback.is_some())
            .finish()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Instant::now(),
        }
    }

    /// A reporter that emits nothing.
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Instant::now(),
        }
    }

    pub fn emit(&self, event: ProgressEvent) {
        let Some(callback) = &self.callback else {
            return;
        };

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let event = event.with_elapsed(elapsed);

        tracing::debug!(
            phase = %event.phase,
            current = event.current,
            total = ?event.total,
            message = %event.message,
            elapsed_secs = elapsed,
            "Progress event"
        );

        callback(event);
    }

    pub fn discover(&self, files: u64, dir: &str) {
        self.emit(ProgressEvent::new(
            ProgressPhase::Discover,
            files,
            None,
            format!("{} supported files in {}", files, dir),
        ));
    }

    pub fn extract(&self, current: u64, total: u64, file: &str) {
        self.emit(ProgressEvent::new(
            ProgressPhase::Extract,
            current,
            Some(total),
            format!("reading {}", file),
        ));
    }

    pub fn chunk(&self, current: u64, total: u64, file: &str, chunks_created: usize) {
        self.emit(ProgressEvent::new(
            ProgressPhase::Chunk,
            current,
            Some(total),
            format!("{} chunks from {}", chunks_created, file),
        ));
    }

    pub fn embed(&self, chunks: u64, space: &str) {
        self.emit(ProgressEvent::new(
            ProgressPhase::Embed,
            chunks,
            None,
            format!("embedding with {}", space),
        ));
    }

    pub fn persist(&self, records: u64, dir: &str) {
        self.emit(ProgressEvent::new(
            ProgressPhase::Persist,
            records,
            None,
            format!("writing {}", dir),
        ));
    }
}
