//! On-disk layout of a vector index.
//!
//! ```text
//! <dir>/index.sqlite
//!   manifest   one row: format version, embedding space, record count, saved-at
//!   chunks     one row per record in index order, embedding stored as a
//!              little-endian f32 BLOB
//! ```
//!
//! Saving writes a fresh database into a staging directory next to `<dir>`
//! and swaps it in with renames, so the directory at `<dir>` is always a
//! complete index.

use super::VectorIndex;
use crate::chunk::{Chunk, ChunkMetadata};
use crate::embeddings::EmbeddingSpace;
use chrono::{DateTime, Utc};
use lexora_core::{AppError, AppResult};
use rusqlite::{params, Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Bumped whenever the layout changes; older directories fail to load and get rebuilt.
pub const FORMAT_VERSION: u32 = 2;

/// Database file inside the index directory.
pub const DATABASE_FILE: &str = "index.sqlite";

const SCHEMA: &str = r#"
    CREATE TABLE manifest (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        format_version INTEGER NOT NULL,
        provider TEXT NOT NULL,
        model TEXT NOT NULL,
        dimensions INTEGER NOT NULL,
        record_count INTEGER NOT NULL,
        saved_at TEXT NOT NULL
    );

    CREATE TABLE chunks (
        row_order INTEGER PRIMARY KEY,
        id TEXT NOT NULL,
        source TEXT NOT NULL,
        position INTEGER NOT NULL,
        text TEXT NOT NULL,
        metadata TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE INDEX idx_chunks_source ON chunks(source);
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub space: EmbeddingSpace,
    pub record_count: usize,
    pub saved_at: DateTime<Utc>,
}

impl VectorIndex {
    /// Persist the index to `dir`, replacing whatever was there.
    ///
    /// # Errors
    /// `Index` if the database cannot be written or swapped in. The previous
    /// contents of `dir` are left in place in that case.
    pub fn save(&self, dir: &Path) -> AppResult<()> {
        let (parent, name) = split_dir(dir)?;
        fs::create_dir_all(&parent)
            .map_err(|e| AppError::Index(format!("Failed to create {}: {}", parent.display(), e)))?;

        let staging = parent.join(format!(".{}.staging-{}", name, uuid::Uuid::new_v4()));
        if let Err(e) = self.write_database(&staging) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        swap_in(&staging, dir, &parent, &name)?;

        tracing::info!(
            path = %dir.display(),
            records = self.len(),
            space = %self.space,
            "Saved vector index"
        );
        Ok(())
    }

    fn write_database(&self, staging: &Path) -> AppResult<()> {
        let db_err = |e: rusqlite::Error| AppError::Index(format!("Failed to write index database: {}", e));

        fs::create_dir_all(staging)
            .map_err(|e| AppError::Index(format!("Failed to create staging directory: {}", e)))?;

        let mut conn = Connection::open(staging.join(DATABASE_FILE)).map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        let tx = conn.transaction().map_err(db_err)?;
        {
            let mut insert = tx
                .prepare(
                    "INSERT INTO chunks (row_order, id, source, position, text, metadata, embedding)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .map_err(db_err)?;

            for (row, (chunk, vector)) in self.records.iter().zip(self.rows()).enumerate() {
                let metadata = serde_json::to_string(&chunk.metadata)
                    .map_err(|e| AppError::Index(format!("Failed to encode record metadata: {}", e)))?;
                insert
                    .execute(params![
                        row as i64,
                        chunk.id,
                        chunk.source,
                        i64::from(chunk.position),
                        chunk.text,
                        metadata,
                        embedding_to_bytes(vector),
                    ])
                    .map_err(db_err)?;
            }
        }

        // Manifest last: a database without one is never valid.
        tx.execute(
            "INSERT INTO manifest (id, format_version, provider, model, dimensions, record_count, saved_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                FORMAT_VERSION,
                self.space.provider,
                self.space.model,
                self.space.dimensions as i64,
                self.records.len() as i64,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(db_err)?;

        tx.commit().map_err(db_err)?;
        conn.close().map_err(|(_, e)| db_err(e))
    }

    /// Load a persisted index.
    ///
    /// # Errors
    /// `IndexLoad` if `dir` has no database, the database is unreadable, or
    /// its rows disagree with each other or with the manifest.
    pub fn load(dir: &Path) -> AppResult<Self> {
        let path = dir.join(DATABASE_FILE);
        let conn = open_read_only(&path)?;
        let load_err = |e: rusqlite::Error| {
            AppError::IndexLoad(format!("Failed to read {}: {}", path.display(), e))
        };

        let manifest = query_manifest(&conn, &path)?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(AppError::IndexLoad(format!(
                "Unsupported index format version {} (expected {})",
                manifest.format_version, FORMAT_VERSION
            )));
        }
        let dimensions = manifest.space.dimensions;

        let mut stmt = conn
            .prepare(
                "SELECT id, source, position, text, metadata, embedding
                 FROM chunks ORDER BY row_order",
            )
            .map_err(load_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StoredRow {
                    id: row.get(0)?,
                    source: row.get(1)?,
                    position: row.get(2)?,
                    text: row.get(3)?,
                    metadata: row.get(4)?,
                    embedding: row.get(5)?,
                })
            })
            .map_err(load_err)?;

        let mut records = Vec::with_capacity(manifest.record_count);
        let mut vectors = Vec::with_capacity(manifest.record_count * dimensions);
        for row in rows {
            let row = row.map_err(load_err)?;
            let vector = bytes_to_embedding(&row.embedding)?;
            if vector.len() != dimensions {
                return Err(AppError::IndexLoad(format!(
                    "Record {} has {} dimensions, expected {}",
                    row.id,
                    vector.len(),
                    dimensions
                )));
            }
            records.push(row.into_chunk()?);
            vectors.extend(vector);
        }

        if records.len() != manifest.record_count {
            return Err(AppError::IndexLoad(format!(
                "Manifest lists {} records but {} were found",
                manifest.record_count,
                records.len()
            )));
        }
        if vectors.iter().any(|v| !v.is_finite()) {
            return Err(AppError::IndexLoad("Index contains non-finite vector values".to_string()));
        }

        let index = VectorIndex::from_parts(manifest.space, records, vectors)
            .map_err(|e| AppError::IndexLoad(format!("Inconsistent index: {}", e)))?;

        tracing::info!(
            path = %dir.display(),
            records = index.len(),
            space = %index.space,
            "Loaded vector index"
        );
        Ok(index)
    }
}

struct StoredRow {
    id: String,
    source: String,
    position: i64,
    text: String,
    metadata: String,
    embedding: Vec<u8>,
}

impl StoredRow {
    fn into_chunk(self) -> AppResult<Chunk> {
        let metadata: ChunkMetadata = serde_json::from_str(&self.metadata).map_err(|e| {
            AppError::IndexLoad(format!("Corrupt metadata for record {}: {}", self.id, e))
        })?;
        let position = u32::try_from(self.position).map_err(|_| {
            AppError::IndexLoad(format!("Invalid position {} for record {}", self.position, self.id))
        })?;

        Ok(Chunk {
            id: self.id,
            source: self.source,
            position,
            text: self.text,
            metadata,
        })
    }
}

/// Read only the manifest of a persisted index.
pub fn read_manifest(dir: &Path) -> AppResult<Manifest> {
    let path = dir.join(DATABASE_FILE);
    let conn = open_read_only(&path)?;
    query_manifest(&conn, &path)
}

/// Delete a persisted index. A missing directory is not an error.
pub fn remove_persisted(dir: &Path) -> AppResult<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            tracing::info!(path = %dir.display(), "Removed persisted index");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::Index(format!(
            "Failed to remove {}: {}",
            dir.display(),
            e
        ))),
    }
}

fn open_read_only(path: &Path) -> AppResult<Connection> {
    if !path.is_file() {
        return Err(AppError::IndexLoad(format!(
            "No persisted index at {}",
            path.display()
        )));
    }
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| AppError::IndexLoad(format!("Failed to open {}: {}", path.display(), e)))
}

fn query_manifest(conn: &Connection, path: &Path) -> AppResult<Manifest> {
    let (format_version, provider, model, dimensions, record_count, saved_at) = conn
        .query_row(
            "SELECT format_version, provider, model, dimensions, record_count, saved_at
             FROM manifest WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .map_err(|e| AppError::IndexLoad(format!("Corrupt manifest in {}: {}", path.display(), e)))?;

    let corrupt = |what: &str| AppError::IndexLoad(format!("Corrupt manifest in {}: invalid {}", path.display(), what));
    let dimensions = usize::try_from(dimensions).map_err(|_| corrupt("dimensions"))?;
    let record_count = usize::try_from(record_count).map_err(|_| corrupt("record count"))?;
    let saved_at = DateTime::parse_from_rfc3339(&saved_at)
        .map_err(|_| corrupt("timestamp"))?
        .with_timezone(&Utc);

    Ok(Manifest {
        format_version,
        space: EmbeddingSpace::new(provider, model, dimensions),
        record_count,
        saved_at,
    })
}

fn split_dir(dir: &Path) -> AppResult<(PathBuf, String)> {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| AppError::Index(format!("Invalid index directory: {}", dir.display())))?;
    let parent = match dir.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((parent, name))
}

fn swap_in(staging: &Path, dir: &Path, parent: &Path, name: &str) -> AppResult<()> {
    let previous = if dir.exists() {
        let aside = parent.join(format!(".{}.previous-{}", name, uuid::Uuid::new_v4()));
        if let Err(e) = fs::rename(dir, &aside) {
            let _ = fs::remove_dir_all(staging);
            return Err(AppError::Index(format!(
                "Failed to move old index aside: {}",
                e
            )));
        }
        Some(aside)
    } else {
        None
    };

    if let Err(e) = fs::rename(staging, dir) {
        if let Some(aside) = &previous {
            let _ = fs::rename(aside, dir);
        }
        let _ = fs::remove_dir_all(staging);
        return Err(AppError::Index(format!("Failed to swap in new index: {}", e)));
    }

    if let Some(aside) = previous {
        if let Err(e) = fs::remove_dir_all(&aside) {
            tracing::warn!(path = %aside.display(), "Failed to remove old index: {}", e);
        }
    }
    Ok(())
}

/// Convert an embedding to bytes for the BLOB column.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert a BLOB column back to an embedding.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::IndexLoad(format!(
            "Invalid embedding length of {} bytes",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkPipeline;
    use crate::embeddings::providers::trigram::TrigramProvider;
    use crate::embeddings::BoundProvider;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn embedder() -> BoundProvider {
        BoundProvider {
            provider: Arc::new(TrigramProvider::new("hashed-trigram-v1", 128)),
            batch_size: 8,
        }
    }

    async fn sample_index() -> VectorIndex {
        let pipeline = ChunkPipeline::new(Default::default()).unwrap();
        let text = "Lexora indexes documents. ".repeat(60)
            + "\n\nIt answers questions using only retrieved context, über präzise.";
        let chunks = pipeline.split("notes.txt", &text);
        VectorIndex::create(&embedder(), chunks).await.unwrap()
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("index");
        let index = sample_index().await;

        index.save(&dir).unwrap();
        let loaded = VectorIndex::load(&dir).unwrap();

        assert_eq!(loaded, index);
        for query in ["What does Lexora do?", "context", "präzise"] {
            assert_eq!(
                loaded.search(&embedder(), query, 3).await.unwrap(),
                index.search(&embedder(), query, 3).await.unwrap()
            );
        }
    }

    #[tokio::test]
    async fn test_save_replaces_and_leaves_no_staging() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("index");

        sample_index().await.save(&dir).unwrap();
        let empty = VectorIndex::empty(embedder().provider.space());
        empty.save(&dir).unwrap();

        assert!(VectorIndex::load(&dir).unwrap().is_empty());
        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(leftovers, vec!["index".to_string()]);
    }

    #[test]
    fn test_load_missing_directory() {
        let temp = TempDir::new().unwrap();
        let result = VectorIndex::load(&temp.path().join("absent"));
        assert!(matches!(result, Err(AppError::IndexLoad(_))));
    }

    #[tokio::test]
    async fn test_database_holds_one_row_per_record() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("index");
        let index = sample_index().await;
        index.save(&dir).unwrap();

        let conn = Connection::open(dir.join(DATABASE_FILE)).unwrap();
        let (rows, blob_bytes): (i64, i64) = conn
            .query_row("SELECT COUNT(*), MAX(length(embedding)) FROM chunks", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(rows as usize, index.len());
        assert_eq!(blob_bytes, 128 * 4);

        let manifest = read_manifest(&dir).unwrap();
        assert_eq!(manifest.format_version, FORMAT_VERSION);
        assert_eq!(manifest.record_count, index.len());
        assert_eq!(manifest.space, embedder().provider.space());
    }

    #[tokio::test]
    async fn test_load_corrupt_database() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("index");
        sample_index().await.save(&dir).unwrap();

        fs::write(dir.join(DATABASE_FILE), "not a database at all").unwrap();
        assert!(matches!(VectorIndex::load(&dir), Err(AppError::IndexLoad(_))));
        assert!(matches!(read_manifest(&dir), Err(AppError::IndexLoad(_))));
    }

    #[tokio::test]
    async fn test_load_truncated_embedding() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("index");
        sample_index().await.save(&dir).unwrap();

        let conn = Connection::open(dir.join(DATABASE_FILE)).unwrap();
        conn.execute(
            "UPDATE chunks SET embedding = substr(embedding, 1, 8) WHERE row_order = 0",
            [],
        )
        .unwrap();
        drop(conn);

        let err = VectorIndex::load(&dir).unwrap_err();
        assert!(matches!(err, AppError::IndexLoad(ref msg) if msg.contains("dimensions")));
    }

    #[tokio::test]
    async fn test_load_record_count_mismatch() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("index");
        sample_index().await.save(&dir).unwrap();

        let conn = Connection::open(dir.join(DATABASE_FILE)).unwrap();
        conn.execute("UPDATE manifest SET record_count = record_count + 1", [])
            .unwrap();
        drop(conn);

        let err = VectorIndex::load(&dir).unwrap_err();
        assert!(err.to_string().contains("records"));
    }

    #[tokio::test]
    async fn test_load_older_format_version() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("index");
        sample_index().await.save(&dir).unwrap();

        let conn = Connection::open(dir.join(DATABASE_FILE)).unwrap();
        conn.execute("UPDATE manifest SET format_version = 1", []).unwrap();
        drop(conn);

        assert!(matches!(VectorIndex::load(&dir), Err(AppError::IndexLoad(_))));
    }

    #[tokio::test]
    async fn test_remove_persisted() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("index");
        sample_index().await.save(&dir).unwrap();

        remove_persisted(&dir).unwrap();
        assert!(!dir.exists());
        remove_persisted(&dir).unwrap();
    }
}
