//! SQLite persistence for the vector index.

use super::VectorIndex;
use crate::types::{Chunk, DistanceMetric, ExtractedDocument, IndexEntry, ModelIdentity};
use chrono::{DateTime, Utc};
use convopilot_core::{AppError, AppResult};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Bumped whenever the schema changes; older files fail to load and get rebuilt.
pub const INDEX_FORMAT_VERSION: i64 = 1;

const SCHEMA: &str = r#"
CREATE TABLE index_meta (
    format_version INTEGER NOT NULL,
    provider TEXT NOT NULL,
    model TEXT NOT NULL,
    dimensions INTEGER NOT NULL,
    metric TEXT NOT NULL,
    built_at TEXT NOT NULL
);

CREATE TABLE documents (
    source_id TEXT PRIMARY KEY,
    full_text TEXT NOT NULL,
    char_count INTEGER NOT NULL,
    content_hash TEXT NOT NULL
);

CREATE TABLE chunks (
    source_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    text TEXT NOT NULL,
    byte_start INTEGER NOT NULL,
    byte_end INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    PRIMARY KEY (source_id, position)
);
"#;

/// Durable storage for a [`VectorIndex`] at a single well-known location.
///
/// `save` replaces any previous index atomically: readers see either the old
/// index or the new one, never a partial write.
pub trait IndexStorage: Send + Sync {
    fn save(&self, index: &VectorIndex) -> AppResult<()>;

    /// Load the persisted index. Every failure is reported as
    /// [`AppError::IndexLoad`].
    fn load(&self) -> AppResult<VectorIndex>;

    fn exists(&self) -> bool;

    /// Delete the persisted index. Removing a missing index is not an error.
    fn remove(&self) -> AppResult<()>;

    fn location(&self) -> &Path;
}

/// Index storage backed by one SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteIndexStorage {
    path: PathBuf,
}

impl SqliteIndexStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "index".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()))
    }

    fn write_to(&self, target: &Path, index: &VectorIndex) -> AppResult<()> {
        let mut conn = Connection::open(target)
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

        let tx = conn
            .transaction()
            .map_err(|e| AppError::Knowledge(format!("Failed to start transaction: {}", e)))?;

        let model = index.model();
        tx.execute(
            "INSERT INTO index_meta (format_version, provider, model, dimensions, metric, built_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                INDEX_FORMAT_VERSION,
                model.provider,
                model.model,
                model.dimensions as i64,
                index.metric().as_str(),
                index.built_at().to_rfc3339(),
            ],
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to write index header: {}", e)))?;

        for doc in index.documents() {
            tx.execute(
                "INSERT OR REPLACE INTO documents (source_id, full_text, char_count, content_hash)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    doc.source_id,
                    &*doc.text,
                    doc.length as i64,
                    content_hash(&doc.text),
                ],
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to insert document: {}", e)))?;
        }

        for entry in index.entries() {
            let chunk = &entry.chunk;
            tx.execute(
                "INSERT INTO chunks (source_id, position, text, byte_start, byte_end, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    chunk.source_id,
                    chunk.position as i64,
                    chunk.text,
                    chunk.byte_range.0 as i64,
                    chunk.byte_range.1 as i64,
                    embedding_to_bytes(&entry.embedding),
                ],
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| AppError::Knowledge(format!("Failed to commit index: {}", e)))?;

        Ok(())
    }

    fn read(&self) -> AppResult<VectorIndex> {
        let conn = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

        let header = conn
            .query_row(
                "SELECT format_version, provider, model, dimensions, metric, built_at FROM index_meta",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| AppError::Knowledge(format!("Failed to read index header: {}", e)))?
            .ok_or_else(|| AppError::Knowledge("Index header is missing".to_string()))?;

        let (version, provider, model, dimensions, metric, built_at) = header;

        if version != INDEX_FORMAT_VERSION {
            return Err(AppError::Knowledge(format!(
                "Unsupported index format version {} (expected {})",
                version, INDEX_FORMAT_VERSION
            )));
        }

        let metric = DistanceMetric::parse(&metric)
            .ok_or_else(|| AppError::Knowledge(format!("Unknown distance metric '{}'", metric)))?;

        let built_at = DateTime::parse_from_rfc3339(&built_at)
            .map_err(|e| AppError::Knowledge(format!("Invalid build timestamp: {}", e)))?
            .with_timezone(&Utc);

        let model = ModelIdentity {
            provider,
            model,
            dimensions: dimensions as usize,
        };

        let documents = read_documents(&conn)?;
        let full_texts: HashMap<&str, &Arc<str>> = documents
            .iter()
            .map(|d| (d.source_id.as_str(), &d.text))
            .collect();

        let entries = read_chunks(&conn)?
            .into_iter()
            .map(|row| -> AppResult<IndexEntry> {
                let full_text = full_texts
                    .get(row.source_id.as_str())
                    .map(|t| Arc::clone(t))
                    .unwrap_or_else(|| Arc::from(""));

                Ok(IndexEntry {
                    embedding: bytes_to_embedding(&row.embedding)?,
                    chunk: Chunk {
                        source_id: row.source_id,
                        position: row.position,
                        text: row.text,
                        byte_range: row.byte_range,
                        full_text,
                    },
                })
            })
            .collect::<AppResult<Vec<IndexEntry>>>()?;

        VectorIndex::new(model, metric, built_at, documents, entries)
    }
}

impl IndexStorage for SqliteIndexStorage {
    fn save(&self, index: &VectorIndex) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create index directory: {}", e))
            })?;
        }

        let temp = self.temp_path();
        if let Err(e) = self.write_to(&temp, index) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }

        fs::rename(&temp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            AppError::Knowledge(format!("Failed to replace index at {:?}: {}", self.path, e))
        })?;

        tracing::debug!(
            "Saved index with {} chunks to {:?}",
            index.len(),
            self.path
        );
        Ok(())
    }

    fn load(&self) -> AppResult<VectorIndex> {
        let index = self.read().map_err(|e| {
            AppError::IndexLoad(format!("Cannot load index at {:?}: {}", self.path, e))
        })?;

        tracing::debug!(
            "Loaded index with {} chunks from {:?}",
            index.len(),
            self.path
        );
        Ok(index)
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn remove(&self) -> AppResult<()> {
        if self.exists() {
            fs::remove_file(&self.path)?;
            tracing::info!("Removed index at {:?}", self.path);
        }
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

struct ChunkRow {
    source_id: String,
    position: u32,
    text: String,
    byte_range: (usize, usize),
    embedding: Vec<u8>,
}

fn read_documents(conn: &Connection) -> AppResult<Vec<ExtractedDocument>> {
    let mut stmt = conn
        .prepare("SELECT source_id, full_text, content_hash FROM documents ORDER BY rowid")
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to query documents: {}", e)))?;

    let mut documents = Vec::new();
    for row in rows {
        let (source_id, full_text, hash) =
            row.map_err(|e| AppError::Knowledge(format!("Failed to read document: {}", e)))?;

        if content_hash(&full_text) != hash {
            return Err(AppError::Knowledge(format!(
                "Content hash mismatch for '{}'",
                source_id
            )));
        }

        documents.push(ExtractedDocument::new(source_id, &full_text));
    }

    Ok(documents)
}

fn read_chunks(conn: &Connection) -> AppResult<Vec<ChunkRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT source_id, position, text, byte_start, byte_end, embedding
             FROM chunks ORDER BY rowid",
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(ChunkRow {
                source_id: row.get(0)?,
                position: row.get::<_, i64>(1)? as u32,
                text: row.get(2)?,
                byte_range: (
                    row.get::<_, i64>(3)? as usize,
                    row.get::<_, i64>(4)? as usize,
                ),
                embedding: row.get(5)?,
            })
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Knowledge(format!("Failed to read chunk: {}", e)))
}

/// SHA-256 of a document's text, hex encoded.
fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Convert embedding vector to little-endian bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
