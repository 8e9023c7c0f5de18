//! Persisted index collections (SQLite)
//!
//! Collections are keyed by name. Each entry row carries the question
//! text, the raw f32 embedding as a little-endian blob, and the group's
//! id set encoded through [`crate::index::codec`]. Opening a collection
//! that does not exist fails with [`IprepError::IndexMissing`]; any decode
//! problem surfaces as [`IprepError::IndexUnavailable`] so callers can
//! rebuild instead of failing.

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{IprepError, Result};
use crate::index::{IndexEntry, codec};

/// SQLite-backed store for persisted index collections.
pub struct IndexStore {
    conn: Connection,
}

impl std::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexStore").finish_non_exhaustive()
    }
}

impl IndexStore {
    /// Open (creating if needed) the index database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Purely in-memory store.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS collections (
                name       TEXT PRIMARY KEY,
                dims       INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS entries (
                collection  TEXT NOT NULL,
                entry_id    INTEGER NOT NULL,
                question    TEXT NOT NULL,
                embedding   BLOB NOT NULL,
                mapping_ids TEXT NOT NULL,
                PRIMARY KEY (collection, entry_id)
            );",
        )?;
        Ok(Self { conn })
    }

    /// Embedding dimensionality of a collection, `None` when absent.
    pub fn collection_dims(&self, name: &str) -> Result<Option<usize>> {
        let dims: Option<i64> = self
            .conn
            .query_row(
                "SELECT dims FROM collections WHERE name = ?",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(dims.map(|d| d.max(0) as usize))
    }

    /// Number of entries in a collection.
    pub fn entry_count(&self, name: &str) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE collection = ?",
            [name],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    /// Drop any existing collection under `name` and register a fresh,
    /// empty one.
    pub fn reset_collection(&self, name: &str, dims: usize) -> Result<()> {
        self.conn
            .execute("DELETE FROM entries WHERE collection = ?", [name])?;
        self.conn
            .execute("DELETE FROM collections WHERE name = ?", [name])?;
        self.conn.execute(
            "INSERT INTO collections (name, dims, created_at) VALUES (?, ?, ?)",
            params![name, dims as i64, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Insert or replace one entry.
    pub fn upsert_entry(&self, name: &str, entry: &IndexEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO entries (collection, entry_id, question, embedding, mapping_ids)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(collection, entry_id) DO UPDATE SET
                question = excluded.question,
                embedding = excluded.embedding,
                mapping_ids = excluded.mapping_ids",
            params![
                name,
                entry.entry_id,
                entry.question,
                embedding_to_blob(&entry.embedding),
                codec::encode_ids(&entry.ids),
            ],
        )?;
        Ok(())
    }

    /// Load all entries of a collection in entry-id order.
    ///
    /// Fails with `IndexMissing` when no collection is registered under
    /// `name`, and with `IndexUnavailable` when stored rows do not decode
    /// (wrong blob length, unparsable id list, dims mismatch).
    pub fn load_collection(&self, name: &str) -> Result<(usize, Vec<IndexEntry>)> {
        let Some(dims) = self.collection_dims(name)? else {
            return Err(IprepError::IndexMissing(name.to_string()));
        };

        let mut stmt = self.conn.prepare(
            "SELECT entry_id, question, embedding, mapping_ids
             FROM entries WHERE collection = ? ORDER BY entry_id",
        )?;
        let rows = stmt.query_map([name], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (entry_id, question, blob, mapping_ids) = row?;
            let embedding = blob_to_embedding(&blob, dims).map_err(|reason| {
                IprepError::IndexUnavailable {
                    name: name.to_string(),
                    reason: format!("entry {entry_id}: {reason}"),
                }
            })?;
            let ids =
                codec::decode_ids(&mapping_ids).map_err(|err| IprepError::IndexUnavailable {
                    name: name.to_string(),
                    reason: format!("entry {entry_id}: {err}"),
                })?;
            entries.push(IndexEntry {
                entry_id,
                question,
                embedding,
                ids,
            });
        }
        Ok((dims, entries))
    }
}

fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

fn blob_to_embedding(blob: &[u8], dims: usize) -> std::result::Result<Vec<f32>, String> {
    if blob.len() != dims * 4 {
        return Err(format!(
            "embedding blob has {} bytes, expected {}",
            blob.len(),
            dims * 4
        ));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
