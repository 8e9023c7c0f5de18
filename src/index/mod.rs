//! Semantic index over distinct historical question texts
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  QuestionStore.all_records()              │
//! └───────────────────────────────────────────────────────────┘
//!                              │ group by (company, role,
//!                              │ category, skill, question)
//!                              ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │  builder: one IndexEntry per group, one embedding each    │
//! └───────────────────────────────────────────────────────────┘
//!                 │                            │
//!                 ▼                            ▼
//!   IndexStore (SQLite, persisted)    SemanticIndex (in memory)
//!   text + embedding + id string      nearest-neighbor queries
//! ```
//!
//! The whole index is append-free after construction; the query surface
//! is read-only.

pub mod builder;
pub mod codec;
pub mod embedder;
pub mod store;

pub use builder::{IndexBuilder, QuestionGroup, completed_builds, get_or_build, group_records};
pub use embedder::HashEmbedder;
pub use store::IndexStore;

use std::cmp::Ordering;

/// One indexed question text and the historical record ids that share it.
/// Created once at index build, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub entry_id: i64,
    pub question: String,
    pub embedding: Vec<f32>,
    /// Record ids sharing this exact question text, sorted ascending.
    pub ids: Vec<i64>,
}

/// In-memory vector index over distinct question texts.
#[derive(Debug)]
pub struct SemanticIndex {
    embedder: HashEmbedder,
    entries: Vec<IndexEntry>,
}

impl SemanticIndex {
    #[must_use]
    pub fn new(embedder: HashEmbedder, entries: Vec<IndexEntry>) -> Self {
        Self { embedder, entries }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn dims(&self) -> usize {
        self.embedder.dims()
    }

    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Nearest-neighbor lookup: entries ordered by descending cosine
    /// similarity to `text`, at most `top_k` of them. Ties keep insertion
    /// order (undefined but stable).
    #[must_use]
    pub fn query(&self, text: &str, top_k: usize) -> Vec<&IndexEntry> {
        let query_vec = self.embedder.embed(text);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (pos, embedder::dot(&query_vec, &entry.embedding)))
            .collect();
        // Stable sort: equal scores stay in insertion order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);
        scored
            .into_iter()
            .map(|(pos, _)| &self.entries[pos])
            .collect()
    }
}
