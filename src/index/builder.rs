//! Index construction and the lazy per-name singleton
//!
//! Building is expensive relative to everything else the pipeline does,
//! so it happens at most once per collection name per process: a
//! process-wide registry memoizes successful opens/builds, and the
//! registry lock is held across a build so concurrent first callers wait
//! for the in-flight build instead of starting their own.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

use crate::corpus::{HistoricalRecord, QuestionStore};
use crate::error::{IprepError, Result};
use crate::index::store::IndexStore;
use crate::index::{HashEmbedder, IndexEntry, SemanticIndex};

/// The set of record ids sharing one exact question wording within one
/// (company, role, category, skill) tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionGroup {
    pub question: String,
    /// Member ids, sorted ascending.
    pub ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    company: String,
    role: String,
    category: String,
    skill: String,
    question: String,
}

/// Partition records into question groups.
///
/// Records with an empty question text are skipped (the corpus contains
/// such rows and they cannot be indexed). For the rest, every record id
/// lands in exactly one group and a group's question text is identical
/// across all its member ids.
#[must_use]
pub fn group_records(records: &[HistoricalRecord]) -> Vec<QuestionGroup> {
    let mut groups: BTreeMap<GroupKey, Vec<i64>> = BTreeMap::new();
    for record in records {
        if record.interview_question.trim().is_empty() {
            continue;
        }
        let key = GroupKey {
            company: record.company.clone(),
            role: record.role.clone(),
            category: record.category.clone(),
            skill: record.skill.clone(),
            question: record.interview_question.clone(),
        };
        groups.entry(key).or_default().push(record.id);
    }
    groups
        .into_iter()
        .map(|(key, mut ids)| {
            ids.sort_unstable();
            QuestionGroup {
                question: key.question,
                ids,
            }
        })
        .collect()
}

/// Builds a [`SemanticIndex`] from corpus records.
#[derive(Debug)]
pub struct IndexBuilder {
    embedder: HashEmbedder,
}

impl IndexBuilder {
    #[must_use]
    pub fn new(dims: usize) -> Self {
        Self {
            embedder: HashEmbedder::new(dims),
        }
    }

    /// Group records by distinct question text and register one entry with
    /// one embedding per group. Deterministic: the same corpus yields the
    /// same index.
    #[must_use]
    pub fn build(&self, records: &[HistoricalRecord]) -> SemanticIndex {
        let entries: Vec<IndexEntry> = group_records(records)
            .into_iter()
            .enumerate()
            .map(|(pos, group)| IndexEntry {
                entry_id: pos as i64,
                embedding: self.embedder.embed(&group.question),
                question: group.question,
                ids: group.ids,
            })
            .collect();
        tracing::info!(entries = entries.len(), "semantic index built");
        SemanticIndex::new(self.embedder.clone(), entries)
    }

    /// Build from records and persist every entry under `name`, replacing
    /// any previous collection content.
    pub fn build_and_persist(
        &self,
        store: &IndexStore,
        name: &str,
        records: &[HistoricalRecord],
    ) -> Result<SemanticIndex> {
        let index = self.build(records);
        store.reset_collection(name, self.embedder.dims())?;
        for entry in index.entries() {
            store.upsert_entry(name, entry)?;
        }
        Ok(index)
    }
}

static REGISTRY: LazyLock<Mutex<HashMap<String, Arc<SemanticIndex>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

static BUILDS: AtomicUsize = AtomicUsize::new(0);

/// Number of full index builds this process has performed.
#[must_use]
pub fn completed_builds() -> usize {
    BUILDS.load(Ordering::Relaxed)
}

/// Open the persisted collection under `name`, rebuilding it from the
/// corpus when it is absent or unreadable, and memoize the handle
/// process-wide.
///
/// First caller pays the build cost; late arrivers block on the registry
/// lock and then reuse the same handle. There is no invalidation: a name,
/// once resolved, stays resolved for the process lifetime.
pub fn get_or_build(
    index_store: &IndexStore,
    corpus: &QuestionStore,
    name: &str,
    dims: usize,
) -> Result<Arc<SemanticIndex>> {
    let mut registry = REGISTRY.lock();
    if let Some(index) = registry.get(name) {
        return Ok(Arc::clone(index));
    }

    let index = match open_collection(index_store, name, dims) {
        Ok(index) => index,
        Err(IprepError::IndexMissing(_)) => {
            tracing::info!(collection = name, "index not found, building");
            rebuild(index_store, corpus, name, dims)?
        }
        Err(IprepError::IndexUnavailable { reason, .. }) => {
            tracing::warn!(collection = name, %reason, "index unreadable, rebuilding");
            rebuild(index_store, corpus, name, dims)?
        }
        Err(err) => return Err(err),
    };

    let index = Arc::new(index);
    registry.insert(name.to_string(), Arc::clone(&index));
    Ok(index)
}

fn open_collection(index_store: &IndexStore, name: &str, dims: usize) -> Result<SemanticIndex> {
    let (stored_dims, entries) = index_store.load_collection(name)?;
    if stored_dims != dims {
        return Err(IprepError::IndexUnavailable {
            name: name.to_string(),
            reason: format!("stored dims {stored_dims} != configured dims {dims}"),
        });
    }
    Ok(SemanticIndex::new(HashEmbedder::new(dims), entries))
}

fn rebuild(
    index_store: &IndexStore,
    corpus: &QuestionStore,
    name: &str,
    dims: usize,
) -> Result<SemanticIndex> {
    BUILDS.fetch_add(1, Ordering::Relaxed);
    let records = corpus.all_records()?;
    IndexBuilder::new(dims).build_and_persist(index_store, name, &records)
}
