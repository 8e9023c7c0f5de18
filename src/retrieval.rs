//! Exemplar retrieval
//!
//! Reconciles semantic nearest-neighbor hits against the caller's
//! permitted-id pool. Similarity search runs over question *text* alone,
//! independent of which (company, role, skill) a record belongs to — the
//! same interview question recurs verbatim across postings. The
//! permitted-id set is the hard filter that re-scopes a text-level match
//! back to the caller's context; ids outside it never survive, no matter
//! how similar the wording.

use std::collections::{BTreeSet, HashSet};

use crate::corpus::{Exemplar, QuestionStore};
use crate::error::{IprepError, Result};
use crate::index::SemanticIndex;

/// Default number of nearest-neighbor candidates consulted per retrieval.
pub const DEFAULT_TOP_K: usize = 10;

/// Best-matching historical Q&A exemplars for a generated question,
/// scoped to `permitted_ids`.
///
/// Candidate groups are visited in similarity rank order and their id
/// sets intersected with the permitted pool; survivors are kept in rank
/// order *with* repetition across candidates, so downstream counts
/// reflect ranking weight. An empty intersection fails with
/// [`IprepError::NoRelevantExemplars`], which callers downgrade to an
/// empty exemplar list.
pub fn find_exemplars(
    index: &SemanticIndex,
    store: &QuestionStore,
    generated_question: &str,
    permitted_ids: &[i64],
    top_k: usize,
) -> Result<Vec<Exemplar>> {
    let permitted: HashSet<i64> = permitted_ids.iter().copied().collect();

    let mut surviving: Vec<i64> = Vec::new();
    for entry in index.query(generated_question, top_k) {
        surviving.extend(entry.ids.iter().filter(|id| permitted.contains(id)));
    }

    if surviving.is_empty() {
        return Err(IprepError::NoRelevantExemplars);
    }
    tracing::debug!(
        question = generated_question,
        surviving = surviving.len(),
        "exemplar ids after permitted-id filter"
    );

    let unique: BTreeSet<i64> = surviving.into_iter().collect();
    store.lookup_by_ids(&unique)
}
