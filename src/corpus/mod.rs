//! Historical interview Q&A corpus
//!
//! Loads delimited corpus files into an in-memory relational store and
//! answers the exact structured queries the rest of the pipeline needs:
//! sample questions for a (company, role, skill) filter, and
//! question/answer/rating lookups by id.

pub mod csv;
pub mod store;

use serde::{Deserialize, Serialize};

pub use store::{QuestionStore, SamplePool};

/// One row of the historical interview corpus. Immutable once loaded;
/// owned by [`QuestionStore`] for the process lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalRecord {
    pub id: i64,
    pub company: String,
    pub role: String,
    pub category: String,
    pub skill: String,
    /// Canonical question wording, the text that gets indexed and sampled.
    pub interview_question: String,
    /// Question as it was actually asked in the recorded interview.
    pub question: String,
    pub answer: String,
    pub rating: f64,
}

/// A historical (question, answer, rating) triple surfaced to the
/// evaluator as grounding context. Derived fresh on each retrieval call;
/// no persisted identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exemplar {
    pub question: String,
    pub answer: String,
    pub rating: f64,
}
