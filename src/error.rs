//! Error handling for iprep.
//!
//! Provides [`IprepError`], the crate-wide error enum, and the matching
//! [`Result`] alias. Retrieval-level "soft" failures (`NoMatchingQuestions`,
//! `NoRelevantExemplars`) are modelled as errors here and downgraded to
//! empty results by the questionnaire assembler.

use std::io;

use thiserror::Error;

/// Main error type for iprep operations.
#[derive(Error, Debug)]
pub enum IprepError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("No questions found for company '{company}', role '{role}'")]
    NoMatchingQuestions { company: String, role: String },

    #[error("Index collection not found: {0}")]
    IndexMissing(String),

    #[error("Index collection '{name}' unavailable: {reason}")]
    IndexUnavailable { name: String, reason: String },

    #[error("No relevant exemplars intersect the permitted id set")]
    NoRelevantExemplars,

    #[error("Invalid id list: {0}")]
    InvalidIdList(String),

    #[error("Generator error: {0}")]
    Generator(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IprepError {
    /// Whether this error means "the answer is legitimately empty" rather
    /// than "something broke". Callers assembling a questionnaire downgrade
    /// these to empty pools / empty exemplar lists.
    #[must_use]
    pub fn is_empty_result(&self) -> bool {
        matches!(
            self,
            Self::NoMatchingQuestions { .. } | Self::NoRelevantExemplars
        )
    }
}

/// Result type alias using IprepError.
pub type Result<T> = std::result::Result<T, IprepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_matching_questions_display_names_the_filter() {
        let err = IprepError::NoMatchingQuestions {
            company: "Acme".into(),
            role: "Engineer".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Acme"));
        assert!(msg.contains("Engineer"));
    }

    #[test]
    fn soft_failures_are_empty_results() {
        assert!(IprepError::NoRelevantExemplars.is_empty_result());
        assert!(
            IprepError::NoMatchingQuestions {
                company: "a".into(),
                role: "b".into()
            }
            .is_empty_result()
        );
        assert!(!IprepError::Config("bad".into()).is_empty_result());
        assert!(!IprepError::IndexMissing("v2".into()).is_empty_result());
    }

    #[test]
    fn index_unavailable_carries_reason() {
        let err = IprepError::IndexUnavailable {
            name: "question_embeddings_v2".into(),
            reason: "embedding blob has wrong length".into(),
        };
        assert!(err.to_string().contains("question_embeddings_v2"));
        assert!(err.to_string().contains("wrong length"));
    }
}
