//! iprep - interview preparation pipeline
//!
//! Samples a historical interview corpus, generates novel questions per
//! skill through an external LLM, retrieves semantically similar
//! historical exemplars scoped to the sampled pool, and evaluates
//! candidate answers against them.

pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod index;
pub mod llm;
pub mod questionnaire;
pub mod retrieval;

pub use error::{IprepError, Result};

/// Crate version, from Cargo.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
