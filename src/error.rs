//! Error types for the blend optimizer.

use thiserror::Error;

use crate::solution::BlendSolution;

/// Result type alias for library plumbing.
pub type Result<T> = std::result::Result<T, Error>;

/// Plumbing errors: regex compilation, generic wrapping.
#[derive(Error, Debug)]
pub enum Error {
    #[error("pattern error: {0}")]
    Pattern(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Other(String),
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

/// Domain-facing failure surface of [`crate::optimize::optimize`].
#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no candidate lots (with_estimated={with_estimated}, without_estimated={without_estimated})")]
    NoCandidates {
        with_estimated: usize,
        without_estimated: usize,
    },

    #[error("no feasible blend among {candidate_count} candidates")]
    NoFeasibleBlend {
        candidate_count: usize,
        estimated_would_help: bool,
    },

    #[error("optimization cancelled, {} partial solution(s) retained", partial.len())]
    Cancelled { partial: Vec<BlendSolution> },
}

/// Per-row ingestion failure, returned alongside the valid lots by
/// [`crate::lot::load_lots`].
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub row: usize,
    pub field: String,
    pub reason: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: field '{}': {}", self.row, self.field, self.reason)
    }
}
