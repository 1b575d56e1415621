use thiserror::Error;

pub type Result<T> = std::result::Result<T, SemquoteError>;

/// Crate-wide error type.
///
/// Variants carry owned payloads and the enum derives `Clone` because a load
/// outcome is fanned out to every caller awaiting the same in-flight load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemquoteError {
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Unexpected status {status} fetching {url}")]
    FetchStatus { url: String, status: u16 },

    #[error("Failed to parse metadata from {url}: {reason}")]
    MetadataParse { url: String, reason: String },

    #[error("Embedding buffer size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("No item with id {0}")]
    NotFound(usize),

    #[error("Background task failed: {0}")]
    Task(String),
}

pub mod config;
pub mod index;
pub mod lineage;
pub mod loader;
pub mod quantization;
pub mod search;
