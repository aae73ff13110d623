//! Error types for the collaboration layer.

use thiserror::Error;
use vellum_doc::DocError;

/// Errors surfaced by the coordinator.
///
/// A stale base version is not an error: it takes the rebase path. Only
/// schema violations and bookkeeping mistakes reject a submission.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollabError {
    #[error(transparent)]
    Step(#[from] DocError),

    #[error("Unknown document: {0}")]
    UnknownDocument(String),

    #[error("Document already exists: {0}")]
    DocumentExists(String),

    #[error("Unknown client: {0}")]
    UnknownClient(String),

    #[error("Base version {base} is ahead of current version {current}")]
    FutureBaseVersion { base: u64, current: u64 },
}

/// Result type for collaboration operations.
pub type Result<T> = std::result::Result<T, CollabError>;
