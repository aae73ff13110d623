//! Error types for document tree operations.

use thiserror::Error;
use vellum_schema::SchemaViolation;

/// Errors that can occur when building or editing a document tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocError {
    #[error(transparent)]
    Schema(#[from] SchemaViolation),

    #[error("Position {pos} out of bounds (document length {len})")]
    OutOfBounds { pos: usize, len: usize },

    #[error("Invalid range: {from}..{to}")]
    InvalidRange { from: usize, to: usize },
}

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocError>;
