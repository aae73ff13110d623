//! Error types for schema validation.

use thiserror::Error;

/// A structural or attribute constraint was violated.
///
/// Schema violations are fatal for the edit that produced them: the
/// offending tree version is discarded before it becomes observable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Unknown mark type: {0}")]
    UnknownMarkType(String),

    #[error("Missing required attribute `{attr}` on {owner}")]
    MissingAttr { owner: String, attr: String },

    #[error("Unexpected attribute `{attr}` on {owner}")]
    UnexpectedAttr { owner: String, attr: String },

    #[error("Node `{node_type}` does not allow child `{child_type}`")]
    ChildNotAllowed {
        node_type: String,
        child_type: String,
    },

    #[error("Node `{node_type}` requires at least {min} children, found {found}")]
    TooFewChildren {
        node_type: String,
        min: usize,
        found: usize,
    },

    #[error("Node `{node_type}` does not carry {content} content")]
    WrongContentKind {
        node_type: String,
        content: &'static str,
    },

    #[error("Mark `{mark_type}` is not allowed on node `{node_type}`")]
    MarkNotAllowed {
        node_type: String,
        mark_type: String,
    },
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaViolation>;
