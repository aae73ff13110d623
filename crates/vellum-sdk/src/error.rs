//! Error types for the SDK.

use thiserror::Error;
use vellum_collab::CollabError;
use vellum_doc::DocError;

/// Error type for SDK operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SdkError {
    #[error(transparent)]
    Collab(#[from] CollabError),

    #[error(transparent)]
    Doc(#[from] DocError),

    #[error("Broadcast gap: expected version {expected}, received {got}")]
    VersionGap { expected: u64, got: u64 },

    #[error("Not connected to a document")]
    NotConnected,

    #[error("Broadcast channel closed")]
    ChannelClosed,

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;
