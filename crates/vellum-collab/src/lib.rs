//! Collaboration coordinator for Vellum documents.
//!
//! The coordinator is the serialization point of the whole engine: it
//! owns the canonical tree and version log for every open document,
//! accepts step batches tagged with a client id and base version, rebases
//! stale batches against the log entries the client has not seen, appends
//! them atomically, and broadcasts the accepted form to every connected
//! client. Every client observes accepted batches in the same total
//! order, which is what makes all replicas converge.

pub mod coordinator;
pub mod error;
pub mod log;
pub mod message;
pub mod overlay;

pub use coordinator::{ClientSession, Coordinator, CoordinatorConfig, SubmitOutcome};
pub use error::{CollabError, Result};
pub use log::{LogEntry, VersionLog};
pub use message::{ClientId, ClientMessage, RejectReason, ServerMessage};
pub use overlay::{Annotation, AnnotationId, Overlay, Selection};
