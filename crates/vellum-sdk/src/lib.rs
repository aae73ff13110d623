//! Vellum SDK - high-level client surface for collaborative hypertext
//! editing.
//!
//! The SDK wraps the core engine (schema, tree, steps, coordinator) in an
//! optimistic client: edits apply locally at once, travel to the
//! coordinator in batches, and every broadcast re-derives the local tree
//! so all participants converge on the identical document.
//!
//! # Quick start
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use vellum_collab::{ClientId, Coordinator};
//! use vellum_doc::{DocId, Document, Node};
//! use vellum_schema::Schema;
//! use vellum_step::Step;
//!
//! // A coordinator serving the hypertext schema.
//! let schema = Arc::new(Schema::hypertext());
//! let coordinator = Coordinator::new(schema.clone());
//!
//! // Open a document.
//! let doc = Document::from_root(
//!     DocId::from_string("notes"),
//!     Node::with_children(
//!         "doc",
//!         BTreeMap::new(),
//!         vec![Node::with_children(
//!             "paragraph",
//!             BTreeMap::new(),
//!             vec![Node::text("Hello world")],
//!         )],
//!     ),
//! );
//! coordinator.create_document(doc).unwrap();
//!
//! // Submit an edit and read back the canonical state.
//! let notes = DocId::from_string("notes");
//! coordinator
//!     .submit(&notes, ClientId::new("alice"), 0, 1, vec![Step::insert_text(11, "!")])
//!     .unwrap();
//! assert_eq!(coordinator.snapshot(&notes).unwrap().text(), "Hello world!");
//! ```
//!
//! # Architecture
//!
//! - [`client`] - the optimistic replica: local edits, pending batches,
//!   rebase on broadcast
//! - [`session`] - editor sessions wiring a replica to a transport, with
//!   an event feed
//! - [`transport`] - the reliable ordered channel abstraction and an
//!   in-memory implementation
//! - [`config`] - session tuning
//! - [`error`] - error types

pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use client::{Client, ReceiveOutcome};
pub use config::{SessionConfig, SessionConfigBuilder};
pub use error::{Result, SdkError};
pub use session::{EditorSession, SessionEvent};
pub use transport::{CollabTransport, MemoryTransport};

// Re-export commonly used engine types
pub use vellum_collab::{
    Annotation, AnnotationId, ClientId, ClientMessage, Coordinator, CoordinatorConfig, Selection,
    ServerMessage,
};
pub use vellum_doc::{DocId, Document, Fragment, Mark, Node};
pub use vellum_schema::Schema;
pub use vellum_step::Step;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::client::Client;
    pub use crate::config::SessionConfig;
    pub use crate::error::SdkError;
    pub use crate::session::{EditorSession, SessionEvent};
    pub use crate::transport::{CollabTransport, MemoryTransport};
    pub use vellum_collab::{Annotation, ClientId, Coordinator};
    pub use vellum_doc::{DocId, Document, Mark, Node};
    pub use vellum_schema::Schema;
    pub use vellum_step::Step;
}
