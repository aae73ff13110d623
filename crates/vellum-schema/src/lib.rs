//! Schema registry for Vellum documents.
//!
//! A [`Schema`] declares the closed set of node and mark types a document
//! may contain, together with their attribute specs and content models.
//! Schemas are built once at document-type initialization and never mutated
//! afterwards; a document that needs new types needs a new schema.

pub mod error;
pub mod registry;
pub mod spec;

pub use error::{Result, SchemaViolation};
pub use registry::{Schema, SchemaBuilder};
pub use spec::{AttrSpec, ContentModel, MarkSpec, NodeKind, NodeSpec};
