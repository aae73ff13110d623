//! Immutable document trees for Vellum.
//!
//! A document is a tree of typed nodes built against a
//! [`vellum_schema::Schema`]: a `doc` root holding block nodes, each block
//! holding inline content (text runs with marks, hard breaks, hyperlinks,
//! annotations). Trees are immutable; every edit produces a new version
//! that shares untouched subtrees with the old one, so holding a reference
//! to an old version stays valid and cheap.
//!
//! Positions address the document-order inline flattening: each text
//! character and inline atom counts one unit, and each block contributes
//! one trailing break token.

pub mod document;
pub mod error;
pub mod fragment;
pub mod node;
pub mod position;

pub use document::{DocId, Document};
pub use error::{DocError, Result};
pub use fragment::{blocks_from_tokens, tokenize_blocks, Fragment, InlineToken};
pub use node::{Mark, Node, NodeContent};
pub use position::Resolved;
