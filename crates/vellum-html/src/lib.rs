//! Schema-aware HTML import and export.
//!
//! The boundary contract with page and import components: recognized tags
//! map losslessly to node and mark types, unrecognized tags are flattened
//! to their text content (never dropped wholesale), and unknown
//! attributes are dropped. Serialization round-trips after one
//! normalization pass: `parse(serialize(parse(x))) == parse(x)`.

pub mod error;
pub mod links;
pub mod parse;
pub mod serialize;

pub use error::{HtmlError, Result};
pub use links::{extract_links, LinkRef};
pub use parse::parse_html;
pub use serialize::serialize_html;
