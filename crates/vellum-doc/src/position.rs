//! Position resolution.
//!
//! A position is an integer offset into the document-order inline
//! flattening and is only meaningful relative to a specific tree version;
//! positions computed against an older version must be mapped through every
//! intervening step before use.

use serde::{Deserialize, Serialize};

/// A position resolved into block coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolved {
    /// Index of the containing block; equals the block count when the
    /// position sits past the final block break (the document end).
    pub block: usize,
    /// Flat offset within the block's inline content, in
    /// `0..=inline_content_len` — the top of that range is the block's own
    /// break token.
    pub offset: usize,
}

impl Resolved {
    /// Whether this position sits exactly on the block's break token.
    pub fn at_break(&self, block_content_len: usize) -> bool {
        self.offset == block_content_len
    }
}
