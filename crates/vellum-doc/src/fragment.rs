//! Flattened content fragments.
//!
//! A [`Fragment`] is the flat form document content takes inside steps and
//! slices: a sequence of text runs, inline atoms, and block breaks. The
//! break token closes the current block and carries that block's type and
//! attributes, so a fragment spanning several blocks round-trips the block
//! structure.

use crate::node::{Mark, Node, NodeContent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One token of flattened inline content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum InlineToken {
    /// A run of text with a mark set. Flat length: character count.
    Text { text: String, marks: Vec<Mark> },
    /// An inline node (hard break, hyperlink, annotation). Flat length: 1.
    Atom(Arc<Node>),
    /// End of a block with the given type and attributes. Flat length: 1.
    Break {
        name: String,
        attrs: BTreeMap<String, Value>,
    },
}

impl InlineToken {
    pub fn flat_len(&self) -> usize {
        match self {
            InlineToken::Text { text, .. } => text.chars().count(),
            InlineToken::Atom(_) | InlineToken::Break { .. } => 1,
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self, InlineToken::Break { .. })
    }
}

/// A sequence of inline tokens; the content payload of insert and replace
/// steps and the result of slicing a document range.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    tokens: Vec<InlineToken>,
}

impl Fragment {
    pub fn new() -> Self {
        Self { tokens: Vec::new() }
    }

    pub fn from_tokens(tokens: Vec<InlineToken>) -> Self {
        let mut fragment = Fragment::new();
        for token in tokens {
            fragment.push(token);
        }
        fragment
    }

    /// A fragment holding a single unmarked text run.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            return Fragment::new();
        }
        Self {
            tokens: vec![InlineToken::Text {
                text,
                marks: Vec::new(),
            }],
        }
    }

    /// A fragment holding one block break.
    pub fn block_break(name: impl Into<String>, attrs: BTreeMap<String, Value>) -> Self {
        Self {
            tokens: vec![InlineToken::Break {
                name: name.into(),
                attrs,
            }],
        }
    }

    /// Append a token, merging adjacent text runs with equal mark sets and
    /// dropping empty runs.
    pub fn push(&mut self, token: InlineToken) {
        match &token {
            InlineToken::Text { text, .. } if text.is_empty() => return,
            _ => {}
        }
        if let (
            Some(InlineToken::Text {
                text: last,
                marks: last_marks,
            }),
            InlineToken::Text { text, marks },
        ) = (self.tokens.last_mut(), &token)
        {
            if last_marks == marks {
                last.push_str(text);
                return;
            }
        }
        self.tokens.push(token);
    }

    /// Append all of another fragment.
    pub fn extend(&mut self, other: Fragment) {
        for token in other.tokens {
            self.push(token);
        }
    }

    pub fn tokens(&self) -> &[InlineToken] {
        &self.tokens
    }

    /// Total flat length.
    pub fn flat_len(&self) -> usize {
        self.tokens.iter().map(InlineToken::flat_len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Plain-text projection (atoms and breaks contribute nothing).
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            if let InlineToken::Text { text, .. } = token {
                out.push_str(text);
            }
        }
        out
    }

    /// The sub-fragment covering flat offsets `[from, to)`, splitting text
    /// runs at the boundaries. Unit tokens are included when their single
    /// offset lies in the range.
    pub fn slice(&self, from: usize, to: usize) -> Fragment {
        let mut out = Fragment::new();
        let mut offset = 0;
        for token in &self.tokens {
            let len = token.flat_len();
            let start = offset;
            let end = offset + len;
            offset = end;
            if end <= from {
                continue;
            }
            if start >= to {
                break;
            }
            match token {
                InlineToken::Text { text, marks } => {
                    let cut_from = from.saturating_sub(start);
                    let cut_to = to.min(end) - start;
                    let piece: String = text
                        .chars()
                        .skip(cut_from)
                        .take(cut_to - cut_from)
                        .collect();
                    out.push(InlineToken::Text {
                        text: piece,
                        marks: marks.clone(),
                    });
                }
                other => out.push(other.clone()),
            }
        }
        out
    }
}

/// Flatten a run of blocks into tokens.
pub fn tokenize_blocks(blocks: &[Arc<Node>]) -> Vec<InlineToken> {
    let mut tokens = Vec::new();
    for block in blocks {
        for child in block.children() {
            if child.is_text() {
                if let NodeContent::Text(text) = child.content() {
                    tokens.push(InlineToken::Text {
                        text: text.clone(),
                        marks: child.marks().to_vec(),
                    });
                }
            } else {
                tokens.push(InlineToken::Atom(child.clone()));
            }
        }
        tokens.push(InlineToken::Break {
            name: block.name().to_string(),
            attrs: block.attrs().clone(),
        });
    }
    tokens
}

/// Rebuild blocks from a token stream. May return an empty vec; padding an
/// empty document back to one block is the document's concern.
///
/// Inline tokens accumulate until a break closes them into a block of the
/// break's type. Trailing inline content without a break is wrapped in
/// `trailing` (the block whose break was consumed by the edit) when given,
/// otherwise in the fallback block type.
pub fn blocks_from_tokens(
    tokens: &[InlineToken],
    trailing: Option<(String, BTreeMap<String, Value>)>,
    fallback_block: &str,
) -> Vec<Arc<Node>> {
    let mut blocks = Vec::new();
    let mut run: Vec<Node> = Vec::new();

    let close = |run: &mut Vec<Node>, name: &str, attrs: BTreeMap<String, Value>| {
        Arc::new(Node::with_children(name, attrs, std::mem::take(run)))
    };

    for token in tokens {
        match token {
            InlineToken::Text { text, marks } => {
                if text.is_empty() {
                    continue;
                }
                // Merge with a preceding run that carries the same marks.
                if let Some(last) = run.last_mut() {
                    if last.is_text() && last.marks() == marks.as_slice() {
                        let merged =
                            format!("{}{}", last.text_content().unwrap_or_default(), text);
                        *last = Node::text_with_marks(merged, marks.clone());
                        continue;
                    }
                }
                run.push(Node::text_with_marks(text.clone(), marks.clone()));
            }
            InlineToken::Atom(node) => run.push(node.as_ref().clone()),
            InlineToken::Break { name, attrs } => {
                blocks.push(close(&mut run, name, attrs.clone()));
            }
        }
    }

    if !run.is_empty() {
        let (name, attrs) = trailing
            .unwrap_or_else(|| (fallback_block.to_string(), BTreeMap::new()));
        blocks.push(close(&mut run, &name, attrs));
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_merges_equal_mark_runs() {
        let mut fragment = Fragment::new();
        fragment.push(InlineToken::Text {
            text: "ab".to_string(),
            marks: vec![],
        });
        fragment.push(InlineToken::Text {
            text: "cd".to_string(),
            marks: vec![],
        });
        assert_eq!(fragment.tokens().len(), 1);
        assert_eq!(fragment.to_text(), "abcd");
    }

    #[test]
    fn test_push_keeps_distinct_mark_runs() {
        let mut fragment = Fragment::new();
        fragment.push(InlineToken::Text {
            text: "ab".to_string(),
            marks: vec![],
        });
        fragment.push(InlineToken::Text {
            text: "cd".to_string(),
            marks: vec![Mark::new("strong")],
        });
        assert_eq!(fragment.tokens().len(), 2);
    }

    #[test]
    fn test_flat_len() {
        let mut fragment = Fragment::text("abc");
        fragment.push(InlineToken::Break {
            name: "paragraph".to_string(),
            attrs: BTreeMap::new(),
        });
        assert_eq!(fragment.flat_len(), 4);
    }

    #[test]
    fn test_slice_splits_text_runs() {
        let fragment = Fragment::text("hello world");
        let cut = fragment.slice(6, 11);
        assert_eq!(cut.to_text(), "world");
        assert_eq!(cut.flat_len(), 5);
    }

    #[test]
    fn test_roundtrip_blocks() {
        let para = Arc::new(Node::with_children(
            "paragraph",
            BTreeMap::new(),
            vec![Node::text("hello")],
        ));
        let tokens = tokenize_blocks(&[para.clone()]);
        assert_eq!(tokens.len(), 2);
        let rebuilt = blocks_from_tokens(&tokens, None, "paragraph");
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt[0].as_ref(), para.as_ref());
    }

    #[test]
    fn test_trailing_content_wrapped() {
        let tokens = vec![InlineToken::Text {
            text: "loose".to_string(),
            marks: vec![],
        }];
        let rebuilt = blocks_from_tokens(&tokens, None, "paragraph");
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt[0].name(), "paragraph");
        assert_eq!(rebuilt[0].children().len(), 1);
    }

    #[test]
    fn test_empty_stream_yields_no_blocks() {
        assert!(blocks_from_tokens(&[], None, "paragraph").is_empty());
    }
}
