//! Versioned documents over immutable trees.

use crate::error::{DocError, Result};
use crate::fragment::{blocks_from_tokens, tokenize_blocks, Fragment, InlineToken};
use crate::node::{Mark, Node};
use crate::position::Resolved;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use ulid::Ulid;
use vellum_schema::Schema;

/// Unique identifier for a document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocId(pub String);

impl DocId {
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Default for DocId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A document: identifier, current tree root, and version.
///
/// The version counts accepted step batches; it starts at 0 and increases
/// by exactly one per accepted batch. Documents are values: edits return
/// new documents sharing untouched blocks with the old tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: DocId,
    root: Arc<Node>,
    version: u64,
}

impl Document {
    /// An empty document: one empty block of the schema's default type.
    pub fn empty(schema: &Schema, id: DocId) -> Document {
        let block = Node::with_children(schema.default_block(), BTreeMap::new(), vec![]);
        Document {
            id,
            root: Arc::new(Node::with_children("doc", BTreeMap::new(), vec![block])),
            version: 0,
        }
    }

    /// A document over an existing root node at version 0.
    pub fn from_root(id: DocId, root: Node) -> Document {
        Document {
            id,
            root: Arc::new(root),
            version: 0,
        }
    }

    pub fn id(&self) -> &DocId {
        &self.id
    }

    pub fn root(&self) -> &Arc<Node> {
        &self.root
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// The same tree at a different version number.
    pub fn at_version(&self, version: u64) -> Document {
        Document {
            id: self.id.clone(),
            root: self.root.clone(),
            version,
        }
    }

    fn with_blocks(&self, blocks: Vec<Arc<Node>>, schema: &Schema) -> Document {
        let blocks = if blocks.is_empty() {
            vec![Arc::new(Node::with_children(
                schema.default_block(),
                BTreeMap::new(),
                vec![],
            ))]
        } else {
            blocks
        };
        Document {
            id: self.id.clone(),
            root: Arc::new(Node::with_shared_children(
                "doc",
                self.root.attrs().clone(),
                blocks,
            )),
            version: self.version,
        }
    }

    pub fn blocks(&self) -> &[Arc<Node>] {
        self.root.children()
    }

    /// Total flattened length: inline content plus one break per block.
    pub fn flat_len(&self) -> usize {
        self.blocks()
            .iter()
            .map(|b| b.inline_content_len() + 1)
            .sum()
    }

    /// Plain-text projection, blocks joined by newlines.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for (i, block) in self.blocks().iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            for child in block.children() {
                if let Some(text) = child.text_content() {
                    if child.is_text() {
                        out.push_str(text);
                    }
                }
            }
        }
        out
    }

    /// Validate the whole tree against a schema.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        self.root.validate(schema)?;
        Ok(())
    }

    /// Flat offset at which block `index` starts.
    fn block_start(&self, index: usize) -> usize {
        self.blocks()
            .iter()
            .take(index)
            .map(|b| b.inline_content_len() + 1)
            .sum()
    }

    /// Resolve a position into block coordinates.
    pub fn resolve(&self, pos: usize) -> Result<Resolved> {
        let len = self.flat_len();
        if pos > len {
            return Err(DocError::OutOfBounds { pos, len });
        }
        let mut start = 0;
        for (i, block) in self.blocks().iter().enumerate() {
            let span = block.inline_content_len() + 1;
            if pos < start + span {
                return Ok(Resolved {
                    block: i,
                    offset: pos - start,
                });
            }
            start += span;
        }
        // pos == len: past the final break.
        Ok(Resolved {
            block: self.blocks().len(),
            offset: 0,
        })
    }

    /// Resolve a position to a concrete node path and character offset, for
    /// rendering or content extraction.
    ///
    /// Returns `([block], child_count)` when the position sits on a block
    /// break, `([block, child], char_offset)` inside inline content, and
    /// `([], block_count)` at the document end.
    pub fn flatten_position(&self, pos: usize) -> Result<(Vec<usize>, usize)> {
        let resolved = self.resolve(pos)?;
        if resolved.block == self.blocks().len() {
            return Ok((vec![], self.blocks().len()));
        }
        let block = &self.blocks()[resolved.block];
        if resolved.at_break(block.inline_content_len()) {
            return Ok((vec![resolved.block], block.children().len()));
        }
        let mut offset = resolved.offset;
        for (ci, child) in block.children().iter().enumerate() {
            let len = child.inline_len();
            if offset < len {
                return Ok((vec![resolved.block, ci], offset));
            }
            offset -= len;
        }
        // Unreachable: offset < inline_content_len was checked above.
        Ok((vec![resolved.block], block.children().len()))
    }

    fn check_range(&self, from: usize, to: usize) -> Result<()> {
        let len = self.flat_len();
        if from > to {
            return Err(DocError::InvalidRange { from, to });
        }
        if to > len {
            return Err(DocError::OutOfBounds { pos: to, len });
        }
        Ok(())
    }

    /// Extract the content of `[from, to)` as a fragment, splitting text
    /// runs at the boundaries and keeping block breaks inside the range.
    pub fn slice(&self, from: usize, to: usize) -> Result<Fragment> {
        self.check_range(from, to)?;
        if from == to {
            return Ok(Fragment::new());
        }
        let wf = self.resolve(from)?.block;
        let wt = self.resolve(to)?.block.min(self.blocks().len() - 1);
        let window_start = self.block_start(wf);
        let mid = Fragment::from_tokens(tokenize_blocks(&self.blocks()[wf..=wt]));
        Ok(mid.slice(from - window_start, to - window_start))
    }

    /// Plain text covered by `[from, to)`.
    pub fn slice_text(&self, from: usize, to: usize) -> Result<String> {
        Ok(self.slice(from, to)?.to_text())
    }

    /// Replace `[from, to)` with a fragment, returning the new document.
    ///
    /// Blocks entirely outside the edited window are shared with the old
    /// tree. Deleting a block's break token merges it with its successor;
    /// deleting the final break re-wraps trailing content in the last
    /// edited block's type; an edit that empties the document leaves one
    /// empty default block.
    pub fn splice(
        &self,
        schema: &Schema,
        from: usize,
        to: usize,
        fragment: &Fragment,
    ) -> Result<Document> {
        self.check_range(from, to)?;
        let len = self.flat_len();
        let nblocks = self.blocks().len();

        // Insertion past the final break: append and re-wrap.
        if from == len {
            if fragment.is_empty() {
                return Ok(self.clone());
            }
            let rebuilt = blocks_from_tokens(fragment.tokens(), None, schema.default_block());
            let mut blocks = self.blocks().to_vec();
            blocks.extend(rebuilt);
            return Ok(self.with_blocks(blocks, schema));
        }

        let wf = self.resolve(from)?.block;
        let wt = if to == len {
            nblocks - 1
        } else {
            self.resolve(to)?.block
        };
        let window_start = self.block_start(wf);
        let window = &self.blocks()[wf..=wt];
        let mid = Fragment::from_tokens(tokenize_blocks(window));
        let mid_len = mid.flat_len();

        let mut spliced = mid.slice(0, from - window_start);
        spliced.extend(fragment.clone());
        spliced.extend(mid.slice(to - window_start, mid_len));

        // Trailing inline content lost its break: keep the last edited
        // block's identity rather than inventing a new one.
        let last = &window[window.len() - 1];
        let trailing = Some((last.name().to_string(), last.attrs().clone()));
        let rebuilt = blocks_from_tokens(spliced.tokens(), trailing, schema.default_block());

        let mut blocks: Vec<Arc<Node>> = self.blocks()[..wf].to_vec();
        blocks.extend(rebuilt);
        blocks.extend_from_slice(&self.blocks()[wt + 1..]);
        Ok(self.with_blocks(blocks, schema))
    }

    /// Apply a change to every inline token covered by `[from, to)`,
    /// splitting text runs at the boundaries. Breaks are never touched.
    fn transform_inline_range<F>(
        &self,
        schema: &Schema,
        from: usize,
        to: usize,
        mut apply: F,
    ) -> Result<Document>
    where
        F: FnMut(InlineToken) -> InlineToken,
    {
        self.check_range(from, to)?;
        if from == to {
            return Ok(self.clone());
        }
        let wf = self.resolve(from)?.block;
        let wt = self.resolve(to - 1)?.block.min(self.blocks().len() - 1);
        let window_start = self.block_start(wf);
        let local_from = from - window_start;
        let local_to = to - window_start;

        let mut out = Fragment::new();
        let mut offset = 0;
        for token in tokenize_blocks(&self.blocks()[wf..=wt]) {
            let tlen = token.flat_len();
            let (start, end) = (offset, offset + tlen);
            offset = end;
            if end <= local_from || start >= local_to || token.is_break() {
                out.push(token);
                continue;
            }
            match token {
                InlineToken::Text { text, marks } => {
                    let cut_from = local_from.saturating_sub(start);
                    let cut_to = (local_to.min(end)) - start;
                    let chars: Vec<char> = text.chars().collect();
                    let head: String = chars[..cut_from].iter().collect();
                    let body: String = chars[cut_from..cut_to].iter().collect();
                    let tail: String = chars[cut_to..].iter().collect();
                    out.push(InlineToken::Text {
                        text: head,
                        marks: marks.clone(),
                    });
                    out.push(apply(InlineToken::Text {
                        text: body,
                        marks: marks.clone(),
                    }));
                    out.push(InlineToken::Text { text: tail, marks });
                }
                atom => out.push(apply(atom)),
            }
        }

        let rebuilt = blocks_from_tokens(out.tokens(), None, schema.default_block());
        let mut blocks: Vec<Arc<Node>> = self.blocks()[..wf].to_vec();
        blocks.extend(rebuilt);
        blocks.extend_from_slice(&self.blocks()[wt + 1..]);
        Ok(self.with_blocks(blocks, schema))
    }

    /// Add a mark to every inline token in `[from, to)`. A mark of the
    /// same type is replaced; nodes whose spec forbids marks pass through
    /// unchanged.
    pub fn add_mark(
        &self,
        schema: &Schema,
        from: usize,
        to: usize,
        mark: &Mark,
    ) -> Result<Document> {
        schema.check_mark_attrs(&mark.name, &mark.attrs)?;
        self.transform_inline_range(schema, from, to, |token| match token {
            InlineToken::Text { text, mut marks } => {
                marks.retain(|m| !m.same_type(mark));
                marks.push(mark.clone());
                InlineToken::Text { text, marks }
            }
            InlineToken::Atom(node) => {
                let allowed = schema
                    .node_spec(node.name())
                    .map(|spec| spec.marks_allowed)
                    .unwrap_or(false);
                if allowed {
                    let mut marks: Vec<Mark> =
                        node.marks().iter().filter(|m| !m.same_type(mark)).cloned().collect();
                    marks.push(mark.clone());
                    InlineToken::Atom(Arc::new(node.replacing_marks(marks)))
                } else {
                    InlineToken::Atom(node)
                }
            }
            other => other,
        })
    }

    /// Remove every mark equal to `mark` from inline tokens in `[from, to)`.
    pub fn remove_mark(
        &self,
        schema: &Schema,
        from: usize,
        to: usize,
        mark: &Mark,
    ) -> Result<Document> {
        self.transform_inline_range(schema, from, to, |token| match token {
            InlineToken::Text { text, mut marks } => {
                marks.retain(|m| m != mark);
                InlineToken::Text { text, marks }
            }
            InlineToken::Atom(node) => {
                if node.marks().iter().any(|m| m == mark) {
                    let marks = node.marks().iter().filter(|m| *m != mark).cloned().collect();
                    InlineToken::Atom(Arc::new(node.replacing_marks(marks)))
                } else {
                    InlineToken::Atom(node)
                }
            }
            other => other,
        })
    }

    /// Ranges (flat `[from, to)`) covered by marks of the given type,
    /// coalescing adjacent runs. Used to split a type-wide mark removal
    /// into exactly-covered spans.
    pub fn mark_ranges(&self, mark_type: &str) -> Vec<(usize, usize, Mark)> {
        let mut ranges: Vec<(usize, usize, Mark)> = Vec::new();
        let mut offset = 0;
        for block in self.blocks() {
            for child in block.children() {
                let len = child.inline_len();
                if let Some(mark) = child.marks().iter().find(|m| m.name == mark_type) {
                    match ranges.last_mut() {
                        Some((_, end, last)) if *end == offset && last == mark => {
                            *end = offset + len;
                        }
                        _ => ranges.push((offset, offset + len, mark.clone())),
                    }
                }
                offset += len;
            }
            offset += 1;
        }
        ranges
    }
}
