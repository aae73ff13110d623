//! Typed document nodes and inline marks.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use vellum_schema::{ContentModel, NodeKind, Schema, SchemaViolation};

/// An inline formatting mark: a type tag plus attributes, applied to a
/// contiguous run of inline content. Multiple marks may overlap on the
/// same run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub name: String,
    pub attrs: BTreeMap<String, Value>,
}

impl Mark {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attrs.insert(name.into(), value);
        self
    }

    /// Whether two marks share a type, regardless of attributes.
    pub fn same_type(&self, other: &Mark) -> bool {
        self.name == other.name
    }

    /// Whether a mark set contains a mark equal to this one.
    pub fn is_in(&self, set: &[Mark]) -> bool {
        set.iter().any(|m| m == self)
    }
}

/// The content carried by a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeContent {
    /// No content (atoms such as `hard_break`).
    None,
    /// Raw text (`text` nodes and text-bearing inline nodes).
    Text(String),
    /// Child nodes (block children of `doc`, inline children of blocks).
    Nodes(Vec<Arc<Node>>),
}

/// A node in the document tree.
///
/// A node's children must satisfy its type's content model at all times;
/// [`Node::validate`] is checked before any edited tree is committed, so a
/// violating tree is never observable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    name: String,
    attrs: BTreeMap<String, Value>,
    marks: Vec<Mark>,
    content: NodeContent,
}

impl Node {
    /// A plain text run.
    pub fn text(text: impl Into<String>) -> Node {
        Node {
            name: "text".to_string(),
            attrs: BTreeMap::new(),
            marks: Vec::new(),
            content: NodeContent::Text(text.into()),
        }
    }

    /// A text run with marks.
    pub fn text_with_marks(text: impl Into<String>, marks: Vec<Mark>) -> Node {
        Node {
            name: "text".to_string(),
            attrs: BTreeMap::new(),
            marks,
            content: NodeContent::Text(text.into()),
        }
    }

    /// A contentless node (atom).
    pub fn atom(name: impl Into<String>, attrs: BTreeMap<String, Value>) -> Node {
        Node {
            name: name.into(),
            attrs,
            marks: Vec::new(),
            content: NodeContent::None,
        }
    }

    /// A text-bearing inline node (hyperlink, annotation).
    pub fn inline_text(
        name: impl Into<String>,
        attrs: BTreeMap<String, Value>,
        text: impl Into<String>,
    ) -> Node {
        Node {
            name: name.into(),
            attrs,
            marks: Vec::new(),
            content: NodeContent::Text(text.into()),
        }
    }

    /// A node with child nodes.
    pub fn with_children(
        name: impl Into<String>,
        attrs: BTreeMap<String, Value>,
        children: Vec<Node>,
    ) -> Node {
        Node {
            name: name.into(),
            attrs,
            marks: Vec::new(),
            content: NodeContent::Nodes(children.into_iter().map(Arc::new).collect()),
        }
    }

    /// A node over already-shared children.
    pub fn with_shared_children(
        name: impl Into<String>,
        attrs: BTreeMap<String, Value>,
        children: Vec<Arc<Node>>,
    ) -> Node {
        Node {
            name: name.into(),
            attrs,
            marks: Vec::new(),
            content: NodeContent::Nodes(children),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attrs(&self) -> &BTreeMap<String, Value> {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn content(&self) -> &NodeContent {
        &self.content
    }

    /// Child nodes, or an empty slice for non-parent nodes.
    pub fn children(&self) -> &[Arc<Node>] {
        match &self.content {
            NodeContent::Nodes(children) => children,
            _ => &[],
        }
    }

    /// Text content, if this node carries raw text.
    pub fn text_content(&self) -> Option<&str> {
        match &self.content {
            NodeContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        self.name == "text"
    }

    /// Clone with a replacement mark set.
    pub fn replacing_marks(&self, marks: Vec<Mark>) -> Node {
        Node {
            name: self.name.clone(),
            attrs: self.attrs.clone(),
            marks,
            content: self.content.clone(),
        }
    }

    /// Flattened length of this node when it appears inline: text runs
    /// count their characters, every other inline node counts one unit.
    pub fn inline_len(&self) -> usize {
        match &self.content {
            NodeContent::Text(text) if self.is_text() => text.chars().count(),
            _ => 1,
        }
    }

    /// Flattened length of this node's inline content (blocks only).
    pub fn inline_content_len(&self) -> usize {
        self.children().iter().map(|c| c.inline_len()).sum()
    }

    /// Validate this node and its subtree against a schema.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        let spec = schema.node_spec(&self.name)?;
        schema.check_node_attrs(&self.name, &self.attrs)?;

        if !self.marks.is_empty() && !spec.marks_allowed {
            return Err(SchemaViolation::MarkNotAllowed {
                node_type: self.name.clone(),
                mark_type: self.marks[0].name.clone(),
            }
            .into());
        }
        for mark in &self.marks {
            schema.check_mark_attrs(&mark.name, &mark.attrs)?;
        }

        match (&spec.content, &self.content) {
            (ContentModel::None, NodeContent::None) => Ok(()),
            (ContentModel::Text, NodeContent::Text(_)) => Ok(()),
            (ContentModel::Inline { .. }, NodeContent::Nodes(children))
            | (ContentModel::Blocks { .. }, NodeContent::Nodes(children)) => {
                if let ContentModel::Blocks { min, .. } = &spec.content {
                    if children.len() < *min {
                        return Err(SchemaViolation::TooFewChildren {
                            node_type: self.name.clone(),
                            min: *min,
                            found: children.len(),
                        }
                        .into());
                    }
                }
                for child in children {
                    let child_spec = schema.node_spec(child.name())?;
                    if !spec.allows_child(child.name(), child_spec.group.as_deref()) {
                        return Err(SchemaViolation::ChildNotAllowed {
                            node_type: self.name.clone(),
                            child_type: child.name().to_string(),
                        }
                        .into());
                    }
                    let expected_inline = matches!(spec.content, ContentModel::Inline { .. });
                    let child_is_inline =
                        matches!(child_spec.kind, NodeKind::Inline | NodeKind::Text);
                    if expected_inline != child_is_inline {
                        return Err(SchemaViolation::ChildNotAllowed {
                            node_type: self.name.clone(),
                            child_type: child.name().to_string(),
                        }
                        .into());
                    }
                    child.validate(schema)?;
                }
                Ok(())
            }
            (expected, _) => Err(SchemaViolation::WrongContentKind {
                node_type: self.name.clone(),
                content: match expected {
                    ContentModel::None => "no",
                    ContentModel::Text => "text",
                    ContentModel::Inline { .. } => "inline",
                    ContentModel::Blocks { .. } => "block",
                },
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::hypertext()
    }

    #[test]
    fn test_text_node_inline_len_counts_chars() {
        assert_eq!(Node::text("héllo").inline_len(), 5);
        assert_eq!(Node::text("").inline_len(), 0);
    }

    #[test]
    fn test_atom_counts_one_unit() {
        let br = Node::atom("hard_break", BTreeMap::new());
        assert_eq!(br.inline_len(), 1);

        let mut attrs = BTreeMap::new();
        attrs.insert("href".to_string(), json!("https://example.com"));
        attrs.insert("title".to_string(), json!(null));
        let link = Node::inline_text("hyperlink", attrs, "example");
        assert_eq!(link.inline_len(), 1);
    }

    #[test]
    fn test_validate_well_formed_paragraph() {
        let para = Node::with_children(
            "paragraph",
            BTreeMap::new(),
            vec![Node::text("hello")],
        );
        para.validate(&schema()).unwrap();
    }

    #[test]
    fn test_validate_rejects_block_inside_block() {
        let bad = Node::with_children(
            "paragraph",
            BTreeMap::new(),
            vec![Node::with_children(
                "paragraph",
                BTreeMap::new(),
                vec![Node::text("nested")],
            )],
        );
        assert!(bad.validate(&schema()).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_doc() {
        let doc = Node::with_children("doc", BTreeMap::new(), vec![]);
        assert!(doc.validate(&schema()).is_err());
    }

    #[test]
    fn test_validate_rejects_missing_required_attr() {
        let link = Node::inline_text("hyperlink", BTreeMap::new(), "text");
        let para = Node::with_children("paragraph", BTreeMap::new(), vec![link]);
        assert!(para.validate(&schema()).is_err());
    }

    #[test]
    fn test_marks_on_text_validate() {
        let run = Node::text_with_marks("bold", vec![Mark::new("strong")]);
        let para = Node::with_children("paragraph", BTreeMap::new(), vec![run]);
        para.validate(&schema()).unwrap();
    }

    #[test]
    fn test_unknown_mark_rejected() {
        let run = Node::text_with_marks("x", vec![Mark::new("sparkle")]);
        let para = Node::with_children("paragraph", BTreeMap::new(), vec![run]);
        assert!(para.validate(&schema()).is_err());
    }
}
