//! Node and mark type specifications.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The structural role a node type plays in the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// The document root.
    Document,
    /// A block-level node (paragraph, heading, ...).
    Block,
    /// An inline node (hard break, hyperlink, annotation).
    Inline,
    /// A run of text.
    Text,
}

/// Specification for a single attribute.
///
/// An attribute without a default is required; one with a default is filled
/// in when omitted at construction time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttrSpec {
    pub default: Option<Value>,
}

impl AttrSpec {
    /// A required attribute.
    pub fn required() -> Self {
        Self { default: None }
    }

    /// An optional attribute with a default value.
    pub fn optional(default: Value) -> Self {
        Self {
            default: Some(default),
        }
    }
}

/// What children a node type may contain.
///
/// Allowed entries name either a node type or a group (`"block"`,
/// `"inline"`); a child satisfies a term if its type name or its group
/// matches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ContentModel {
    /// No content at all (atoms such as hard breaks).
    None,
    /// Raw text content (text nodes and text-bearing inline nodes).
    Text,
    /// A sequence of inline children drawn from the allowed set.
    Inline { allowed: Vec<String> },
    /// A sequence of block children drawn from the allowed set, with a
    /// minimum count (the document root requires at least one block).
    Blocks { allowed: Vec<String>, min: usize },
}

/// Specification for a node type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: NodeKind,
    /// Group this type belongs to, if any (`"block"`, `"inline"`).
    pub group: Option<String>,
    pub attrs: BTreeMap<String, AttrSpec>,
    pub content: ContentModel,
    /// Whether inline marks may be applied to this node.
    pub marks_allowed: bool,
}

impl NodeSpec {
    pub fn new(kind: NodeKind, content: ContentModel) -> Self {
        let group = match kind {
            NodeKind::Block => Some("block".to_string()),
            NodeKind::Inline | NodeKind::Text => Some("inline".to_string()),
            NodeKind::Document => None,
        };
        Self {
            kind,
            group,
            attrs: BTreeMap::new(),
            content,
            marks_allowed: matches!(kind, NodeKind::Text),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, spec: AttrSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }

    pub fn with_marks(mut self, allowed: bool) -> Self {
        self.marks_allowed = allowed;
        self
    }

    /// Check whether a child with the given type name and group satisfies
    /// this node's content model.
    pub fn allows_child(&self, child_type: &str, child_group: Option<&str>) -> bool {
        let allowed = match &self.content {
            ContentModel::Inline { allowed } => allowed,
            ContentModel::Blocks { allowed, .. } => allowed,
            ContentModel::None | ContentModel::Text => return false,
        };
        allowed
            .iter()
            .any(|term| term == child_type || Some(term.as_str()) == child_group)
    }
}

/// Specification for a mark type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkSpec {
    pub attrs: BTreeMap<String, AttrSpec>,
}

impl MarkSpec {
    pub fn new() -> Self {
        Self {
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, spec: AttrSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }
}

impl Default for MarkSpec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attr_spec_required_vs_optional() {
        assert_eq!(AttrSpec::required().default, None);
        assert_eq!(
            AttrSpec::optional(json!(null)).default,
            Some(Value::Null)
        );
    }

    #[test]
    fn test_allows_child_by_type_and_group() {
        let spec = NodeSpec::new(
            NodeKind::Document,
            ContentModel::Blocks {
                allowed: vec!["block".to_string()],
                min: 1,
            },
        );
        assert!(spec.allows_child("paragraph", Some("block")));
        assert!(spec.allows_child("block", None));
        assert!(!spec.allows_child("text", Some("inline")));
    }

    #[test]
    fn test_atom_allows_no_children() {
        let spec = NodeSpec::new(NodeKind::Inline, ContentModel::None);
        assert!(!spec.allows_child("text", Some("inline")));
    }
}
