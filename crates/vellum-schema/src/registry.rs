//! The schema registry: a closed, immutable set of node and mark types.

use crate::error::{Result, SchemaViolation};
use crate::spec::{AttrSpec, ContentModel, MarkSpec, NodeKind, NodeSpec};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// A registry of node and mark types with their content models.
///
/// Built once via [`SchemaBuilder`] and never mutated at runtime. Adding a
/// new node or mark kind means building a new schema version; live
/// documents keep the schema they were opened with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    nodes: BTreeMap<String, NodeSpec>,
    marks: BTreeMap<String, MarkSpec>,
    /// Block type used when an edit leaves content without an enclosing
    /// block (e.g. the whole document was deleted).
    default_block: String,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Look up a node type spec.
    pub fn node_spec(&self, name: &str) -> Result<&NodeSpec> {
        self.nodes
            .get(name)
            .ok_or_else(|| SchemaViolation::UnknownNodeType(name.to_string()))
    }

    /// Look up a mark type spec.
    pub fn mark_spec(&self, name: &str) -> Result<&MarkSpec> {
        self.marks
            .get(name)
            .ok_or_else(|| SchemaViolation::UnknownMarkType(name.to_string()))
    }

    /// Whether a node type exists in this schema.
    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Whether a mark type exists in this schema.
    pub fn has_mark(&self, name: &str) -> bool {
        self.marks.contains_key(name)
    }

    /// Iterate all node type names.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Iterate all mark type names.
    pub fn mark_names(&self) -> impl Iterator<Item = &str> {
        self.marks.keys().map(String::as_str)
    }

    /// The block type used to re-wrap orphaned inline content.
    pub fn default_block(&self) -> &str {
        &self.default_block
    }

    /// Validate an attribute map against a spec'd attribute set, filling in
    /// defaults for omitted optional attributes. Returns the completed map.
    pub fn check_attrs(
        owner: &str,
        specs: &BTreeMap<String, AttrSpec>,
        attrs: &BTreeMap<String, Value>,
    ) -> Result<BTreeMap<String, Value>> {
        for name in attrs.keys() {
            if !specs.contains_key(name) {
                return Err(SchemaViolation::UnexpectedAttr {
                    owner: owner.to_string(),
                    attr: name.clone(),
                });
            }
        }
        let mut complete = attrs.clone();
        for (name, spec) in specs {
            if complete.contains_key(name) {
                continue;
            }
            match &spec.default {
                Some(default) => {
                    complete.insert(name.clone(), default.clone());
                }
                None => {
                    return Err(SchemaViolation::MissingAttr {
                        owner: owner.to_string(),
                        attr: name.clone(),
                    })
                }
            }
        }
        Ok(complete)
    }

    /// Validate node attributes, returning the completed map.
    pub fn check_node_attrs(
        &self,
        node_type: &str,
        attrs: &BTreeMap<String, Value>,
    ) -> Result<BTreeMap<String, Value>> {
        let spec = self.node_spec(node_type)?;
        Self::check_attrs(node_type, &spec.attrs, attrs)
    }

    /// Validate mark attributes, returning the completed map.
    pub fn check_mark_attrs(
        &self,
        mark_type: &str,
        attrs: &BTreeMap<String, Value>,
    ) -> Result<BTreeMap<String, Value>> {
        let spec = self.mark_spec(mark_type)?;
        Self::check_attrs(mark_type, &spec.attrs, attrs)
    }

    /// The hypertext document schema.
    ///
    /// Nodes: `doc`, `paragraph`, `heading`, `code_block`, `blockquote`,
    /// `list_item`, `text`, `hard_break`, `hyperlink`, `annotation`.
    /// Marks: `strong`, `em`, `code`, `link`, `comment`.
    pub fn hypertext() -> Schema {
        let inline = || ContentModel::Inline {
            allowed: vec!["inline".to_string()],
        };

        Schema::builder()
            .node(
                "doc",
                NodeSpec::new(
                    NodeKind::Document,
                    ContentModel::Blocks {
                        allowed: vec!["block".to_string()],
                        min: 1,
                    },
                ),
            )
            .node("paragraph", NodeSpec::new(NodeKind::Block, inline()))
            .node(
                "heading",
                NodeSpec::new(NodeKind::Block, inline())
                    .with_attr("level", AttrSpec::optional(json!(1))),
            )
            .node("code_block", NodeSpec::new(NodeKind::Block, inline()))
            .node("blockquote", NodeSpec::new(NodeKind::Block, inline()))
            .node(
                "list_item",
                NodeSpec::new(NodeKind::Block, inline())
                    .with_attr("kind", AttrSpec::optional(json!("bullet")))
                    .with_attr("indent", AttrSpec::optional(json!(0))),
            )
            .node("text", NodeSpec::new(NodeKind::Text, ContentModel::Text))
            .node(
                "hard_break",
                NodeSpec::new(NodeKind::Inline, ContentModel::None),
            )
            .node(
                "hyperlink",
                NodeSpec::new(NodeKind::Inline, ContentModel::Text)
                    .with_attr("href", AttrSpec::required())
                    .with_attr("title", AttrSpec::optional(json!(null)))
                    .with_marks(true),
            )
            .node(
                "annotation",
                NodeSpec::new(NodeKind::Inline, ContentModel::Text)
                    .with_attr("id", AttrSpec::required())
                    .with_attr("author", AttrSpec::required())
                    .with_attr("timestamp", AttrSpec::optional(json!(null)))
                    .with_marks(true),
            )
            .mark("strong", MarkSpec::new())
            .mark("em", MarkSpec::new())
            .mark("code", MarkSpec::new())
            .mark(
                "link",
                MarkSpec::new()
                    .with_attr("href", AttrSpec::required())
                    .with_attr("title", AttrSpec::optional(json!(null))),
            )
            .mark(
                "comment",
                MarkSpec::new()
                    .with_attr("id", AttrSpec::required())
                    .with_attr("author", AttrSpec::required())
                    .with_attr("comment", AttrSpec::required()),
            )
            .default_block("paragraph")
            .build()
    }
}

/// Builder for [`Schema`].
pub struct SchemaBuilder {
    nodes: BTreeMap<String, NodeSpec>,
    marks: BTreeMap<String, MarkSpec>,
    default_block: String,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            marks: BTreeMap::new(),
            default_block: "paragraph".to_string(),
        }
    }

    pub fn node(mut self, name: impl Into<String>, spec: NodeSpec) -> Self {
        self.nodes.insert(name.into(), spec);
        self
    }

    pub fn mark(mut self, name: impl Into<String>, spec: MarkSpec) -> Self {
        self.marks.insert(name.into(), spec);
        self
    }

    pub fn default_block(mut self, name: impl Into<String>) -> Self {
        self.default_block = name.into();
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            nodes: self.nodes,
            marks: self.marks,
            default_block: self.default_block,
        }
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hypertext_schema_types() {
        let schema = Schema::hypertext();
        assert!(schema.has_node("doc"));
        assert!(schema.has_node("paragraph"));
        assert!(schema.has_node("hyperlink"));
        assert!(schema.has_node("annotation"));
        assert!(schema.has_mark("strong"));
        assert!(schema.has_mark("comment"));
        assert!(!schema.has_node("image"));
    }

    #[test]
    fn test_unknown_type_is_violation() {
        let schema = Schema::hypertext();
        assert!(matches!(
            schema.node_spec("video"),
            Err(SchemaViolation::UnknownNodeType(_))
        ));
        assert!(matches!(
            schema.mark_spec("underline"),
            Err(SchemaViolation::UnknownMarkType(_))
        ));
    }

    #[test]
    fn test_check_attrs_fills_defaults() {
        let schema = Schema::hypertext();
        let attrs = schema
            .check_node_attrs("heading", &BTreeMap::new())
            .unwrap();
        assert_eq!(attrs.get("level"), Some(&json!(1)));
    }

    #[test]
    fn test_check_attrs_rejects_missing_required() {
        let schema = Schema::hypertext();
        let err = schema
            .check_node_attrs("hyperlink", &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, SchemaViolation::MissingAttr { .. }));
    }

    #[test]
    fn test_check_attrs_rejects_unknown() {
        let schema = Schema::hypertext();
        let mut attrs = BTreeMap::new();
        attrs.insert("color".to_string(), json!("red"));
        let err = schema.check_node_attrs("paragraph", &attrs).unwrap_err();
        assert!(matches!(err, SchemaViolation::UnexpectedAttr { .. }));
    }

    #[test]
    fn test_doc_content_model() {
        let schema = Schema::hypertext();
        let doc = schema.node_spec("doc").unwrap();
        assert!(doc.allows_child("paragraph", Some("block")));
        assert!(!doc.allows_child("text", Some("inline")));
        let para = schema.node_spec("paragraph").unwrap();
        assert!(para.allows_child("text", Some("inline")));
        assert!(para.allows_child("hyperlink", Some("inline")));
        assert!(!para.allows_child("paragraph", Some("block")));
    }
}
