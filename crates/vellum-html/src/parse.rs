//! HTML to document tree.
//!
//! A small forgiving tokenizer feeds a builder that knows the hypertext
//! schema's tag vocabulary. Fixed policy: recognized tags become nodes
//! and marks with their attributes preserved; unrecognized tags vanish
//! but their text content stays; recognized tags missing a required
//! attribute (an `<a>` without `href`) are flattened to text as well.

use crate::error::Result;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use vellum_doc::{blocks_from_tokens, DocId, Document, Fragment, InlineToken, Mark, Node};
use vellum_schema::Schema;

#[derive(Debug)]
enum HtmlToken {
    Text(String),
    Open {
        name: String,
        attrs: BTreeMap<String, String>,
        self_closing: bool,
    },
    Close(String),
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn tokenize(html: &str) -> Vec<HtmlToken> {
    let mut tokens = Vec::new();
    let mut chars = html.char_indices().peekable();
    let mut text = String::new();

    while let Some((_, c)) = chars.next() {
        if c != '<' {
            text.push(c);
            continue;
        }
        if !text.is_empty() {
            tokens.push(HtmlToken::Text(decode_entities(&text)));
            text.clear();
        }
        // Collect the raw tag up to '>'.
        let mut raw = String::new();
        for (_, t) in chars.by_ref() {
            if t == '>' {
                break;
            }
            raw.push(t);
        }
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('!') || raw.starts_with('?') {
            continue; // comments, doctype
        }
        if let Some(name) = raw.strip_prefix('/') {
            tokens.push(HtmlToken::Close(name.trim().to_ascii_lowercase()));
            continue;
        }
        let self_closing = raw.ends_with('/');
        let raw = raw.trim_end_matches('/').trim();
        let (name, rest) = match raw.find(char::is_whitespace) {
            Some(i) => (&raw[..i], &raw[i..]),
            None => (raw, ""),
        };
        tokens.push(HtmlToken::Open {
            name: name.to_ascii_lowercase(),
            attrs: parse_attrs(rest),
            self_closing,
        });
    }
    if !text.is_empty() {
        tokens.push(HtmlToken::Text(decode_entities(&text)));
    }
    tokens
}

fn parse_attrs(raw: &str) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    let mut rest = raw.trim();
    while !rest.is_empty() {
        let name_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let name = rest[..name_end].trim().to_ascii_lowercase();
        rest = rest[name_end..].trim_start();
        if name.is_empty() {
            break;
        }
        if let Some(stripped) = rest.strip_prefix('=') {
            let stripped = stripped.trim_start();
            let (value, remaining) = if let Some(q) = stripped.strip_prefix('"') {
                match q.find('"') {
                    Some(end) => (&q[..end], &q[end + 1..]),
                    None => (q, ""),
                }
            } else if let Some(q) = stripped.strip_prefix('\'') {
                match q.find('\'') {
                    Some(end) => (&q[..end], &q[end + 1..]),
                    None => (q, ""),
                }
            } else {
                match stripped.find(char::is_whitespace) {
                    Some(end) => (&stripped[..end], &stripped[end..]),
                    None => (stripped, ""),
                }
            };
            attrs.insert(name, decode_entities(value));
            rest = remaining.trim_start();
        } else {
            attrs.insert(name, String::new());
        }
    }
    attrs
}

/// The tag vocabulary the builder recognizes.
fn block_for_tag(name: &str, list_kind: Option<&str>) -> Option<(String, BTreeMap<String, Value>)> {
    let mut attrs = BTreeMap::new();
    let block = match name {
        "p" => "paragraph",
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level: i64 = name[1..].parse().unwrap_or(1);
            attrs.insert("level".to_string(), json!(level));
            "heading"
        }
        "pre" => "code_block",
        "blockquote" => "blockquote",
        "li" => {
            attrs.insert(
                "kind".to_string(),
                json!(list_kind.unwrap_or("bullet")),
            );
            attrs.insert("indent".to_string(), json!(0));
            "list_item"
        }
        _ => return None,
    };
    Some((block.to_string(), attrs))
}

fn simple_mark_for_tag(name: &str) -> Option<Mark> {
    match name {
        "strong" | "b" => Some(Mark::new("strong")),
        "em" | "i" => Some(Mark::new("em")),
        "code" => Some(Mark::new("code")),
        _ => None,
    }
}

fn comment_mark(attrs: &BTreeMap<String, String>) -> Option<Mark> {
    let id = attrs.get("data-id")?;
    let author = attrs.get("data-author")?;
    let comment = attrs.get("data-comment")?;
    Some(
        Mark::new("comment")
            .with_attr("id", json!(id))
            .with_attr("author", json!(author))
            .with_attr("comment", json!(comment)),
    )
}

struct Builder {
    tokens: Vec<InlineToken>,
    /// Block identity of the currently open recognized block tag.
    open_block: Option<(String, BTreeMap<String, Value>)>,
    /// Whether any inline content is pending inside the current block.
    pending_inline: bool,
    marks: Vec<Mark>,
    list_stack: Vec<String>,
    /// One entry per open `<span>`: whether it contributed a comment mark.
    span_stack: Vec<bool>,
    /// Text capture for an open inline container (`<a>`, annotation span).
    capture: Option<(String, BTreeMap<String, Value>, String)>,
}

impl Builder {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            open_block: None,
            pending_inline: false,
            marks: Vec::new(),
            list_stack: Vec::new(),
            span_stack: Vec::new(),
            capture: None,
        }
    }

    fn push_text(&mut self, text: String) {
        if let Some((_, _, buffer)) = self.capture.as_mut() {
            buffer.push_str(&text);
            return;
        }
        if text.trim().is_empty() && !self.pending_inline && self.open_block.is_none() {
            return; // inter-tag whitespace
        }
        self.tokens.push(InlineToken::Text {
            text,
            marks: self.marks.clone(),
        });
        self.pending_inline = true;
    }

    fn close_block(&mut self) {
        let explicit = self.open_block.is_some();
        let (name, attrs) = self
            .open_block
            .take()
            .unwrap_or_else(|| ("paragraph".to_string(), BTreeMap::new()));
        if explicit || self.pending_inline {
            self.tokens.push(InlineToken::Break { name, attrs });
        }
        self.pending_inline = false;
    }

    fn open(&mut self, name: &str, attrs: BTreeMap<String, String>, self_closing: bool) {
        if self.capture.is_some() {
            return; // no nested structure inside inline containers
        }
        match name {
            "br" => {
                self.tokens.push(InlineToken::Atom(
                    Node::atom("hard_break", BTreeMap::new()).into(),
                ));
                self.pending_inline = true;
            }
            "ul" => self.list_stack.push("bullet".to_string()),
            "ol" => self.list_stack.push("ordered".to_string()),
            "a" => {
                if let Some(href) = attrs.get("href") {
                    let mut node_attrs = BTreeMap::new();
                    node_attrs.insert("href".to_string(), json!(href));
                    node_attrs.insert(
                        "title".to_string(),
                        attrs.get("title").map(|t| json!(t)).unwrap_or(Value::Null),
                    );
                    self.capture = Some(("hyperlink".to_string(), node_attrs, String::new()));
                }
                // An <a> without href flattens to text.
            }
            "span" => {
                let class = attrs.get("class").map(String::as_str);
                if class == Some("annotation") {
                    if let (Some(id), Some(author)) =
                        (attrs.get("data-id"), attrs.get("data-author"))
                    {
                        let mut node_attrs = BTreeMap::new();
                        node_attrs.insert("id".to_string(), json!(id));
                        node_attrs.insert("author".to_string(), json!(author));
                        node_attrs.insert(
                            "timestamp".to_string(),
                            attrs
                                .get("data-timestamp")
                                .map(|t| json!(t))
                                .unwrap_or(Value::Null),
                        );
                        self.capture =
                            Some(("annotation".to_string(), node_attrs, String::new()));
                        return;
                    }
                }
                if class == Some("comment") {
                    if let Some(mark) = comment_mark(&attrs) {
                        self.marks.push(mark);
                        self.span_stack.push(true);
                        return;
                    }
                }
                self.span_stack.push(false);
            }
            _ => {
                if let Some(mark) = simple_mark_for_tag(name) {
                    if !self_closing {
                        self.marks.push(mark);
                    }
                } else if let Some((block, block_attrs)) =
                    block_for_tag(name, self.list_stack.last().map(String::as_str))
                {
                    // A new block implicitly closes pending loose content.
                    if self.pending_inline {
                        self.close_block();
                    }
                    self.open_block = Some((block, block_attrs));
                }
                // Anything else: unrecognized, flattened.
            }
        }
    }

    fn remove_innermost_mark(&mut self, mark_type: &str) {
        if let Some(index) = self.marks.iter().rposition(|m| m.name == mark_type) {
            self.marks.remove(index);
        }
    }

    fn close(&mut self, name: &str) {
        if let Some((node_name, attrs, text)) = self.capture.take() {
            let expected = match node_name.as_str() {
                "hyperlink" => "a",
                _ => "span",
            };
            if name == expected {
                self.tokens.push(InlineToken::Atom(
                    Node::inline_text(node_name, attrs, text).into(),
                ));
                self.pending_inline = true;
            } else {
                self.capture = Some((node_name, attrs, text));
            }
            return;
        }
        match name {
            "ul" | "ol" => {
                self.list_stack.pop();
            }
            "strong" | "b" => self.remove_innermost_mark("strong"),
            "em" | "i" => self.remove_innermost_mark("em"),
            "code" => self.remove_innermost_mark("code"),
            "span" => {
                if self.span_stack.pop() == Some(true) {
                    self.remove_innermost_mark("comment");
                }
            }
            _ => {
                if block_for_tag(name, None).is_some() {
                    self.close_block();
                }
            }
        }
    }

    fn finish(mut self, schema: &Schema, id: DocId) -> Result<Document> {
        if self.pending_inline {
            self.close_block();
        }
        let fragment = Fragment::from_tokens(self.tokens);
        let blocks = blocks_from_tokens(fragment.tokens(), None, schema.default_block());
        let doc = if blocks.is_empty() {
            Document::empty(schema, id)
        } else {
            Document::from_root(
                id,
                Node::with_shared_children("doc", BTreeMap::new(), blocks),
            )
        };
        doc.validate(schema)?;
        Ok(doc)
    }
}

/// Parse external HTML into a typed document tree.
pub fn parse_html(schema: &Schema, id: DocId, html: &str) -> Result<Document> {
    let mut builder = Builder::new();
    for token in tokenize(html) {
        match token {
            HtmlToken::Text(text) => builder.push_text(text),
            HtmlToken::Open {
                name,
                attrs,
                self_closing,
            } => builder.open(&name, attrs, self_closing),
            HtmlToken::Close(name) => builder.close(&name),
        }
    }
    builder.finish(schema, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> Document {
        parse_html(&Schema::hypertext(), DocId::from_string("t"), html).unwrap()
    }

    #[test]
    fn test_paragraphs_and_headings() {
        let doc = parse("<h1>Title</h1><p>Body text</p>");
        assert_eq!(doc.blocks().len(), 2);
        assert_eq!(doc.blocks()[0].name(), "heading");
        assert_eq!(doc.blocks()[0].attr("level"), Some(&json!(1)));
        assert_eq!(doc.text(), "Title\nBody text");
    }

    #[test]
    fn test_marks_nest() {
        let doc = parse("<p>plain <strong>bold <em>both</em></strong></p>");
        let children = doc.blocks()[0].children();
        assert_eq!(children.len(), 3);
        assert!(children[0].marks().is_empty());
        assert_eq!(children[1].marks(), &[Mark::new("strong")]);
        assert_eq!(
            children[2].marks(),
            &[Mark::new("strong"), Mark::new("em")]
        );
    }

    #[test]
    fn test_hyperlink_node() {
        let doc = parse(r#"<p>see <a href="https://example.com" title="ex">this</a></p>"#);
        let children = doc.blocks()[0].children();
        assert_eq!(children[1].name(), "hyperlink");
        assert_eq!(children[1].attr("href"), Some(&json!("https://example.com")));
        assert_eq!(children[1].text_content(), Some("this"));
    }

    #[test]
    fn test_anchor_without_href_flattens() {
        let doc = parse("<p>see <a>this</a></p>");
        assert_eq!(doc.text(), "see this");
        assert_eq!(doc.blocks()[0].children().len(), 1);
    }

    #[test]
    fn test_annotation_span() {
        let doc = parse(
            r#"<p><span class="annotation" data-id="a1" data-author="alice">noted</span></p>"#,
        );
        let node = &doc.blocks()[0].children()[0];
        assert_eq!(node.name(), "annotation");
        assert_eq!(node.attr("author"), Some(&json!("alice")));
        assert_eq!(node.text_content(), Some("noted"));
    }

    #[test]
    fn test_unrecognized_tags_flatten_to_text() {
        let doc = parse("<div><p>kept <widget>inner</widget> text</p></div>");
        assert_eq!(doc.text(), "kept inner text");
    }

    #[test]
    fn test_unknown_attrs_dropped() {
        let doc = parse(r#"<p style="color:red" onclick="evil()">hi</p>"#);
        assert!(doc.blocks()[0].attrs().is_empty());
        assert_eq!(doc.text(), "hi");
    }

    #[test]
    fn test_lists_become_attributed_blocks() {
        let doc = parse("<ol><li>one</li><li>two</li></ol><ul><li>three</li></ul>");
        assert_eq!(doc.blocks().len(), 3);
        assert_eq!(doc.blocks()[0].name(), "list_item");
        assert_eq!(doc.blocks()[0].attr("kind"), Some(&json!("ordered")));
        assert_eq!(doc.blocks()[2].attr("kind"), Some(&json!("bullet")));
    }

    #[test]
    fn test_loose_text_gets_implicit_paragraph() {
        let doc = parse("just text");
        assert_eq!(doc.blocks().len(), 1);
        assert_eq!(doc.blocks()[0].name(), "paragraph");
        assert_eq!(doc.text(), "just text");
    }

    #[test]
    fn test_entities_decoded() {
        let doc = parse("<p>a &amp; b &lt;c&gt;</p>");
        assert_eq!(doc.text(), "a & b <c>");
    }

    #[test]
    fn test_empty_input_yields_empty_document() {
        let doc = parse("");
        assert_eq!(doc.blocks().len(), 1);
        assert_eq!(doc.text(), "");
    }
}
