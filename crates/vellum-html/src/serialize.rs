//! Document tree to HTML.
//!
//! The inverse of parsing, normalized: marks open in a canonical order,
//! consecutive list items are wrapped in one list element, and all text
//! is entity-escaped. `parse(serialize(parse(x)))` equals `parse(x)`.

use serde_json::Value;
use std::fmt::Write;
use vellum_doc::{Document, Mark, Node};

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn attr_str(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Canonical mark nesting order; parsing re-derives the same mark sets
/// whatever order the source used.
const MARK_ORDER: [&str; 5] = ["strong", "em", "code", "link", "comment"];

fn mark_open(mark: &Mark) -> String {
    match mark.name.as_str() {
        "strong" => "<strong>".to_string(),
        "em" => "<em>".to_string(),
        "code" => "<code>".to_string(),
        "link" => {
            let href = mark.attrs.get("href").and_then(attr_str).unwrap_or_default();
            match mark.attrs.get("title").and_then(attr_str) {
                Some(title) => format!(
                    r#"<a href="{}" title="{}">"#,
                    escape(&href),
                    escape(&title)
                ),
                None => format!(r#"<a href="{}">"#, escape(&href)),
            }
        }
        "comment" => {
            let id = mark.attrs.get("id").and_then(attr_str).unwrap_or_default();
            let author = mark
                .attrs
                .get("author")
                .and_then(attr_str)
                .unwrap_or_default();
            let comment = mark
                .attrs
                .get("comment")
                .and_then(attr_str)
                .unwrap_or_default();
            format!(
                r#"<span class="comment" data-id="{}" data-author="{}" data-comment="{}">"#,
                escape(&id),
                escape(&author),
                escape(&comment)
            )
        }
        _ => String::new(),
    }
}

fn mark_close(mark: &Mark) -> &'static str {
    match mark.name.as_str() {
        "strong" => "</strong>",
        "em" => "</em>",
        "code" => "</code>",
        "link" => "</a>",
        "comment" => "</span>",
        _ => "",
    }
}

fn serialize_inline(out: &mut String, node: &Node) {
    match node.name() {
        "text" => {
            let mut marks: Vec<&Mark> = node.marks().iter().collect();
            marks.sort_by_key(|m| {
                MARK_ORDER
                    .iter()
                    .position(|name| *name == m.name)
                    .unwrap_or(MARK_ORDER.len())
            });
            for mark in &marks {
                out.push_str(&mark_open(mark));
            }
            out.push_str(&escape(node.text_content().unwrap_or_default()));
            for mark in marks.iter().rev() {
                out.push_str(mark_close(mark));
            }
        }
        "hard_break" => out.push_str("<br/>"),
        "hyperlink" => {
            let href = node.attr("href").and_then(attr_str).unwrap_or_default();
            out.push_str(&format!(r#"<a href="{}""#, escape(&href)));
            if let Some(title) = node.attr("title").and_then(attr_str) {
                out.push_str(&format!(r#" title="{}""#, escape(&title)));
            }
            out.push('>');
            out.push_str(&escape(node.text_content().unwrap_or_default()));
            out.push_str("</a>");
        }
        "annotation" => {
            let id = node.attr("id").and_then(attr_str).unwrap_or_default();
            let author = node.attr("author").and_then(attr_str).unwrap_or_default();
            out.push_str(&format!(
                r#"<span class="annotation" data-id="{}" data-author="{}""#,
                escape(&id),
                escape(&author)
            ));
            if let Some(ts) = node.attr("timestamp").and_then(attr_str) {
                out.push_str(&format!(r#" data-timestamp="{}""#, escape(&ts)));
            }
            out.push('>');
            out.push_str(&escape(node.text_content().unwrap_or_default()));
            out.push_str("</span>");
        }
        _ => {}
    }
}

/// Serialize a document tree to HTML markup.
pub fn serialize_html(doc: &Document) -> String {
    let mut out = String::new();
    let mut open_list: Option<String> = None;

    for block in doc.blocks() {
        // Wrap runs of list items in a single list element.
        let list_kind = if block.name() == "list_item" {
            block
                .attr("kind")
                .and_then(attr_str)
                .or_else(|| Some("bullet".to_string()))
        } else {
            None
        };
        if open_list != list_kind {
            if let Some(kind) = &open_list {
                out.push_str(if kind == "ordered" { "</ol>" } else { "</ul>" });
            }
            if let Some(kind) = &list_kind {
                out.push_str(if kind == "ordered" { "<ol>" } else { "<ul>" });
            }
            open_list = list_kind.clone();
        }

        let (open, close) = match block.name() {
            "heading" => {
                let level = block
                    .attr("level")
                    .and_then(Value::as_i64)
                    .unwrap_or(1)
                    .clamp(1, 6);
                (format!("h{level}"), format!("h{level}"))
            }
            "code_block" => ("pre".to_string(), "pre".to_string()),
            "blockquote" => ("blockquote".to_string(), "blockquote".to_string()),
            "list_item" => ("li".to_string(), "li".to_string()),
            _ => ("p".to_string(), "p".to_string()),
        };
        let _ = write!(out, "<{open}>");
        for child in block.children() {
            serialize_inline(&mut out, child);
        }
        let _ = write!(out, "</{close}>");
    }
    if let Some(kind) = &open_list {
        out.push_str(if kind == "ordered" { "</ol>" } else { "</ul>" });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_html;
    use vellum_doc::DocId;
    use vellum_schema::Schema;

    fn parse(html: &str) -> Document {
        parse_html(&Schema::hypertext(), DocId::from_string("t"), html).unwrap()
    }

    #[test]
    fn test_serialize_basic() {
        let doc = parse("<h2>Title</h2><p>body <strong>bold</strong></p>");
        let html = serialize_html(&doc);
        assert_eq!(html, "<h2>Title</h2><p>body <strong>bold</strong></p>");
    }

    #[test]
    fn test_serialize_escapes() {
        let doc = parse("<p>a &amp; b</p>");
        assert_eq!(serialize_html(&doc), "<p>a &amp; b</p>");
    }

    #[test]
    fn test_round_trip_is_idempotent() {
        let messy = r#"
            <div class="wrapper">
              <h1 style="x">Notes</h1>
              <p>see <a href="https://example.com">the site</a>, <b>bold</b>
                 and <span class="comment" data-id="c1" data-author="bob" data-comment="hm">this</span></p>
              <ol><li>one</li><li>two</li></ol>
              <widget>stray</widget>
            </div>"#;
        let once = parse(messy);
        let twice = parse(&serialize_html(&once));
        assert_eq!(once.root(), twice.root());
        assert_eq!(serialize_html(&once), serialize_html(&twice));
    }

    #[test]
    fn test_lists_wrapped_by_kind() {
        let doc = parse("<ol><li>one</li></ol><ul><li>two</li></ul>");
        let html = serialize_html(&doc);
        assert_eq!(html, "<ol><li>one</li></ol><ul><li>two</li></ul>");
    }

    #[test]
    fn test_annotation_round_trips() {
        let html =
            r#"<p><span class="annotation" data-id="a1" data-author="alice">note</span></p>"#;
        let doc = parse(html);
        assert_eq!(serialize_html(&doc), html);
    }
}
