//! Hyperlink extraction.
//!
//! Surfaces every link in a document (hyperlink nodes and link marks)
//! with its flat position, for link validation and crawling collaborators.

use serde_json::Value;
use vellum_doc::Document;

/// One link found in a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkRef {
    pub href: String,
    pub title: Option<String>,
    /// The text the link covers.
    pub text: String,
    /// Flat position of the link's start.
    pub position: usize,
}

fn as_str(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

/// Collect every hyperlink node and link-marked text run, in document
/// order.
pub fn extract_links(doc: &Document) -> Vec<LinkRef> {
    let mut links = Vec::new();
    let mut offset = 0;
    for block in doc.blocks() {
        for child in block.children() {
            if child.name() == "hyperlink" {
                if let Some(href) = as_str(child.attr("href")) {
                    links.push(LinkRef {
                        href,
                        title: as_str(child.attr("title")),
                        text: child.text_content().unwrap_or_default().to_string(),
                        position: offset,
                    });
                }
            } else if child.is_text() {
                if let Some(mark) = child.marks().iter().find(|m| m.name == "link") {
                    if let Some(href) = as_str(mark.attrs.get("href")) {
                        links.push(LinkRef {
                            href,
                            title: as_str(mark.attrs.get("title")),
                            text: child.text_content().unwrap_or_default().to_string(),
                            position: offset,
                        });
                    }
                }
            }
            offset += child.inline_len();
        }
        offset += 1;
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_html;
    use serde_json::json;
    use vellum_doc::{DocId, Mark};
    use vellum_schema::Schema;

    #[test]
    fn test_extracts_hyperlink_nodes_with_positions() {
        let doc = parse_html(
            &Schema::hypertext(),
            DocId::from_string("t"),
            r#"<p>see <a href="https://example.com" title="ex">here</a></p><p><a href="https://other.example">more</a></p>"#,
        )
        .unwrap();

        let links = extract_links(&doc);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].href, "https://example.com");
        assert_eq!(links[0].title.as_deref(), Some("ex"));
        assert_eq!(links[0].text, "here");
        assert_eq!(links[0].position, 4);
        // Second paragraph starts after "see " + atom + break = 6.
        assert_eq!(links[1].position, 6);
    }

    #[test]
    fn test_extracts_link_marks() {
        let schema = Schema::hypertext();
        let doc = parse_html(&schema, DocId::from_string("t"), "<p>plain text</p>").unwrap();
        let link = Mark::new("link").with_attr("href", json!("https://m.example"));
        let doc = doc.add_mark(&schema, 0, 5, &link).unwrap();

        let links = extract_links(&doc);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "https://m.example");
        assert_eq!(links[0].text, "plain");
        assert_eq!(links[0].position, 0);
    }
}
