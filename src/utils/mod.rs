//! Utility functions and helpers.

pub mod http;
pub mod log;

use scraper::{ElementRef, Node};
use unicode_segmentation::UnicodeSegmentation;
use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Text content of an element: each text node trimmed, empty ones dropped.
pub fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Elements that start a new line in rendered text.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "footer", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "section", "table", "tr", "ul",
];

/// Text of an element with line breaks only at `<br>`, block elements and
/// literal newlines. Inline elements join their neighbours.
pub fn rendered_text(element: &ElementRef) -> String {
    let mut out = String::new();
    push_rendered(element, &mut out);
    out
}

fn push_rendered(element: &ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                let block = BLOCK_TAGS.contains(&name);
                if block || name == "br" {
                    out.push('\n');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    push_rendered(&child_el, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// First non-empty line of an element's rendered text, whitespace collapsed.
pub fn first_line(element: &ElementRef) -> String {
    rendered_text(element)
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|line| !line.is_empty())
        .unwrap_or_default()
}

/// Keep at most `max` grapheme clusters of `text`.
pub fn truncate_graphemes(text: &str, max: usize) -> &str {
    match text.grapheme_indices(true).nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Filesystem-safe stem for a free-form name.
///
/// Every non-word character becomes `_`; the result keeps at most 30 graphemes.
pub fn safe_file_stem(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    truncate_graphemes(&replaced, 30).to_string()
}
