// ABOUTME: Metadata extraction from fetched HTML: title, description, preview image, body text.
// ABOUTME: Script, style, and noscript subtrees are skipped so their text never reaches the synthesizer.

//! Metadata extraction.
//!
//! Extraction never fails: every field falls back to an empty string.
//!
//! Key behaviors:
//! - Selectors are tried in order; first non-empty match wins.
//! - Whitespace is normalized (collapsed to single spaces, trimmed).
//! - Body text is capped at [`BODY_TEXT_LIMIT`] characters.

use std::collections::HashSet;

use ego_tree::{NodeId, NodeRef};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Maximum number of characters of body text passed on to the synthesizer.
pub const BODY_TEXT_LIMIT: usize = 3000;

const DESCRIPTION_SELECTORS: &[&str] = &[
    "meta[name='description']",
    "meta[property='og:description']",
];

/// Elements whose content never runs into the neighbouring text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

const IMAGE_SELECTORS: &[&str] = &["meta[property='og:image']", "meta[name='twitter:image']"];

static HIDDEN_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script, style, noscript").expect("valid selector"));
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("valid selector"));
static H1_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("valid selector"));
static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("valid selector"));

/// Metadata pulled from a page. Every field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedMetadata {
    pub title: String,
    pub description: String,
    pub image: String,
    pub body_text: String,
}

/// Extract metadata from an HTML document.
pub fn extract(html: &str) -> ExtractedMetadata {
    let doc = Html::parse_document(html);
    let hidden = hidden_nodes(&doc);

    ExtractedMetadata {
        title: extract_title(&doc, &hidden),
        description: extract_first_attr(&doc, DESCRIPTION_SELECTORS, "content").unwrap_or_default(),
        image: extract_first_attr(&doc, IMAGE_SELECTORS, "content").unwrap_or_default(),
        body_text: extract_body_text(&doc, &hidden),
    }
}

/// Extract metadata, resolving a relative preview image against the page URL.
pub fn extract_with_base(html: &str, base: &Url) -> ExtractedMetadata {
    let mut meta = extract(html);
    if !meta.image.is_empty() && Url::parse(&meta.image).is_err() {
        if let Ok(joined) = base.join(&meta.image) {
            meta.image = joined.to_string();
        }
    }
    meta
}

/// Collect ids of every script/style/noscript element.
fn hidden_nodes(doc: &Html) -> HashSet<NodeId> {
    doc.select(&HIDDEN_SELECTOR).map(|el| el.id()).collect()
}

/// `<title>` text if non-empty, else the first `<h1>`, else empty.
fn extract_title(doc: &Html, hidden: &HashSet<NodeId>) -> String {
    if let Some(title) = doc.select(&TITLE_SELECTOR).next() {
        let text = visible_text(&title, hidden);
        if !text.is_empty() {
            return text;
        }
    }
    doc.select(&H1_SELECTOR)
        .next()
        .map(|h1| visible_text(&h1, hidden))
        .unwrap_or_default()
}

/// Whitespace-collapsed visible text of `<body>`, truncated to the limit.
fn extract_body_text(doc: &Html, hidden: &HashSet<NodeId>) -> String {
    let root = doc
        .select(&BODY_SELECTOR)
        .next()
        .unwrap_or_else(|| doc.root_element());
    visible_text(&root, hidden)
        .chars()
        .take(BODY_TEXT_LIMIT)
        .collect()
}

/// Text of an element with hidden subtrees skipped and whitespace normalized.
///
/// Adjacent inline text is concatenated as-is; block elements and `<br>`
/// separate their content with a space.
fn visible_text(element: &ElementRef, hidden: &HashSet<NodeId>) -> String {
    let mut text = String::new();
    collect_text(**element, hidden, &mut text);
    normalize_whitespace(&text)
}

fn collect_text(node: NodeRef<'_, Node>, hidden: &HashSet<NodeId>, out: &mut String) {
    if hidden.contains(&node.id()) {
        return;
    }
    match node.value() {
        Node::Text(t) => out.push_str(t),
        Node::Element(el) => {
            let block = BLOCK_ELEMENTS.contains(&el.name());
            if block {
                out.push(' ');
            }
            for child in node.children() {
                collect_text(child, hidden, out);
            }
            if block {
                out.push(' ');
            }
        }
        Node::Document | Node::Fragment => {
            for child in node.children() {
                collect_text(child, hidden, out);
            }
        }
        _ => {}
    }
}

/// Normalizes whitespace in a string by collapsing runs of whitespace into single spaces.
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts an attribute value from the first matching selector that yields a non-empty result.
fn extract_first_attr(doc: &Html, selectors: &[&str], attr: &str) -> Option<String> {
    for &sel_str in selectors {
        let sel = match Selector::parse(sel_str) {
            Ok(s) => s,
            Err(_) => continue,
        };

        for el in doc.select(&sel) {
            if let Some(value) = el.value().attr(attr) {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}
