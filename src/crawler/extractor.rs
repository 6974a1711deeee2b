//! HTML content extraction
//!
//! This module turns a fetched page into a [`Document`] and collects the
//! links to feed back into the frontier:
//! - Title, meta/OpenGraph description and meta keywords
//! - Cleaned body text from the first non-empty semantic container
//! - Word-boundary truncation and the minimum-length cut-off
//! - Anchor links resolved against the page URL

use crate::config::CrawlerConfig;
use crate::index::Document;
use crate::url::normalize_url;
use ego_tree::iter::Edge;
use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Elements whose text is never part of the page content
const SKIPPED_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Elements that separate words when their text is flattened
const BLOCK_ELEMENTS: [&str; 31] = [
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tr",
];

/// A named place to look for the page body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyStrategy {
    Main,
    Article,
    Body,
}

impl BodyStrategy {
    pub fn selector(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Article => "article",
            Self::Body => "body",
        }
    }

    /// Cleaned text of the first matching container, if it has any
    fn extract(&self, document: &Html) -> Option<String> {
        let selector = Selector::parse(self.selector()).ok()?;
        document
            .select(&selector)
            .map(|element| clean_text(*element))
            .find(|text| !text.is_empty())
    }
}

/// Body strategies in priority order
pub const BODY_STRATEGIES: [BodyStrategy; 3] =
    [BodyStrategy::Main, BodyStrategy::Article, BodyStrategy::Body];

/// Length rules applied to extracted body text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Body text is truncated to this many characters
    pub max_content_length: usize,
    /// Pages with less body text than this produce no document
    pub min_content_length: usize,
}

impl From<&CrawlerConfig> for ExtractorConfig {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_content_length: config.max_content_length,
            min_content_length: config.min_content_length,
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self::from(&CrawlerConfig::default())
    }
}

/// Everything taken from one page
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    /// `None` when the page had too little content
    pub document: Option<Document>,
    /// Absolute http(s) links in document order
    pub links: Vec<Url>,
}

/// Extracts the document and links from a page in a single parse
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The page URL as fetched; links resolve against it and its
///   normalized form becomes the document URL
/// * `config` - Truncation and minimum-length rules
///
/// # Example
///
/// ```
/// use sumi_search::crawler::{extract_page, ExtractorConfig};
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head>
///     <body><main>Enough words here to pass the minimum content length check.</main>
///     <a href="/next">next</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let page = extract_page(html, &base_url, &ExtractorConfig::default());
/// assert_eq!(page.document.unwrap().title, "Test");
/// assert_eq!(page.links[0].as_str(), "https://example.com/next");
/// ```
pub fn extract_page(html: &str, base_url: &Url, config: &ExtractorConfig) -> ExtractedPage {
    let parsed = Html::parse_document(html);
    ExtractedPage {
        document: build_document(&parsed, base_url, config),
        links: discover_links(&parsed, base_url),
    }
}

/// Extracts just the document from a page
pub fn extract(html: &str, base_url: &Url, config: &ExtractorConfig) -> Option<Document> {
    build_document(&Html::parse_document(html), base_url, config)
}

fn build_document(parsed: &Html, base_url: &Url, config: &ExtractorConfig) -> Option<Document> {
    let body = extract_body(parsed);
    let content = truncate_at_word(&body, config.max_content_length);
    if content.chars().count() < config.min_content_length {
        return None;
    }

    let url = normalize_url(base_url.as_str()).unwrap_or_else(|_| base_url.clone());
    Some(Document::new(
        url.as_str(),
        extract_title(parsed),
        extract_description(parsed),
        extract_keywords(parsed),
        content.to_string(),
    ))
}

/// Cleaned body text: first non-empty strategy, else the whole document
fn extract_body(parsed: &Html) -> String {
    BODY_STRATEGIES
        .iter()
        .find_map(|strategy| strategy.extract(parsed))
        .unwrap_or_else(|| clean_text(parsed.tree.root()))
}

fn extract_title(parsed: &Html) -> String {
    Selector::parse("title")
        .ok()
        .and_then(|selector| parsed.select(&selector).next())
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .unwrap_or_default()
}

fn extract_description(parsed: &Html) -> Option<String> {
    meta_content(parsed, "name", "description")
        .or_else(|| meta_content(parsed, "property", "og:description"))
}

fn extract_keywords(parsed: &Html) -> Option<Vec<String>> {
    let raw = meta_content(parsed, "name", "keywords")?;
    let keywords: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();
    (!keywords.is_empty()).then_some(keywords)
}

/// Trimmed, non-empty `content` of the first `<meta attr="value">`
fn meta_content(parsed: &Html, attr: &str, value: &str) -> Option<String> {
    let selector = Selector::parse("meta[content]").ok()?;
    parsed
        .select(&selector)
        .filter(|element| {
            element
                .value()
                .attr(attr)
                .is_some_and(|v| v.trim().eq_ignore_ascii_case(value))
        })
        .filter_map(|element| element.value().attr("content"))
        .map(collapse_whitespace)
        .find(|content| !content.is_empty())
}

/// Flattens the text under `root`, skipping non-content elements
fn clean_text(root: NodeRef<'_, Node>) -> String {
    let mut text = String::new();
    let mut skip_depth = 0usize;

    for edge in root.traverse() {
        match edge {
            Edge::Open(node) => match node.value() {
                Node::Element(element) => {
                    if SKIPPED_ELEMENTS.contains(&element.name()) {
                        skip_depth += 1;
                    } else if BLOCK_ELEMENTS.contains(&element.name()) {
                        text.push(' ');
                    }
                }
                Node::Text(t) if skip_depth == 0 => text.push_str(t),
                _ => {}
            },
            Edge::Close(node) => {
                if let Node::Element(element) = node.value() {
                    if SKIPPED_ELEMENTS.contains(&element.name()) {
                        skip_depth = skip_depth.saturating_sub(1);
                    } else if BLOCK_ELEMENTS.contains(&element.name()) {
                        text.push(' ');
                    }
                }
            }
        }
    }

    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cuts `text` to at most `max` characters without splitting a word
///
/// The cut lands on the last whitespace at or before `max`. When the first
/// token alone is longer than `max` there is no such boundary and the result
/// is empty.
pub fn truncate_at_word(text: &str, max: usize) -> &str {
    let Some((cut, _)) = text.char_indices().nth(max) else {
        return text;
    };

    if text[cut..].starts_with(char::is_whitespace) {
        return text[..cut].trim_end();
    }

    match text[..cut].rfind(char::is_whitespace) {
        Some(boundary) => text[..boundary].trim_end(),
        None => "",
    }
}

/// Collects anchor links resolved against `base_url`
///
/// Skips empty and fragment-only hrefs, unparseable URLs and any scheme
/// other than http/https (`javascript:`, `mailto:`, `tel:`, `data:`...).
pub fn discover_links(parsed: &Html, base_url: &Url) -> Vec<Url> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    parsed
        .select(&selector)
        .filter_map(|element: ElementRef<'_>| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if !matches!(absolute.scheme(), "http" | "https") {
        return None;
    }
    absolute.set_fragment(None);
    Some(absolute)
}
