//! Reading-history page parser
//!
//! This module turns one listing page into [`WorkRecord`]s:
//! - Locating the listing nodes through an ordered list of fallback matchers
//! - Extracting title, author, word count, tags, rating and fandoms
//! - Reading the "last visited" date
//! - Detecting the next-page link

use crate::scrape::date::{parse_visit_date, strip_label};
use crate::scrape::types::{PageResult, WorkRecord};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

/// Path of a work (or one of its chapters), used to find the title link
static WORK_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/works/\d+(?:/chapters/\d+)?/?$").expect("Invalid regex")
});

const UNKNOWN_AUTHOR: &str = "Unknown";
const NOT_RATED: &str = "Not Rated";
const LAST_VISITED_MARKER: &str = "last visited";

/// A CSS pattern that can locate the listing nodes of a history page
#[derive(Debug, Clone, Copy)]
pub struct ListingMatcher {
    pub name: &'static str,
    pub css: &'static str,
}

impl ListingMatcher {
    /// Returns every node on the page matched by this pattern, in document order
    pub fn find<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        match Selector::parse(self.css) {
            Ok(selector) => document.select(&selector).collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Listing patterns in priority order; the first one with any match wins
pub const LISTING_MATCHERS: [ListingMatcher; 4] = [
    ListingMatcher {
        name: "reading blurb",
        css: "li.reading.work.blurb.group",
    },
    ListingMatcher {
        name: "reading index item",
        css: "ol.reading li.blurb",
    },
    ListingMatcher {
        name: "work blurb",
        css: "li.work.blurb",
    },
    ListingMatcher {
        name: "work id item",
        css: "li[id^='work_']",
    },
];

/// Parses a listing page into its records and next-page flag
///
/// # Arguments
///
/// * `html` - The page markup
/// * `base_url` - Site root used to make work links absolute
///
/// # Example
///
/// ```
/// use ao3_history::scrape::parse_page;
/// use url::Url;
///
/// let html = r#"<ol class="reading"><li class="reading work blurb group">
///   <h4 class="heading"><a href="/works/1">A Title</a></h4>
/// </li></ol>"#;
/// let base = Url::parse("https://archiveofourown.org").unwrap();
/// let page = parse_page(html, &base);
/// assert_eq!(page.records.len(), 1);
/// assert!(!page.has_next_page);
/// ```
pub fn parse_page(html: &str, base_url: &Url) -> PageResult {
    let document = Html::parse_document(html);
    let records = extract_from_document(&document, base_url);
    let has_next_page = has_next_page(&document);
    PageResult {
        records,
        has_next_page,
    }
}

/// Extracts every work record on the page
///
/// Nodes without a resolvable title link are dropped silently.
pub fn extract(html: &str, base_url: &Url) -> Vec<WorkRecord> {
    let document = Html::parse_document(html);
    extract_from_document(&document, base_url)
}

fn extract_from_document(document: &Html, base_url: &Url) -> Vec<WorkRecord> {
    let Some((matcher, nodes)) = find_listing_nodes(document) else {
        let markup = document.root_element().html();
        let prefix: String = markup.chars().take(500).collect();
        tracing::warn!(
            "No listing nodes matched any known pattern; markup starts with: {}",
            prefix
        );
        return Vec::new();
    };

    tracing::debug!("Matched {} listing nodes with '{}'", nodes.len(), matcher.name);

    nodes
        .into_iter()
        .filter_map(|node| extract_record(node, base_url))
        .collect()
}

/// Tries the listing matchers in priority order
pub fn find_listing_nodes(document: &Html) -> Option<(ListingMatcher, Vec<ElementRef<'_>>)> {
    LISTING_MATCHERS.iter().find_map(|matcher| {
        let nodes = matcher.find(document);
        if nodes.is_empty() {
            None
        } else {
            Some((*matcher, nodes))
        }
    })
}

/// Builds one record from a listing node, or `None` if it has no title link
fn extract_record(node: ElementRef<'_>, base_url: &Url) -> Option<WorkRecord> {
    let (title, url) = extract_title_link(node, base_url)?;

    let relationships = texts(node, "li.relationships a.tag");
    let mut tags = relationships.clone();
    tags.extend(texts(node, "li.characters a.tag"));
    tags.extend(texts(node, "li.freeforms a.tag"));

    Some(WorkRecord {
        title,
        author: first_text(node, "a[rel='author']").unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        url,
        word_count: extract_word_count(node),
        tags,
        relationships,
        rating: extract_rating(node).unwrap_or_else(|| NOT_RATED.to_string()),
        fandoms: texts(node, ".fandoms a.tag"),
        last_visited: extract_last_visited(node),
    })
}

/// Finds the first anchor pointing at a work and returns its text and absolute URL
fn extract_title_link(node: ElementRef<'_>, base_url: &Url) -> Option<(String, String)> {
    let selector = Selector::parse("a[href]").ok()?;

    node.select(&selector).find_map(|anchor| {
        let href = anchor.value().attr("href")?.trim();
        let absolute = base_url.join(href).ok()?;
        if !WORK_PATH_RE.is_match(absolute.path()) {
            return None;
        }

        let title = element_text(anchor);
        if title.is_empty() {
            return None;
        }

        Some((title, absolute.to_string()))
    })
}

/// Reads the word count, ignoring thousands separators; 0 when unparsable
fn extract_word_count(node: ElementRef<'_>) -> u64 {
    first_text(node, "dd.words")
        .map(|text| {
            text.chars()
                .filter(|c| !matches!(c, ',' | '.' | '\u{a0}') && !c.is_whitespace())
                .collect::<String>()
        })
        .and_then(|digits| digits.parse::<u64>().ok())
        .unwrap_or(0)
}

fn extract_rating(node: ElementRef<'_>) -> Option<String> {
    if let Some(text) = first_text(node, ".required-tags .rating .text") {
        return Some(text);
    }

    let selector = Selector::parse("span.rating").ok()?;
    let rating = node.select(&selector).next()?;
    rating
        .value()
        .attr("title")
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .or_else(|| Some(element_text(rating)).filter(|text| !text.is_empty()))
}

/// Reads the "last visited" date from the node's heading, if any
///
/// The heading's label sub-element (e.g. `<span>Last visited:</span>`) is
/// removed from the full heading text before matching the date patterns.
fn extract_last_visited(node: ElementRef<'_>) -> Option<chrono::NaiveDate> {
    let headings = Selector::parse("h1, h2, h3, h4, h5, h6").ok()?;
    let heading = node
        .select(&headings)
        .find(|h| element_text(*h).to_lowercase().contains(LAST_VISITED_MARKER))?;

    let full_text = heading.text().collect::<String>();
    let label_text = heading
        .children()
        .filter_map(ElementRef::wrap)
        .map(|child| child.text().collect::<String>())
        .find(|text| text.to_lowercase().contains(LAST_VISITED_MARKER))
        .unwrap_or_default();

    let fragment = strip_label(&full_text, &label_text);
    parse_visit_date(&fragment)
}

/// Whether the page links to a following page
pub fn has_next_page(document: &Html) -> bool {
    ["a[rel='next'][href]", "li.next a[href]"]
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .any(|selector| document.select(&selector).next().is_some())
}

/// Trimmed, whitespace-collapsed text content of an element
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(node: ElementRef<'_>, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    node.select(&selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}

fn texts(node: ElementRef<'_>, css: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(css) else {
        return Vec::new();
    };
    node.select(&selector)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}
