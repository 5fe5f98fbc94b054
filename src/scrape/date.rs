//! "Last visited" date parsing
//!
//! The reading history prints the visit date inside a heading such as
//! `<h4 class="viewed heading"><span>Last visited:</span> 14 Jan 2024 (Update available.)</h4>`.
//! Older layouts wrap the date in parentheses instead.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// Parenthesized form, tried first: `(14 Jan 2024)`
static PARENTHESIZED_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((\d{1,2}\s+[A-Za-z]{3,9}\s+\d{4})\)").expect("Invalid regex")
});

/// Bare form: `14 Jan 2024`
static BARE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}\s+[A-Za-z]{3,9}\s+\d{4})").expect("Invalid regex"));

/// Parses the date fragment that follows the "Last visited" label
///
/// Returns `None` when neither pattern matches or the match is not a real
/// calendar date. A missing date is never an error.
///
/// # Example
///
/// ```
/// use ao3_history::scrape::parse_visit_date;
/// use chrono::NaiveDate;
///
/// assert_eq!(parse_visit_date("(14 Jan 2024)"), NaiveDate::from_ymd_opt(2024, 1, 14));
/// assert_eq!(parse_visit_date("garbled text"), None);
/// ```
pub fn parse_visit_date(fragment: &str) -> Option<NaiveDate> {
    let matched = [&*PARENTHESIZED_DATE_RE, &*BARE_DATE_RE]
        .into_iter()
        .find_map(|re| re.captures(fragment))
        .and_then(|caps| caps.get(1))?;

    let normalized = matched
        .as_str()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    // %B also accepts the abbreviated month when parsing
    NaiveDate::parse_from_str(&normalized, "%d %B %Y").ok()
}

/// Removes the label text from a heading's full text, leaving the date fragment
pub fn strip_label<'a>(heading_text: &'a str, label_text: &str) -> std::borrow::Cow<'a, str> {
    let label = label_text.trim();
    if label.is_empty() {
        return std::borrow::Cow::Borrowed(heading_text);
    }
    std::borrow::Cow::Owned(heading_text.replacen(label, "", 1))
}
