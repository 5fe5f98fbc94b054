//! Reading statistics from scraped work records
//!
//! This module reduces a list of [`WorkRecord`]s into totals and ranked
//! frequency tables, and renders them for the terminal.

use crate::scrape::WorkRecord;
use serde::Serialize;
use std::collections::HashMap;

/// Number of entries kept in each ranked table
pub const TOP_N: usize = 10;

/// One row of a ranked frequency table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub name: String,
    pub count: u64,
}

/// The work with the highest word count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LongestFic {
    pub title: String,
    pub word_count: u64,
}

/// Reading statistics summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    /// Number of works in the input
    pub total_fics: u64,

    /// Sum of all word counts
    pub total_words: u64,

    /// Most frequent tags
    pub top_tags: Vec<RankedEntry>,

    /// Most frequent relationships
    pub top_ships: Vec<RankedEntry>,

    /// Most frequent fandoms
    pub top_fandoms: Vec<RankedEntry>,

    /// Longest work, absent for an empty input
    pub longest_fic: Option<LongestFic>,
}

/// Counts occurrences while remembering first-seen order
#[derive(Default)]
struct Tally {
    counts: HashMap<String, (u64, usize)>,
}

impl Tally {
    fn add(&mut self, name: &str) {
        let next_index = self.counts.len();
        let entry = self.counts.entry(name.to_string()).or_insert((0, next_index));
        entry.0 += 1;
    }

    /// Sorted by count descending, ties by first appearance, truncated
    fn ranked(self, limit: usize) -> Vec<RankedEntry> {
        let mut rows: Vec<_> = self.counts.into_iter().collect();
        rows.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
        rows.into_iter()
            .take(limit)
            .map(|(name, (count, _))| RankedEntry { name, count })
            .collect()
    }
}

/// Aggregates work records into a statistics summary
///
/// Pure and deterministic: the same input always yields the same summary.
///
/// # Arguments
///
/// * `items` - Records in history order
///
/// # Returns
///
/// A [`StatsSummary`]; empty input gives zero totals and empty tables.
///
/// # Example
///
/// ```
/// use ao3_history::aggregate;
///
/// let summary = aggregate(&[]);
/// assert_eq!(summary.total_fics, 0);
/// assert!(summary.top_tags.is_empty());
/// ```
pub fn aggregate(items: &[WorkRecord]) -> StatsSummary {
    let mut total_words = 0u64;
    let mut tags = Tally::default();
    let mut ships = Tally::default();
    let mut fandoms = Tally::default();
    let mut longest: Option<&WorkRecord> = None;

    for item in items {
        total_words = total_words.saturating_add(item.word_count);

        for tag in &item.tags {
            tags.add(tag);
        }
        for ship in &item.relationships {
            ships.add(ship);
        }
        for fandom in &item.fandoms {
            fandoms.add(fandom);
        }

        // strictly greater: the first of equal lengths wins
        if longest.map_or(true, |current| item.word_count > current.word_count) {
            longest = Some(item);
        }
    }

    StatsSummary {
        total_fics: items.len() as u64,
        total_words,
        top_tags: tags.ranked(TOP_N),
        top_ships: ships.ranked(TOP_N),
        top_fandoms: fandoms.ranked(TOP_N),
        longest_fic: longest.map(|item| LongestFic {
            title: item.title.clone(),
            word_count: item.word_count,
        }),
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_summary(stats: &StatsSummary) {
    println!("=== Reading Statistics ===\n");

    println!("Overview:");
    println!("  Works read: {}", stats.total_fics);
    println!("  Total words: {}", stats.total_words);
    if stats.total_fics > 0 {
        println!(
            "  Average length: {} words",
            stats.total_words / stats.total_fics
        );
    }
    if let Some(longest) = &stats.longest_fic {
        println!(
            "  Longest work: {} ({} words)",
            longest.title, longest.word_count
        );
    }
    println!();

    print_table("Top Fandoms", &stats.top_fandoms);
    print_table("Top Relationships", &stats.top_ships);
    print_table("Top Tags", &stats.top_tags);
}

fn print_table(heading: &str, rows: &[RankedEntry]) {
    if rows.is_empty() {
        return;
    }

    println!("{} ({}):", heading, rows.len());
    for (rank, row) in rows.iter().enumerate() {
        println!("  {:>2}. {} ({})", rank + 1, row.name, row.count);
    }
    println!();
}
