//! Output module for reading statistics
//!
//! This module handles:
//! - Aggregating scraped records into ranked statistics
//! - Printing a human-readable summary
//! - Rendering shareable SVG statistics cards

pub mod cards;
pub mod stats;

pub use cards::{render_cards, write_cards, Card};
pub use stats::{aggregate, print_summary, LongestFic, RankedEntry, StatsSummary, TOP_N};
