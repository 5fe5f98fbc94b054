//! Shareable statistics cards
//!
//! Renders a [`StatsSummary`] as 800×600 SVG cards: one per ranked table
//! (top five entries) plus an overall card with totals and the longest work.
//! Ranked cards are skipped when their table is empty; the overall card is
//! always produced.

use crate::output::stats::{RankedEntry, StatsSummary};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const CARD_ENTRIES: usize = 5;
const MAX_NAME_CHARS: usize = 50;
const MAX_TITLE_CHARS: usize = 60;

/// Background gradient and accent colour of a card
struct Palette {
    top: &'static str,
    bottom: &'static str,
    accent: &'static str,
}

const SHIPS: Palette = Palette {
    top: "#ffb6c1",
    bottom: "#dda0dd",
    accent: "#643264",
};
const TAGS: Palette = Palette {
    top: "#87cefa",
    bottom: "#40e0d0",
    accent: "#145064",
};
const FANDOMS: Palette = Palette {
    top: "#ffa500",
    bottom: "#ff7f50",
    accent: "#96321e",
};
const OVERALL: Palette = Palette {
    top: "#10b981",
    bottom: "#14b8a6",
    accent: "#0a645a",
};

/// One rendered card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub file_name: &'static str,
    pub svg: String,
}

/// Renders every card that has content
pub fn render_cards(stats: &StatsSummary) -> Vec<Card> {
    let mut cards = Vec::new();

    let ranked = [
        ("top_ships.svg", "Top Ships", &stats.top_ships, &SHIPS),
        ("top_tags.svg", "Top Tags", &stats.top_tags, &TAGS),
        ("top_fandoms.svg", "Top Fandoms", &stats.top_fandoms, &FANDOMS),
    ];
    for (file_name, heading, rows, palette) in ranked {
        if !rows.is_empty() {
            cards.push(Card {
                file_name,
                svg: ranked_card(heading, rows, palette),
            });
        }
    }

    cards.push(Card {
        file_name: "overall_stats.svg",
        svg: overall_card(stats),
    });
    cards
}

/// Writes the cards into `dir`, creating it if needed
///
/// # Returns
///
/// * `Ok(Vec<PathBuf>)` - Paths of the written files
/// * `Err(io::Error)` - The directory or a file could not be written
pub fn write_cards(stats: &StatsSummary, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for card in render_cards(stats) {
        let path = dir.join(card.file_name);
        std::fs::write(&path, card.svg)?;
        tracing::debug!("Wrote card {}", path.display());
        written.push(path);
    }
    Ok(written)
}

fn ranked_card(heading: &str, rows: &[RankedEntry], palette: &Palette) -> String {
    let mut svg = open_card(heading, palette);
    let mut y = 150;

    for (rank, row) in rows.iter().take(CARD_ENTRIES).enumerate() {
        let _ = write!(
            svg,
            r##"<circle cx="65" cy="{cy}" r="25" fill="#ffffff" fill-opacity="0.8" stroke="{accent}" stroke-width="3"/>
<text x="65" y="{ty}" font-size="26" font-weight="bold" fill="{accent}" text-anchor="middle">#{rank}</text>
<text x="110" y="{ty}" font-size="32" fill="#ffffff">{name}</text>
<text x="{right}" y="{ty}" font-size="28" fill="#ffffff" text-anchor="end">{count} fics</text>
"##,
            cy = y + 25,
            ty = y + 35,
            accent = palette.accent,
            rank = rank + 1,
            name = escape(&truncate(&row.name, MAX_NAME_CHARS, "")),
            right = WIDTH - 40,
            count = group_thousands(row.count),
        );
        y += 80;
    }

    svg.push_str("</svg>\n");
    svg
}

fn overall_card(stats: &StatsSummary) -> String {
    let mut svg = open_card("Reading Stats", &OVERALL);

    let longest = stats
        .longest_fic
        .as_ref()
        .map(|fic| format!("{} words", group_thousands(fic.word_count)))
        .unwrap_or_else(|| "No works yet".to_string());
    let figures = [
        ("Total Fics Read", group_thousands(stats.total_fics)),
        ("Total Words Read", group_thousands(stats.total_words)),
        ("Longest Fic", longest),
    ];

    let mut y = 150;
    for (label, value) in figures {
        let _ = write!(
            svg,
            r##"<text x="80" y="{ly}" font-size="30" fill="#e6fffa">{label}</text>
<text x="80" y="{vy}" font-size="46" font-weight="bold" fill="#ffffff">{value}</text>
"##,
            ly = y + 30,
            vy = y + 85,
        );
        y += 130;
    }

    // title sits under the longest-fic figure
    if let Some(fic) = &stats.longest_fic {
        let _ = writeln!(
            svg,
            r##"<text x="80" y="{}" font-size="24" fill="#f0fffc">{}</text>"##,
            y - 5,
            escape(&truncate(&fic.title, MAX_TITLE_CHARS, "..."))
        );
    }

    svg.push_str("</svg>\n");
    svg
}

/// SVG header, gradient background and outlined heading
fn open_card(heading: &str, palette: &Palette) -> String {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="DejaVu Sans, Helvetica, Arial, sans-serif">
<defs><linearGradient id="bg" x1="0" y1="0" x2="0" y2="1"><stop offset="0" stop-color="{top}"/><stop offset="1" stop-color="{bottom}"/></linearGradient></defs>
<rect width="{w}" height="{h}" fill="url(#bg)"/>
<text x="40" y="100" font-size="60" font-weight="bold" fill="#ffffff" stroke="{accent}" stroke-width="3" paint-order="stroke">{heading}</text>
"##,
        w = WIDTH,
        h = HEIGHT,
        top = palette.top,
        bottom = palette.bottom,
        accent = palette.accent,
        heading = escape(heading),
    )
}

fn truncate(text: &str, max_chars: usize, ellipsis: &str) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str(ellipsis);
    cut
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// `1234567` -> `1,234,567`
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
