//! Reading-history pagination
//!
//! Walks the history one page at a time, strictly in order, and decides when
//! to stop:
//! - no next-page link, or a page without records ("exhausted")
//! - the last dated record on a page is older than the requested year
//!   ("year boundary reached")
//! - any fetch error, which propagates unchanged

use crate::config::PaginationConfig;
use crate::scrape::parser::parse_page;
use crate::scrape::types::{PageResult, ProgressEvent, ProgressFn, ScrapeResult, WorkRecord};
use crate::Result;
use async_trait::async_trait;
use url::Url;

/// Something that can hand out history pages by number
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Site root used to make work links absolute
    fn base_url(&self) -> &Url;

    /// Returns the markup of page `page` (1-indexed)
    async fn fetch_page(&self, page: u32) -> Result<String>;
}

/// Why the pagination loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Exhausted,
    YearBoundary,
}

/// Drives pagination to completion and applies the year filter
///
/// # Arguments
///
/// * `source` - Page fetcher, normally an authenticated session
/// * `config` - Cooldown settings
/// * `year_filter` - Only keep works last visited in this year
/// * `progress` - Receives one event per fetched page
///
/// # Returns
///
/// The collected records in page order, then in-page order. With a year
/// filter, only records whose visit date falls in that year are kept.
pub async fn drive<S: HistorySource + ?Sized>(
    source: &S,
    config: &PaginationConfig,
    year_filter: Option<i32>,
    progress: Option<ProgressFn<'_>>,
) -> Result<ScrapeResult> {
    let mut current_page: u32 = 1;
    let mut all_records: Vec<WorkRecord> = Vec::new();

    let reason = loop {
        let html = source.fetch_page(current_page).await?;
        let PageResult {
            records,
            has_next_page,
        } = parse_page(&html, source.base_url());

        let page_len = records.len();
        let boundary_hit = year_filter
            .map(|year| crosses_year_boundary(&records, year))
            .unwrap_or(false);
        all_records.extend(records);

        tracing::info!(
            "Fetched page {} ({} works, {} total)",
            current_page,
            page_len,
            all_records.len()
        );
        if let Some(report) = progress {
            report(ProgressEvent::new(
                current_page,
                all_records.len(),
                format!(
                    "Fetched page {} ({} works so far)",
                    current_page,
                    all_records.len()
                ),
            ));
        }

        if boundary_hit {
            tracing::info!(
                "Page {} reached works visited before {}; stopping",
                current_page,
                year_filter.unwrap_or_default()
            );
            break StopReason::YearBoundary;
        }

        if !has_next_page || page_len == 0 {
            break StopReason::Exhausted;
        }

        if current_page % config.cooldown_every.max(1) == 0 && !config.cooldown().is_zero() {
            tracing::debug!(
                "Cooling down for {:?} after {} pages",
                config.cooldown(),
                current_page
            );
            tokio::time::sleep(config.cooldown()).await;
        }

        current_page += 1;
    };

    tracing::debug!("Pagination ended after page {}: {:?}", current_page, reason);

    let items = match year_filter {
        Some(year) => all_records
            .into_iter()
            .filter(|record| record.visited_year() == Some(year))
            .collect(),
        None => all_records,
    };

    Ok(ScrapeResult {
        items,
        filtered_by_year: year_filter,
    })
}

/// Whether this page proves every later page is older than `year`
///
/// Only the last record with a readable date counts. A page without any
/// dated record never stops pagination.
pub fn crosses_year_boundary(page_records: &[WorkRecord], year: i32) -> bool {
    page_records
        .iter()
        .rev()
        .find_map(WorkRecord::visited_year)
        .map(|last_year| last_year < year)
        .unwrap_or(false)
}
