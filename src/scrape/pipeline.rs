//! Scrape orchestration
//!
//! Ties the pieces together for one request:
//! 1. Open a fresh session
//! 2. Log in
//! 3. Drive pagination
//!
//! and wraps all three in the retry controller. Every attempt gets its own
//! session; nothing is shared between attempts or between requests.

use crate::config::Config;
use crate::retry::{run_with_retry, Backoff, RetryNotice, RetryPolicy, Stage, StageError, TokioBackoff};
use crate::scrape::auth::authenticate;
use crate::scrape::paginator::drive;
use crate::scrape::session::Session;
use crate::scrape::types::{Credentials, ProgressEvent, ProgressFn, ScrapeResult};
use crate::{Result, ScrapeError};
use std::sync::Arc;

/// Entry point for running scrapes with one configuration
#[derive(Clone)]
pub struct Scraper {
    config: Arc<Config>,
    backoff: Arc<dyn Backoff>,
}

impl Scraper {
    pub fn new(config: Config) -> Self {
        Self::with_backoff(config, Arc::new(TokioBackoff))
    }

    /// Uses a custom waiting strategy between retry attempts
    pub fn with_backoff(config: Config, backoff: Arc<dyn Backoff>) -> Self {
        Self {
            config: Arc::new(config),
            backoff,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Logs in and collects the reading history
    ///
    /// # Arguments
    ///
    /// * `credentials` - Account to scrape
    /// * `year` - Keep only works last visited in this year
    /// * `progress` - Receives per-page progress and retry notices
    ///
    /// # Returns
    ///
    /// * `Ok(ScrapeResult)` - All (or year-filtered) records in history order
    /// * `Err(ScrapeError)` - No partial results are returned on failure
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ao3_history::{Config, Credentials, Scraper};
    ///
    /// # async fn example() -> ao3_history::Result<()> {
    /// let scraper = Scraper::new(Config::default());
    /// let result = scraper
    ///     .scrape(&Credentials::new("reader", "secret"), Some(2024), None)
    ///     .await?;
    /// println!("{} works", result.items.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn scrape(
        &self,
        credentials: &Credentials,
        year: Option<i32>,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<ScrapeResult> {
        if !credentials.is_complete() {
            return Err(ScrapeError::InvalidRequest(
                "Username and password required".to_string(),
            ));
        }

        match year {
            Some(year) => tracing::info!("Starting scrape for {} (year {})", credentials.login, year),
            None => tracing::info!("Starting scrape for {}", credentials.login),
        }

        let policy = RetryPolicy::from_config(&self.config.retry);
        let forward_retry = |notice: &RetryNotice| {
            if let Some(report) = progress {
                report(ProgressEvent::new(0, 0, notice.message()));
            }
        };

        let result = run_with_retry(
            &policy,
            self.backoff.as_ref(),
            |attempt| {
                tracing::debug!("Scrape attempt {}", attempt);
                run_once(&self.config, credentials, year, progress)
            },
            Some(&forward_retry),
        )
        .await?;

        tracing::info!("Scraped {} works", result.items.len());
        Ok(result)
    }
}

/// One full attempt on a fresh session
async fn run_once(
    config: &Config,
    credentials: &Credentials,
    year: Option<i32>,
    progress: Option<ProgressFn<'_>>,
) -> std::result::Result<ScrapeResult, StageError> {
    let session = Session::open(&config.site, &config.session)
        .map_err(|e| StageError::new(Stage::Login, e))?;

    let authenticated = authenticate(session, credentials)
        .await
        .map_err(|e| StageError::new(Stage::Login, e))?;

    drive(&authenticated, &config.pagination, year, progress)
        .await
        .map_err(|e| StageError::new(Stage::Pagination, e))
}
