//! Synchronous request handlers
//!
//! Handlers return an [`ApiReply`] (status plus JSON body) and leave the
//! transport binding to the caller.

use crate::output::{aggregate, StatsSummary};
use crate::scrape::{Credentials, Scraper, WorkRecord};
use crate::ScrapeError;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Body of a scrape request
///
/// Accepts `login` or the older `username` key for the account name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScrapeRequest {
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(default)]
    pub year: Option<i32>,
}

impl ScrapeRequest {
    pub fn new(credentials: Credentials, year: Option<i32>) -> Self {
        Self { credentials, year }
    }
}

/// Successful scrape payload
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeResponse {
    pub items: Vec<WorkRecord>,
    pub statistics: StatsSummary,
}

impl ScrapeResponse {
    pub fn from_items(items: Vec<WorkRecord>) -> Self {
        let statistics = aggregate(&items);
        Self { items, statistics }
    }
}

/// Failure payload shared by every surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

impl From<&ScrapeError> for ErrorBody {
    fn from(err: &ScrapeError) -> Self {
        Self {
            error: err.user_message(),
            code: err.code(),
        }
    }
}

/// Status code and JSON body produced by a handler
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: u16,
    pub body: Value,
}

impl ApiReply {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Serializes `payload` as the body, falling back to a 500 reply
    pub fn json<T: Serialize>(status: u16, payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(body) => Self::new(status, body),
            Err(e) => {
                tracing::error!("Failed to serialize response: {}", e);
                Self::new(500, json!({ "error": "Failed to serialize response" }))
            }
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Runs one scrape and reduces the records into a response
pub async fn run_scrape(
    scraper: &Scraper,
    request: &ScrapeRequest,
) -> crate::Result<ScrapeResponse> {
    let result = scraper
        .scrape(&request.credentials, request.year, None)
        .await?;
    Ok(ScrapeResponse::from_items(result.items))
}

/// Runs one scrape and maps the outcome to a reply
///
/// # Returns
///
/// * `200 {items, statistics}` on success
/// * `400 {error, code}` when login or password is missing
/// * The error's own status with `{error, code}` otherwise; no items are
///   returned after a failure
pub async fn handle_scrape(scraper: &Scraper, request: &ScrapeRequest) -> ApiReply {
    match run_scrape(scraper, request).await {
        Ok(response) => ApiReply::json(200, &response),
        Err(e) => error_reply(&e),
    }
}

/// `{error, code}` reply carrying the error's own status
pub fn error_reply(err: &ScrapeError) -> ApiReply {
    tracing::error!("Scraping error: {}", err);
    ApiReply::json(err.status(), &ErrorBody::from(err))
}

/// Liveness reply with the current timestamp
pub fn health() -> ApiReply {
    ApiReply::new(
        200,
        json!({
            "status": "ok",
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }),
    )
}
