use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Login and password for one scrape run
///
/// Never logged and never stored past the run that uses it.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default, alias = "username")]
    pub login: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    /// Both fields are present and non-blank
    pub fn is_complete(&self) -> bool {
        !self.login.trim().is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One work listed in the reading history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRecord {
    pub title: String,
    pub author: String,
    /// Absolute URL of the work
    pub url: String,
    pub word_count: u64,
    /// Relationships first, then characters, then freeform tags
    pub tags: Vec<String>,
    pub relationships: Vec<String>,
    pub rating: String,
    pub fandoms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_visited: Option<NaiveDate>,
}

impl WorkRecord {
    /// Year of the last visit, if the date could be read
    pub fn visited_year(&self) -> Option<i32> {
        self.last_visited.map(|date| date.year())
    }
}

/// Records extracted from one listing page
#[derive(Debug, Clone, Default)]
pub struct PageResult {
    pub records: Vec<WorkRecord>,
    pub has_next_page: bool,
}

/// Outcome of a complete pagination run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    /// Page order, then in-page order
    pub items: Vec<WorkRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered_by_year: Option<i32>,
}

/// Progress notification emitted while a scrape runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub current_page: u32,
    pub total_items_so_far: usize,
    pub status_message: String,
}

impl ProgressEvent {
    pub fn new(current_page: u32, total_items_so_far: usize, status_message: impl Into<String>) -> Self {
        Self {
            current_page,
            total_items_so_far,
            status_message: status_message.into(),
        }
    }
}

/// Optional progress sink threaded through the pipeline
pub type ProgressFn<'a> = &'a (dyn Fn(ProgressEvent) + Send + Sync);
