//! Scrape module: session, login, pagination and extraction
//!
//! This module handles:
//! - Opening a browser-like HTTP session with its own cookie store
//! - Logging in with the site's anti-forgery token handshake
//! - Walking the paginated reading history with pacing and a year stop
//! - Extracting structured work records from listing markup

mod auth;
mod date;
mod paginator;
mod parser;
mod pipeline;
mod session;
mod types;

pub use auth::{
    authenticate, extract_token, inspect_login_response, is_login_page, signed_in_user,
    AuthenticatedSession, LoginState, TOKEN_FIELD,
};
pub use date::{parse_visit_date, strip_label};
pub use paginator::{crosses_year_boundary, drive, HistorySource, StopReason};
pub use parser::{
    extract, find_listing_nodes, has_next_page, parse_page, ListingMatcher, LISTING_MATCHERS,
};
pub use pipeline::Scraper;
pub use session::{build_http_client, check_status, classify_transport_error, read_body, Session};
pub use types::{
    Credentials, PageResult, ProgressEvent, ProgressFn, ScrapeResult, WorkRecord,
};
