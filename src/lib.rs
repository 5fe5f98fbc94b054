//! ao3-history: reading history statistics for Archive of Our Own accounts
//!
//! This crate logs into the archive with a user's credentials, walks the
//! paginated reading history, extracts structured metadata from every listed
//! work and reduces the result into ranked tag, relationship and fandom tables.

pub mod config;
pub mod output;
pub mod retry;
pub mod scrape;
pub mod service;
pub mod state;

use thiserror::Error;

/// Main error type for scrape operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("HTTP status error: {0}")]
    HttpStatus(#[from] HttpStatusError),

    #[error("Unexpected markup: {0}")]
    Protocol(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Gave up after {attempts} attempts: {source}")]
    ExhaustedRetries {
        attempts: u32,
        message: String,
        source: Box<ScrapeError>,
    },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Failures of the underlying transport, before any HTTP status is known
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection refused by {url}")]
    ConnectionRefused { url: String },

    #[error("DNS lookup failed for {url}")]
    DnsFailure { url: String },

    #[error("Connection reset while requesting {url}")]
    ConnectionReset { url: String },

    #[error("Network error for {url}: {message}")]
    Other { url: String, message: String },
}

/// Non-success HTTP statuses the pipeline distinguishes
#[derive(Debug, Error)]
pub enum HttpStatusError {
    #[error("Rate limited (HTTP 429) at {url}")]
    RateLimited { url: String },

    #[error("Forbidden (HTTP 403) at {url}")]
    Forbidden { url: String },

    #[error("Service unavailable (HTTP 503) at {url}")]
    ServiceUnavailable { url: String },

    #[error("HTTP {status} at {url}")]
    Other { url: String, status: u16 },
}

impl HttpStatusError {
    /// Maps a non-success status code onto the matching variant
    pub fn from_status(status: u16, url: &str) -> Self {
        let url = url.to_string();
        match status {
            429 => Self::RateLimited { url },
            403 => Self::Forbidden { url },
            503 => Self::ServiceUnavailable { url },
            status => Self::Other { url, status },
        }
    }

    /// The numeric HTTP status behind this error
    pub fn status(&self) -> u16 {
        match self {
            Self::RateLimited { .. } => 429,
            Self::Forbidden { .. } => 403,
            Self::ServiceUnavailable { .. } => 503,
            Self::Other { status, .. } => *status,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

impl ScrapeError {
    /// Descriptive, actionable text for the person who started the scrape
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(TransportError::Timeout { .. }) => {
                "The archive took too long to respond. It may be under heavy load; please try again in a few minutes.".to_string()
            }
            Self::Transport(TransportError::ConnectionRefused { .. }) => {
                "The archive refused the connection. It may be down for maintenance; please try again later.".to_string()
            }
            Self::Transport(TransportError::DnsFailure { .. }) => {
                "Could not resolve the archive's address. Check your internet connection.".to_string()
            }
            Self::Transport(TransportError::ConnectionReset { .. }) => {
                "The connection to the archive was reset. This usually clears up on its own; please try again shortly.".to_string()
            }
            Self::Transport(TransportError::Other { .. }) => {
                "A network error interrupted the connection to the archive. Please try again.".to_string()
            }
            Self::HttpStatus(HttpStatusError::RateLimited { .. }) => {
                "The archive is rate limiting requests right now. Please wait a few minutes before trying again.".to_string()
            }
            Self::HttpStatus(HttpStatusError::Forbidden { .. }) => {
                "The archive blocked this request (HTTP 403). Please wait a while before trying again.".to_string()
            }
            Self::HttpStatus(HttpStatusError::ServiceUnavailable { .. }) => {
                "The archive is temporarily unavailable (HTTP 503), possibly for maintenance. Please try again later.".to_string()
            }
            Self::HttpStatus(HttpStatusError::Other { status, .. }) => {
                format!("The archive returned an unexpected HTTP {} response.", status)
            }
            Self::Protocol(detail) => format!(
                "The archive returned a page that could not be understood ({}). The site layout may have changed.",
                detail
            ),
            Self::Authentication(detail) => detail.clone(),
            Self::ExhaustedRetries { message, .. } => message.clone(),
            Self::InvalidRequest(detail) => detail.clone(),
            other => other.to_string(),
        }
    }

    /// Machine-readable code surfaced next to the message
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(TransportError::Timeout { .. }) => "ETIMEDOUT",
            Self::Transport(TransportError::ConnectionRefused { .. }) => "ECONNREFUSED",
            Self::Transport(TransportError::DnsFailure { .. }) => "ENOTFOUND",
            Self::Transport(TransportError::ConnectionReset { .. }) => "ECONNRESET",
            Self::Transport(TransportError::Other { .. }) => "ENETWORK",
            Self::HttpStatus(HttpStatusError::RateLimited { .. }) => "RATE_LIMITED",
            Self::HttpStatus(HttpStatusError::Forbidden { .. }) => "FORBIDDEN",
            Self::HttpStatus(HttpStatusError::ServiceUnavailable { .. }) => "SERVICE_UNAVAILABLE",
            Self::HttpStatus(HttpStatusError::Other { .. }) => "HTTP_ERROR",
            Self::Protocol(_) => "PROTOCOL_ERROR",
            Self::Authentication(_) => "AUTH_FAILED",
            Self::ExhaustedRetries { source, .. } => source.code(),
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Client(_) | Self::UrlParse(_) => "INTERNAL",
        }
    }

    /// HTTP status to answer with at the request boundary
    pub fn status(&self) -> u16 {
        match self {
            Self::Transport(TransportError::Timeout { .. }) => 504,
            Self::Transport(_) => 502,
            Self::HttpStatus(HttpStatusError::Other { .. }) => 502,
            Self::HttpStatus(err) => err.status(),
            Self::Protocol(_) => 502,
            Self::Authentication(_) => 401,
            Self::ExhaustedRetries { source, .. } => source.status(),
            Self::InvalidRequest(_) => 400,
            Self::Config(_) | Self::Client(_) | Self::UrlParse(_) => 500,
        }
    }
}

/// Result type alias for scrape operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use output::{aggregate, StatsSummary};
pub use scrape::{Credentials, ProgressEvent, ScrapeResult, Scraper, WorkRecord};
