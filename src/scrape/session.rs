//! HTTP session client
//!
//! One [`Session`] owns one cookie store and is used by exactly one scrape
//! run. This module handles:
//! - Building the client with browser-like default headers and timeouts
//! - GET and form POST requests that share the session cookies
//! - Classifying transport failures and non-success statuses

use crate::config::{SessionConfig, SiteConfig};
use crate::{HttpStatusError, Result, ScrapeError, TransportError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Response, StatusCode};
use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use url::Url;

/// An HTTP context with a persistent cookie store
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    base_url: Url,
}

impl Session {
    /// Opens a fresh session against the configured site
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ao3_history::config::Config;
    /// use ao3_history::scrape::Session;
    ///
    /// let config = Config::default();
    /// let session = Session::open(&config.site, &config.session).unwrap();
    /// ```
    pub fn open(site: &SiteConfig, config: &SessionConfig) -> Result<Self> {
        Self::open_with_timeout(site, config, config.timeout())
    }

    /// Opens a session with an overall timeout other than the configured one
    pub fn open_with_timeout(
        site: &SiteConfig,
        config: &SessionConfig,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(&site.base_url)?;
        let client = build_http_client(config, timeout)?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a site path such as `/users/login` against the base URL
    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Sends a GET request, classifying transport failures
    pub async fn get(&self, url: &Url) -> Result<Response> {
        tracing::debug!("GET {}", url);
        self.client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ScrapeError::Transport(classify_transport_error(&e, url.as_str())))
    }

    /// Sends a form-encoded POST request, following redirects
    pub async fn post_form(&self, url: &Url, form: &[(&str, &str)]) -> Result<Response> {
        tracing::debug!("POST {}", url);
        self.client
            .post(url.clone())
            .form(form)
            .send()
            .await
            .map_err(|e| ScrapeError::Transport(classify_transport_error(&e, url.as_str())))
    }

    /// Fetches a page and returns its body, failing on any non-success status
    pub async fn get_page(&self, url: &Url) -> Result<String> {
        let response = self.get(url).await?;
        check_status(response.status(), url.as_str())?;
        read_body(response, url.as_str()).await
    }
}

/// Builds the HTTP client behind a session
///
/// The client keeps cookies across requests, follows redirects and sends a
/// desktop-browser header set.
pub fn build_http_client(config: &SessionConfig, timeout: Duration) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));

    let client = Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .cookie_store(true)
        .timeout(timeout)
        .connect_timeout(config.connect_timeout())
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Reads a response body, mapping interrupted reads to transport errors
pub async fn read_body(response: Response, url: &str) -> Result<String> {
    response
        .text()
        .await
        .map_err(|e| ScrapeError::Transport(classify_transport_error(&e, url)))
}

/// Maps any non-success status to the matching [`HttpStatusError`]
pub fn check_status(status: StatusCode, url: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    Err(HttpStatusError::from_status(status.as_u16(), url).into())
}

/// Classifies a transport failure
///
/// | Condition | Variant |
/// |-----------|---------|
/// | Client or socket timeout | Timeout |
/// | `ECONNREFUSED` | ConnectionRefused |
/// | Name resolution failure | DnsFailure |
/// | Reset, abort, broken pipe, early EOF | ConnectionReset |
/// | Anything else | Other |
pub fn classify_transport_error(err: &reqwest::Error, url: &str) -> TransportError {
    let url = url.to_string();

    if err.is_timeout() {
        return TransportError::Timeout { url };
    }

    if let Some(kind) = io_error_kind(err) {
        match kind {
            io::ErrorKind::TimedOut => return TransportError::Timeout { url },
            io::ErrorKind::ConnectionRefused => return TransportError::ConnectionRefused { url },
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => return TransportError::ConnectionReset { url },
            _ => {}
        }
    }

    let message = error_chain_text(err);
    let lowered = message.to_lowercase();
    if lowered.contains("dns error")
        || lowered.contains("failed to lookup address")
        || lowered.contains("name or service not known")
        || lowered.contains("no such host")
    {
        return TransportError::DnsFailure { url };
    }

    if lowered.contains("connection reset") || lowered.contains("connection closed") {
        return TransportError::ConnectionReset { url };
    }

    TransportError::Other { url, message }
}

/// Finds the first `std::io::Error` in the source chain
fn io_error_kind(err: &reqwest::Error) -> Option<io::ErrorKind> {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(current) = source {
        if let Some(io_err) = current.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = current.source();
    }
    None
}

fn error_chain_text(err: &reqwest::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(current) = source {
        parts.push(current.to_string());
        source = current.source();
    }
    parts.join(": ")
}
