use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure
///
/// Every section is optional; a missing file or section falls back to the
/// defaults tuned for archiveofourown.org.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub session: SessionConfig,
    pub pagination: PaginationConfig,
    pub retry: RetryConfig,
    pub probe: ProbeConfig,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Root URL of the archive, without a trailing path
    #[serde(rename = "base-url")]
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://archiveofourown.org".to_string(),
        }
    }
}

/// HTTP session configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Overall request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Browser-identifying user agent sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            connect_timeout_secs: 15,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Reading-history pagination configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Insert a cooldown after every this many completed pages
    #[serde(rename = "cooldown-every")]
    pub cooldown_every: u32,

    /// Length of the cooldown (milliseconds)
    #[serde(rename = "cooldown-ms")]
    pub cooldown_ms: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            cooldown_every: 5,
            cooldown_ms: 5000,
        }
    }
}

impl PaginationConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Retry behavior for the whole login + pagination pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Backoff unit when the login handshake fails (milliseconds)
    #[serde(rename = "login-base-delay-ms")]
    pub login_base_delay_ms: u64,

    /// Backoff unit when a page fetch fails mid-scrape (milliseconds)
    #[serde(rename = "pagination-base-delay-ms")]
    pub pagination_base_delay_ms: u64,

    /// Whether HTTP 429/503 responses consume retries instead of failing fast
    #[serde(rename = "retry-throttled")]
    pub retry_throttled: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            login_base_delay_ms: 5000,
            pagination_base_delay_ms: 15000,
            retry_throttled: false,
        }
    }
}

/// Connectivity probe configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Minimum interval between probes per process (seconds)
    #[serde(rename = "cooldown-secs")]
    pub cooldown_secs: u64,

    /// Request timeout for the probe itself (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 60,
            timeout_secs: 30,
        }
    }
}

impl ProbeConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
