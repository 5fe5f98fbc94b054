use crate::config::types::{
    Config, PaginationConfig, ProbeConfig, RetryConfig, SessionConfig, SiteConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_session_config(&config.session)?;
    validate_pagination_config(&config.pagination)?;
    validate_retry_config(&config.retry)?;
    validate_probe_config(&config.probe)?;
    Ok(())
}

fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' has no host",
            config.base_url
        )));
    }

    Ok(())
}

fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "session timeout-secs must be > 0".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "session connect-timeout-secs must be > 0".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "session user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_pagination_config(config: &PaginationConfig) -> Result<(), ConfigError> {
    if config.cooldown_every < 1 {
        return Err(ConfigError::Validation(format!(
            "pagination cooldown-every must be >= 1, got {}",
            config.cooldown_every
        )));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "retry max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    Ok(())
}

fn validate_probe_config(config: &ProbeConfig) -> Result<(), ConfigError> {
    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "probe timeout-secs must be > 0".to_string(),
        ));
    }

    Ok(())
}
