//! Connectivity probe
//!
//! Checks that the site answers at all, at most once per cooldown window per
//! process.

use crate::config::Config;
use crate::scrape::{check_status, Session};
use crate::service::api::ApiReply;
use crate::state::{wait_secs, ProbeGate};
use crate::Result;
use serde_json::json;
use std::time::Instant;

/// Probes the site root through the shared gate
///
/// # Returns
///
/// * `200 {success: true, status, message}` when the site answered
/// * `500 {success: false, error, code, message}` when it did not
/// * `429 {success: false, message, waitTime}` inside the cooldown window
pub async fn test_connection(config: &Config, gate: &ProbeGate) -> ApiReply {
    if let Err(wait) = gate.try_acquire(Instant::now()) {
        let secs = wait_secs(wait);
        tracing::warn!("Connection test refused, next probe allowed in {}s", secs);
        return ApiReply::new(
            429,
            json!({
                "success": false,
                "message": format!("Please wait {} seconds before testing again", secs),
                "waitTime": secs,
            }),
        );
    }

    tracing::info!("Testing connection to {}", config.site.base_url);
    match probe(config).await {
        Ok(status) => {
            tracing::info!("Connection test successful. Status: {}", status);
            ApiReply::new(
                200,
                json!({
                    "success": true,
                    "status": status,
                    "message": "Successfully connected to AO3",
                }),
            )
        }
        Err(e) => {
            tracing::error!("Connection test failed: {} ({})", e, e.code());
            ApiReply::new(
                500,
                json!({
                    "success": false,
                    "error": e.user_message(),
                    "code": e.code(),
                    "message": "Failed to connect to AO3",
                }),
            )
        }
    }
}

async fn probe(config: &Config) -> Result<u16> {
    let session = Session::open_with_timeout(&config.site, &config.session, config.probe.timeout())?;
    let url = session.base_url().clone();
    let response = session.get(&url).await?;
    check_status(response.status(), url.as_str())?;
    Ok(response.status().as_u16())
}
