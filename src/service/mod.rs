//! Request surface
//!
//! Transport-agnostic handlers for the four operations the tool exposes:
//! scrape, streamed scrape, health and connectivity probe. [`Service`] owns
//! the process-scoped probe gate and hands it to every probe.

mod api;
mod probe;
mod stream;

pub use api::{
    error_reply, handle_scrape, health, run_scrape, ApiReply, ErrorBody, ScrapeRequest,
    ScrapeResponse,
};
pub use probe::test_connection;
pub use stream::{scrape_stream, StreamEvent};

use crate::config::Config;
use crate::scrape::Scraper;
use crate::state::ProbeGate;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Serving component shared by all requests of one process
#[derive(Clone)]
pub struct Service {
    scraper: Scraper,
    probe_gate: Arc<ProbeGate>,
}

impl Service {
    pub fn new(config: Config) -> Self {
        Self::with_scraper(Scraper::new(config))
    }

    pub fn with_scraper(scraper: Scraper) -> Self {
        let probe_gate = Arc::new(ProbeGate::new(scraper.config().probe.cooldown()));
        Self {
            scraper,
            probe_gate,
        }
    }

    pub fn probe_gate(&self) -> &ProbeGate {
        &self.probe_gate
    }

    pub async fn scrape(&self, request: &ScrapeRequest) -> ApiReply {
        handle_scrape(&self.scraper, request).await
    }

    /// Typed variant of [`Service::scrape`] for callers that render the
    /// statistics themselves
    pub async fn scrape_response(&self, request: &ScrapeRequest) -> crate::Result<ScrapeResponse> {
        run_scrape(&self.scraper, request).await
    }

    pub fn scrape_stream(&self, request: ScrapeRequest) -> UnboundedReceiver<StreamEvent> {
        scrape_stream(self.scraper.clone(), request)
    }

    pub fn health(&self) -> ApiReply {
        health()
    }

    pub async fn test_connection(&self) -> ApiReply {
        test_connection(self.scraper.config(), &self.probe_gate).await
    }
}
