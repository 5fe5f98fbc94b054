//! Streaming scrape surface
//!
//! A streamed scrape yields zero or more `progress` events followed by
//! exactly one `complete` or `error` event.

use crate::scrape::{ProgressEvent, Scraper};
use crate::service::api::{ErrorBody, ScrapeRequest, ScrapeResponse};
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// One event of a streamed scrape
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Progress(ProgressEvent),
    Complete(ScrapeResponse),
    Error(ErrorBody),
}

impl StreamEvent {
    /// Event name on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::Progress(_) => "progress",
            Self::Complete(_) => "complete",
            Self::Error(_) => "error",
        }
    }

    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }

    /// JSON payload of the event
    pub fn data(&self) -> serde_json::Result<String> {
        match self {
            Self::Progress(event) => serde_json::to_string(event),
            Self::Complete(response) => serde_json::to_string(response),
            Self::Error(body) => serde_json::to_string(body),
        }
    }

    /// Renders the event in `text/event-stream` framing
    ///
    /// # Example
    ///
    /// ```
    /// use ao3_history::scrape::ProgressEvent;
    /// use ao3_history::service::StreamEvent;
    ///
    /// let event = StreamEvent::Progress(ProgressEvent::new(1, 20, "Fetched page 1 (20 works so far)"));
    /// let frame = event.to_sse().unwrap();
    /// assert!(frame.starts_with("event: progress\ndata: {"));
    /// assert!(frame.ends_with("\n\n"));
    /// ```
    pub fn to_sse(&self) -> serde_json::Result<String> {
        Ok(format!("event: {}\ndata: {}\n\n", self.name(), self.data()?))
    }
}

impl Serialize for StreamEvent {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Progress(event) => event.serialize(serializer),
            Self::Complete(response) => response.serialize(serializer),
            Self::Error(body) => body.serialize(serializer),
        }
    }
}

/// Starts a scrape on a background task and returns its event stream
///
/// Must be called from within a tokio runtime. The receiver closes after the
/// terminal event. Progress already sent stays delivered when the run later
/// fails; no items are sent with the error.
pub fn scrape_stream(scraper: Scraper, request: ScrapeRequest) -> UnboundedReceiver<StreamEvent> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let progress_tx = tx.clone();
        let report = move |event: ProgressEvent| {
            // receiver gone means the client went away; the run still finishes
            let _ = progress_tx.send(StreamEvent::Progress(event));
        };

        let last = match scraper
            .scrape(&request.credentials, request.year, Some(&report))
            .await
        {
            Ok(result) => StreamEvent::Complete(ScrapeResponse::from_items(result.items)),
            Err(e) => {
                tracing::error!("Streaming scrape failed: {}", e);
                StreamEvent::Error(ErrorBody::from(&e))
            }
        };

        let _ = tx.send(last);
    });

    rx
}
