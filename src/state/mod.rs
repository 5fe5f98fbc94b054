//! State module for process-scoped shared state
//!
//! Scrape runs share nothing with each other. The one exception is the
//! connectivity probe gate, which limits how often the site is probed.

mod probe_gate;

pub use probe_gate::{wait_secs, ProbeGate};
