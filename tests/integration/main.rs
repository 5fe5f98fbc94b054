//! Integration tests for ao3-history
//!
//! These tests use wiremock to stand in for the archive and exercise the
//! login handshake, pagination and the request surface end-to-end.

mod scrape_tests;
mod service_tests;
mod support;
