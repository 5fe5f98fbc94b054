//! Request surface tests: JSON replies, event stream and connectivity probe

use crate::support::*;
use ao3_history::config::load_config;
use ao3_history::scrape::Credentials;
use ao3_history::service::{ScrapeRequest, Service, StreamEvent};
use ao3_history::Scraper;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_for(server: &MockServer) -> Service {
    let backoff = Arc::new(RecordingBackoff::default());
    Service::with_scraper(Scraper::with_backoff(test_config(&server.uri()), backoff))
}

fn request(year: Option<i32>) -> ScrapeRequest {
    ScrapeRequest::new(Credentials::new(LOGIN, PASSWORD), year)
}

async fn collect(service: &Service, request: ScrapeRequest) -> Vec<StreamEvent> {
    let mut rx = service.scrape_stream(request);
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_scrape_reply_contains_items_and_statistics() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_history_page(
        &server,
        1,
        history_page(
            &[entry(1, "First", "14 Jan 2024"), entry(30, "Second", "10 Jan 2024")],
            false,
        ),
    )
    .await;

    let reply = service_for(&server).scrape(&request(None)).await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body["items"].as_array().unwrap().len(), 2);
    assert_eq!(reply.body["items"][0]["lastVisited"], "2024-01-14");

    let stats = &reply.body["statistics"];
    assert_eq!(stats["totalFics"], 2);
    assert_eq!(stats["totalWords"], 3100);
    assert_eq!(stats["topShips"][0]["name"], "A/B");
    assert_eq!(stats["topShips"][0]["count"], 2);
    assert_eq!(stats["topFandoms"][0]["name"], "Fandom F");
    assert_eq!(stats["longestFic"]["title"], "Second");
}

#[tokio::test]
async fn test_scrape_reply_for_bad_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_form(Some(TOKEN))))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div id="error">Invalid username or password</div>"#,
        ))
        .mount(&server)
        .await;

    let reply = service_for(&server).scrape(&request(None)).await;

    assert_eq!(reply.status, 401);
    assert_eq!(reply.body["error"], "Invalid username or password");
    assert_eq!(reply.body["code"], "AUTH_FAILED");
    assert!(reply.body.get("items").is_none());
}

#[tokio::test]
async fn test_stream_emits_progress_then_complete() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_history_page(
        &server,
        1,
        history_page(&[entry(1, "First", "14 Jan 2024")], true),
    )
    .await;
    mount_history_page(
        &server,
        2,
        history_page(&[entry(2, "Second", "12 Jan 2024")], false),
    )
    .await;

    let events = collect(&service_for(&server), request(None)).await;

    let names: Vec<_> = events.iter().map(StreamEvent::name).collect();
    assert_eq!(names, vec!["progress", "progress", "complete"]);

    match &events[2] {
        StreamEvent::Complete(response) => {
            assert_eq!(response.items.len(), 2);
            assert_eq!(response.statistics.total_fics, 2);
        }
        other => panic!("expected complete event, got {:?}", other),
    }

    let frame = events[0].to_sse().unwrap();
    assert!(frame.starts_with("event: progress\ndata: "));
    assert!(frame.contains("\"statusMessage\":\"Fetched page 1 (1 works so far)\""));
}

#[tokio::test]
async fn test_stream_failure_ends_with_single_error_event() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_history_page(
        &server,
        1,
        history_page(&[entry(1, "First", "14 Jan 2024")], true),
    )
    .await;

    Mock::given(method("GET"))
        .and(path(format!("/users/{}/readings", LOGIN)))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let events = collect(&service_for(&server), request(None)).await;

    let names: Vec<_> = events.iter().map(StreamEvent::name).collect();
    assert_eq!(names, vec!["progress", "error"]);
    match &events[1] {
        StreamEvent::Error(body) => assert_eq!(body.code, "FORBIDDEN"),
        other => panic!("expected error event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_probe_is_gated() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server);

    let first = service.test_connection().await;
    assert_eq!(first.status, 200);
    assert_eq!(first.body["success"], true);
    assert_eq!(first.body["status"], 200);

    let second = service.test_connection().await;
    assert_eq!(second.status, 429);
    assert_eq!(second.body["success"], false);
    let wait = second.body["waitTime"].as_u64().unwrap();
    assert!(wait > 0 && wait <= 60);
}

#[tokio::test]
async fn test_concurrent_probes_admit_one() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server);
    let probes: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.test_connection().await.status })
        })
        .collect();

    let mut statuses = Vec::new();
    for probe in probes {
        statuses.push(probe.await.unwrap());
    }
    statuses.sort_unstable();
    assert_eq!(statuses, vec![200, 429, 429, 429]);
}

#[tokio::test]
async fn test_config_file_drives_the_service() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[site]
base-url = "{}"

[probe]
cooldown-secs = 5
timeout-secs = 2
"#,
        server.uri()
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    let service = Service::new(config);

    let reply = service.test_connection().await;
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body["code"], "SERVICE_UNAVAILABLE");
    assert_eq!(
        service.probe_gate().window(),
        std::time::Duration::from_secs(5)
    );
}

#[tokio::test]
async fn test_typed_scrape_response_matches_reply() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_history_page(
        &server,
        1,
        history_page(&[entry(1, "First", "14 Jan 2024")], false),
    )
    .await;

    let response = service_for(&server)
        .scrape_response(&request(None))
        .await
        .expect("scrape should succeed");

    assert_eq!(response.items.len(), 1);
    assert_eq!(response.statistics.total_fics, 1);
    assert_eq!(response.statistics.total_words, 100);
    assert_eq!(response.statistics.top_ships[0].name, "A/B");
}
