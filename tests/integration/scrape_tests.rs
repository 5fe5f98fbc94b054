//! End-to-end scrape runs against a mock archive

use crate::support::*;
use ao3_history::scrape::{Credentials, ProgressEvent};
use ao3_history::{ScrapeError, Scraper};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> Credentials {
    Credentials::new(LOGIN, PASSWORD)
}

fn scraper_for(server: &MockServer) -> (Scraper, Arc<RecordingBackoff>) {
    let backoff = Arc::new(RecordingBackoff::default());
    let scraper = Scraper::with_backoff(test_config(&server.uri()), backoff.clone());
    (scraper, backoff)
}

#[tokio::test]
async fn test_scrape_collects_every_page_in_order() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_history_page(
        &server,
        1,
        history_page(
            &[entry(1, "First", "14 Jan 2024"), entry(2, "Second", "10 Jan 2024")],
            true,
        ),
    )
    .await;
    mount_history_page(
        &server,
        2,
        history_page(&[entry(3, "Third", "02 Dec 2023")], false),
    )
    .await;

    let (scraper, backoff) = scraper_for(&server);
    let events = Mutex::new(Vec::new());
    let report = |event: ProgressEvent| events.lock().unwrap().push(event);

    let result = scraper
        .scrape(&credentials(), None, Some(&report))
        .await
        .expect("scrape should succeed");

    let titles: Vec<_> = result.items.iter().map(|w| w.title.as_str()).collect();
    assert_eq!(titles, vec!["First", "Second", "Third"]);
    assert_eq!(result.items[0].url, format!("{}/works/1", server.uri()));
    assert_eq!(result.items[0].word_count, 100);
    assert_eq!(result.items[2].tags, vec!["A/B", "Fluff"]);
    assert!(backoff.waits.lock().unwrap().is_empty());

    let events = events.into_inner().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].current_page, 2);
    assert_eq!(events[1].total_items_so_far, 3);
    assert_eq!(events[1].status_message, "Fetched page 2 (3 works so far)");
}

#[tokio::test]
async fn test_year_filter_stops_after_boundary_page() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_history_page(
        &server,
        1,
        history_page(
            &[entry(1, "New A", "20 Mar 2022"), entry(2, "New B", "01 Feb 2022")],
            true,
        ),
    )
    .await;
    mount_history_page(
        &server,
        2,
        history_page(
            &[entry(3, "New C", "20 Jan 2022"), entry(4, "New D", "03 Jan 2022")],
            true,
        ),
    )
    .await;
    // last dated record on page 3 is from 2020
    mount_history_page(
        &server,
        3,
        history_page(
            &[entry(5, "New E", "01 Jan 2022"), entry(6, "Old A", "05 May 2020")],
            true,
        ),
    )
    .await;

    Mock::given(method("GET"))
        .and(path(format!("/users/{}/readings", LOGIN)))
        .and(query_param("page", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_string(history_page(&[], false)))
        .expect(0)
        .mount(&server)
        .await;

    let (scraper, _) = scraper_for(&server);
    let result = scraper
        .scrape(&credentials(), Some(2022), None)
        .await
        .expect("scrape should succeed");

    let titles: Vec<_> = result.items.iter().map(|w| w.title.as_str()).collect();
    assert_eq!(titles, vec!["New A", "New B", "New C", "New D", "New E"]);
    assert_eq!(result.filtered_by_year, Some(2022));
}

#[tokio::test]
async fn test_bad_credentials_fail_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_form(Some(TOKEN))))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div class="flash error">The password or user name you entered doesn't match our records.</div></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let (scraper, backoff) = scraper_for(&server);
    let err = scraper
        .scrape(&Credentials::new(LOGIN, "wrong"), None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::Authentication(_)));
    assert_eq!(err.user_message(), "Invalid username or password");
    assert_eq!(err.status(), 401);
    assert!(backoff.waits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_token_is_protocol_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_form(None)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/users/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (scraper, _) = scraper_for(&server);
    let err = scraper.scrape(&credentials(), None, None).await.unwrap_err();

    assert!(matches!(err, ScrapeError::Protocol(_)));
    assert_eq!(err.code(), "PROTOCOL_ERROR");
}

#[tokio::test]
async fn test_rate_limited_login_page_surfaces_immediately() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/login"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let (scraper, backoff) = scraper_for(&server);
    let err = scraper.scrape(&credentials(), None, None).await.unwrap_err();

    assert_eq!(err.code(), "RATE_LIMITED");
    assert_eq!(err.status(), 429);
    assert!(backoff.waits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_ambiguous_login_continues_to_history() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("{}; path=/", SESSION_COOKIE).as_str())
                .set_body_string(login_form(Some(TOKEN))),
        )
        .mount(&server)
        .await;

    // neither an error flash nor a greeting
    Mock::given(method("POST"))
        .and(path("/users/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body><p>Welcome</p></body></html>"),
        )
        .mount(&server)
        .await;

    mount_history_page(
        &server,
        1,
        history_page(&[entry(9, "Only", "14 Jan 2024")], false),
    )
    .await;

    let (scraper, _) = scraper_for(&server);
    let result = scraper
        .scrape(&credentials(), None, None)
        .await
        .expect("ambiguous login should not fail the run");

    assert_eq!(result.items.len(), 1);
}

#[tokio::test]
async fn test_transient_page_failure_restarts_on_fresh_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("{}; path=/", SESSION_COOKIE).as_str())
                .set_body_string(login_form(Some(TOKEN))),
        )
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(signed_in_page()))
        .expect(2)
        .mount(&server)
        .await;

    // first fetch of page 1 fails with a gateway error, later ones succeed
    Mock::given(method("GET"))
        .and(path(format!("/users/{}/readings", LOGIN)))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    mount_history_page(
        &server,
        1,
        history_page(&[entry(1, "Recovered", "14 Jan 2024")], false),
    )
    .await;

    let (scraper, backoff) = scraper_for(&server);
    let events = Mutex::new(Vec::new());
    let report = |event: ProgressEvent| events.lock().unwrap().push(event);

    let result = scraper
        .scrape(&credentials(), None, Some(&report))
        .await
        .expect("second attempt should succeed");

    assert_eq!(result.items.len(), 1);
    assert_eq!(
        *backoff.waits.lock().unwrap(),
        vec![Duration::from_millis(30)]
    );

    let events = events.into_inner().unwrap();
    assert_eq!(events[0].current_page, 0);
    assert_eq!(events[0].total_items_so_far, 0);
    assert!(events[0].status_message.starts_with("Connection issue, retrying"));
}

#[tokio::test]
async fn test_exhausted_retries_return_no_items() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/users/{}/readings", LOGIN)))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let (scraper, backoff) = scraper_for(&server);
    let err = scraper.scrape(&credentials(), None, None).await.unwrap_err();

    match &err {
        ScrapeError::ExhaustedRetries { attempts, .. } => assert_eq!(*attempts, 3),
        other => panic!("expected ExhaustedRetries, got {:?}", other),
    }
    assert_eq!(
        *backoff.waits.lock().unwrap(),
        vec![Duration::from_millis(30), Duration::from_millis(60)]
    );
}

#[tokio::test]
async fn test_ambiguous_login_redirected_to_login_page_is_auth_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("{}; path=/", SESSION_COOKIE).as_str())
                .set_body_string(login_form(Some(TOKEN))),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/users/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body><p>Welcome</p></body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    // the archive bounces a signed-out history request back to the login form
    Mock::given(method("GET"))
        .and(path(format!("/users/{}/readings", LOGIN)))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/users/login"))
        .expect(1)
        .mount(&server)
        .await;

    let (scraper, backoff) = scraper_for(&server);
    let err = scraper.scrape(&credentials(), None, None).await.unwrap_err();

    assert!(matches!(err, ScrapeError::Authentication(_)));
    assert_eq!(err.user_message(), "Invalid username or password");
    assert_eq!(err.status(), 401);
    assert!(backoff.waits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_email_login_reads_history_of_greeted_user() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("{}; path=/", SESSION_COOKIE).as_str())
                .set_body_string(login_form(Some(TOKEN))),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(signed_in_page()))
        .expect(1)
        .mount(&server)
        .await;

    // history lives under the username from the greeting, not the email
    mount_history_page(
        &server,
        1,
        history_page(&[entry(4, "Found", "14 Jan 2024")], false),
    )
    .await;

    let (scraper, _) = scraper_for(&server);
    let result = scraper
        .scrape(&Credentials::new("reader@example.com", PASSWORD), None, None)
        .await
        .expect("email login should resolve to the account's username");

    let titles: Vec<_> = result.items.iter().map(|w| w.title.as_str()).collect();
    assert_eq!(titles, vec!["Found"]);
}
