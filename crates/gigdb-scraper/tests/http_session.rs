//! Integration tests for `HttpSession` against a local `wiremock` server.

use std::time::Duration;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gigdb_scraper::{
    load_with_retry, ClickTarget, HttpSession, PageSession, RetryPolicy, SessionError,
};

fn test_session(timeout_secs: u64) -> HttpSession {
    HttpSession::new(Duration::from_secs(timeout_secs), "gigdb-test/0.1")
        .expect("failed to build test HttpSession")
}

#[tokio::test]
async fn open_then_snapshot_returns_page_markup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events/1"))
        .and(header("user-agent", "gigdb-test/0.1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><h1>Warehouse Rave</h1></body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut session = test_session(5);
    let url = format!("{}/events/1", server.uri());
    session.open(&url).await.expect("open should succeed");

    let snapshot = session.snapshot().await.expect("snapshot after open");
    assert_eq!(snapshot.url, url);
    assert!(snapshot.html.contains("Warehouse Rave"));
}

#[tokio::test]
async fn snapshot_before_open_is_no_page() {
    let mut session = test_session(5);
    let err = session.snapshot().await.unwrap_err();
    assert!(matches!(err, SessionError::NoPage));
}

#[tokio::test]
async fn not_found_is_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut session = test_session(5);
    let err = session
        .open(&format!("{}/events/missing", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::UnexpectedStatus { status: 404, .. }));
    assert!(!err.is_retriable());

    // A failed open leaves no stale page behind.
    assert!(matches!(session.snapshot().await, Err(SessionError::NoPage)));
}

#[tokio::test]
async fn slow_page_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut session = test_session(1);
    let err = session
        .open(&format!("{}/events/slow", server.uri()))
        .await
        .unwrap_err();
    assert!(
        matches!(err, SessionError::Timeout { timeout_secs: 1, .. }),
        "expected Timeout, got {err:?}"
    );
    assert!(err.is_retriable());
}

#[tokio::test]
async fn click_is_unsupported() {
    let mut session = test_session(5);
    let target = ClickTarget {
        index: 0,
        text: "Load more".to_string(),
    };
    let err = session.click(&target).await.unwrap_err();
    assert!(matches!(err, SessionError::Unsupported { operation: "click" }));
}

#[tokio::test]
async fn server_error_is_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/events/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let mut session = test_session(5);
    let policy = RetryPolicy {
        max_retries: 2,
        backoff_base_secs: 0,
    };
    let snapshot = load_with_retry(
        &mut session,
        &format!("{}/events/flaky", server.uri()),
        Duration::ZERO,
        policy,
    )
    .await
    .expect("second attempt should succeed");
    assert_eq!(snapshot.html, "<html>ok</html>");
}
