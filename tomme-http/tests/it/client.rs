use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use tomme_http::{FetchError, HttpClient, StatusCode};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::builder()
        .base_url(format!("{}/", server.uri()))
        .timeout(Duration::from_millis(200))
        .max_retries(2)
        .backoff_base(Duration::from_millis(10))
        .user_agent("tomme-test")
        .build()
        .unwrap()
}

#[tokio::test]
async fn get_sends_query_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/toemmekalender"))
        .and(query_param("nummer", "013165"))
        .and(header("x-api-key", "secret"))
        .and(header("user-agent", "tomme-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"ok": true}])))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client_for(&server);
    client.set_header("X-Api-Key", "secret").unwrap();

    let body = client
        .get("/api/v1/toemmekalender", &[("nummer", "013165")], None)
        .await;

    assert_eq!(body, Some(json!([{"ok": true}])));
}

#[tokio::test]
async fn http_error_is_attempted_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server).try_get("/endpoint", &[], None).await;

    let err = result.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
}

#[tokio::test]
async fn invalid_json_is_attempted_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server).try_get("/endpoint", &[], None).await;

    assert!(matches!(result, Err(FetchError::Decode { .. })));
}

#[tokio::test]
async fn slow_responses_time_out_and_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(2)),
        )
        .expect(3)
        .mount(&server)
        .await;

    let result = client_for(&server).try_get("/endpoint", &[], None).await;

    assert!(matches!(result, Err(FetchError::Timeout { .. })));
}

#[tokio::test]
async fn refused_connections_are_classified_as_transient() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = HttpClient::builder()
        .base_url(format!("http://127.0.0.1:{port}"))
        .max_retries(1)
        .backoff_base(Duration::from_millis(1))
        .build()
        .unwrap();

    let result = client.try_get("/endpoint", &[], None).await;

    let err = result.unwrap_err();
    assert!(err.is_transient(), "unexpected error: {err}");
}

#[tokio::test]
async fn dropped_connections_are_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&accepted);
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });

    let client = HttpClient::builder()
        .base_url(format!("http://127.0.0.1:{port}"))
        .timeout(Duration::from_secs(2))
        .max_retries(2)
        .backoff_base(Duration::from_millis(10))
        .build()
        .unwrap();

    let result = client.try_get("/endpoint", &[], None).await;

    assert!(
        matches!(result, Err(FetchError::Connect { .. })),
        "unexpected result: {result:?}"
    );
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn post_sends_form_and_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/submit"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .and(body_string_contains("name=Testvej"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client_for(&server);
    client.set_basic_auth("user", Some("pass"));

    let created = client
        .post("submit", Some(&[("name", "Testvej")]), None, None)
        .await;

    assert_eq!(created, Some(json!({"id": 1})));
}

#[tokio::test]
async fn post_failure_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .expect(1)
        .mount(&server)
        .await;

    let created = client_for(&server)
        .post("/submit", None, Some(&json!({"a": 1})), None)
        .await;

    assert!(created.is_none());
}
