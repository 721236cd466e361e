use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{Value, json};
use tomme_core::{CollectionPointId, PortError, SchedulePort};
use tomme_http::HttpClient;
use tomme_renosyd::RenosydScheduleSource;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source_for(server: &MockServer) -> RenosydScheduleSource {
    let client = HttpClient::builder()
        .base_url(server.uri())
        .timeout(Duration::from_millis(500))
        .max_retries(0)
        .build()
        .unwrap();
    RenosydScheduleSource::new(client)
}

fn in_days(days: i64) -> String {
    (Utc::now() + ChronoDuration::days(days))
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

fn api_response() -> Value {
    json!([{
        "standplads": {
            "nummer": "013165",
            "navn": "Test Standplads",
            "adresse": {"vejnavn": "Testvej", "husnummer": "42", "kommunenummer": 123},
            "sidstændret": "2025-01-01T10:00:00Z"
        },
        "planlagtetømninger": [
            {"dato": in_days(30), "fraktioner": ["Restaffald", "Papir"]},
            {"dato": in_days(60), "fraktioner": ["Glas", "Metal"]}
        ]
    }])
}

async fn mount(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/v1/toemmekalender"))
        .and(query_param("nummer", "013165"))
        .respond_with(template)
        .expect(1)
        .mount(server)
        .await;
}

fn nummer() -> CollectionPointId {
    CollectionPointId("013165".to_owned())
}

#[tokio::test]
async fn fetches_and_parses_schedule() {
    let server = MockServer::start().await;
    mount(&server, ResponseTemplate::new(200).set_body_json(api_response())).await;

    let schedules = source_for(&server)
        .schedule(&nummer())
        .await
        .unwrap()
        .expect("a parsed schedule");

    assert_eq!(schedules.len(), 1);
    let schedule = schedules.first().unwrap();
    assert_eq!(schedule.collection_point.address.street, "Testvej");
    assert_eq!(schedule.collections.len(), 2);

    let next = schedule.next_collection().expect("an upcoming collection");
    assert_eq!(next.fractions_label(), "Restaffald, Papir");
}

#[tokio::test]
async fn error_status_is_no_result() {
    let server = MockServer::start().await;
    mount(&server, ResponseTemplate::new(503)).await;

    let result = source_for(&server).schedule(&nummer()).await.unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn object_response_is_no_result() {
    let server = MockServer::start().await;
    mount(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"data": []})),
    )
    .await;

    let result = source_for(&server).schedule(&nummer()).await.unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn partial_records_are_still_counted() {
    let server = MockServer::start().await;
    mount(
        &server,
        ResponseTemplate::new(200).set_body_json(json!([{}, {"standplads": {"nummer": "1"}}])),
    )
    .await;

    let schedules = source_for(&server)
        .schedule(&nummer())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(schedules.len(), 2);
    assert!(schedules.iter().all(|schedule| schedule.collections.is_empty()));
}

#[tokio::test]
async fn blank_identifier_is_rejected_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let result = source_for(&server)
        .schedule(&CollectionPointId("  ".to_owned()))
        .await;

    assert!(matches!(result, Err(PortError::InvalidCollectionPoint)));
}
