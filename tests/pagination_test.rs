use brewery_bronze::{ApiClient, BronzeError};
use httpmock::prelude::*;
use serde_json::{json, Value};
use std::time::Duration;

fn breweries(ids: std::ops::RangeInclusive<u32>) -> Value {
    Value::Array(
        ids.map(|id| json!({"id": id, "name": format!("Test Brew {}", id), "state": "CA"}))
            .collect(),
    )
}

#[tokio::test]
async fn test_fetch_success_and_pagination() {
    let server = MockServer::start();

    let page_1 = server.mock(|when, then| {
        when.method(GET)
            .path("/breweries")
            .query_param("per_page", "50")
            .query_param("page", "1");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(breweries(1..=50));
    });
    let page_2 = server.mock(|when, then| {
        when.method(GET)
            .path("/breweries")
            .query_param("per_page", "50")
            .query_param("page", "2");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(breweries(51..=70));
    });
    // 空頁代表結束
    let page_3 = server.mock(|when, then| {
        when.method(GET)
            .path("/breweries")
            .query_param("per_page", "50")
            .query_param("page", "3");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!([]));
    });
    let page_4 = server.mock(|when, then| {
        when.method(GET).path("/breweries").query_param("page", "4");
        then.status(200).json_body(breweries(71..=71));
    });

    let records = ApiClient::new()
        .fetch_data(&server.url("/breweries"), 50)
        .await
        .unwrap();

    // n = 2 非空頁 → 3 次請求
    page_1.assert_hits(1);
    page_2.assert_hits(1);
    page_3.assert_hits(1);
    page_4.assert_hits(0);

    assert_eq!(records.len(), 70);
    assert_eq!(records[0].get("id"), Some(&json!(1)));
    assert_eq!(records[69].get("id"), Some(&json!(70)));

    let ids: Vec<u64> = records
        .iter()
        .map(|r| r.get("id").and_then(Value::as_u64).unwrap())
        .collect();
    assert_eq!(ids, (1..=70).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_http_error_handling() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/breweries")
            .query_param("per_page", "50")
            .query_param("page", "1");
        then.status(500);
    });

    let err = ApiClient::new()
        .fetch_data(&server.url("/breweries"), 50)
        .await
        .unwrap_err();

    match &err {
        BronzeError::RequestFailure { endpoint, page, .. } => {
            assert_eq!(endpoint, &server.url("/breweries"));
            assert_eq!(*page, Some(1));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.to_string().contains("page '1'"));
}

#[tokio::test]
async fn test_failure_on_later_page_discards_earlier_pages() {
    let server = MockServer::start();
    let page_1 = server.mock(|when, then| {
        when.method(GET).path("/breweries").query_param("page", "1");
        then.status(200).json_body(breweries(1..=10));
    });
    let page_2 = server.mock(|when, then| {
        when.method(GET).path("/breweries").query_param("page", "2");
        then.status(200).json_body(breweries(11..=20));
    });
    let page_3 = server.mock(|when, then| {
        when.method(GET).path("/breweries").query_param("page", "3");
        then.status(500);
    });
    let page_4 = server.mock(|when, then| {
        when.method(GET).path("/breweries").query_param("page", "4");
        then.status(200).json_body(json!([]));
    });

    let result = ApiClient::new()
        .fetch_data(&server.url("/breweries"), 10)
        .await;

    page_1.assert();
    page_2.assert();
    page_3.assert();
    page_4.assert_hits(0);
    assert!(matches!(
        result,
        Err(BronzeError::RequestFailure { page: Some(3), .. })
    ));
}

#[tokio::test]
async fn test_timeout_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/breweries").query_param("page", "1");
        then.status(200)
            .delay(Duration::from_millis(800))
            .json_body(breweries(1..=5));
    });
    let page_2 = server.mock(|when, then| {
        when.method(GET).path("/breweries").query_param("page", "2");
        then.status(200).json_body(json!([]));
    });

    let client = ApiClient::with_timeout(Duration::from_millis(100));
    let err = client
        .fetch_data(&server.url("/breweries"), 50)
        .await
        .unwrap_err();

    page_2.assert_hits(0);
    match err {
        BronzeError::Timeout { endpoint } => assert_eq!(endpoint, server.url("/breweries")),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[test]
fn test_default_timeout_is_fifteen_seconds() {
    assert_eq!(ApiClient::new().timeout(), Duration::from_secs(15));
}
