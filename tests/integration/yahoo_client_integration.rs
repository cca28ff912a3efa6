//! YahooClient against a wiremock chart endpoint

use assert_matches::assert_matches;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stock_ingest::api::{PriceProvider, YahooClient};
use stock_ingest::errors::FetchError;
use stock_ingest::models::Interval;

use crate::common::test_data;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn client_for(server: &MockServer) -> YahooClient {
    YahooClient::new(&server.uri(), Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn test_fetch_normalizes_chart_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/AAPL"))
        .and(query_param("interval", "1d"))
        .and(query_param("period1", "1704067200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data::chart_body(&[185.5, 184.25])))
        .expect(1)
        .mount(&server)
        .await;

    let item = test_data::item("AAPL", Interval::Daily);
    let records = client_for(&server)
        .fetch_history(&item, start())
        .await
        .expect("fetch succeeds");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].timestamp, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    assert_eq!(records[1].timestamp, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    assert_eq!(records[0].close, 185.5);
    assert_eq!(records[0].adjusted_close, 185.0);
    assert_eq!(records[1].volume, 1_000);
    assert!(records.iter().all(|r| r.ticker == "AAPL" && r.interval == Interval::Daily));
}

#[tokio::test]
async fn test_rate_limit_and_server_errors_are_transient() {
    for status in [429u16, 500, 503] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status).set_body_string("Too Many Requests"))
            .mount(&server)
            .await;

        let item = test_data::item("AAPL", Interval::Daily);
        let err = client_for(&server).fetch_history(&item, start()).await.unwrap_err();
        assert!(err.is_transient(), "status {status} should be transient, got {err}");
    }
}

#[tokio::test]
async fn test_unknown_symbol_is_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/NOPE"))
        .respond_with(ResponseTemplate::new(404).set_body_json(test_data::not_found_body()))
        .mount(&server)
        .await;

    let item = test_data::item("NOPE", Interval::Daily);
    let err = client_for(&server).fetch_history(&item, start()).await.unwrap_err();
    assert_matches!(err, FetchError::Permanent(ref msg) if msg.contains("symbol may be delisted"));
}

#[tokio::test]
async fn test_html_body_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Will be right back</html>"))
        .mount(&server)
        .await;

    let item = test_data::item("AAPL", Interval::Daily);
    let err = client_for(&server).fetch_history(&item, start()).await.unwrap_err();
    assert_matches!(err, FetchError::Transient(_));
}

#[tokio::test]
async fn test_timeout_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(test_data::chart_body(&[1.0]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = YahooClient::new(&server.uri(), Duration::from_millis(200)).expect("client");
    let item = test_data::item("AAPL", Interval::Daily);
    let err = client.fetch_history(&item, start()).await.unwrap_err();
    assert!(err.is_transient(), "timeout should be transient, got {err}");
}

#[test]
fn test_invalid_base_url_rejected() {
    assert!(YahooClient::new("not a url", Duration::from_secs(1)).is_err());
    assert!(YahooClient::new("mailto:someone@example.com", Duration::from_secs(1)).is_err());
}

#[tokio::test]
async fn test_weekly_bars_collapse_to_one_per_week() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("interval", "1wk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data::chart_body(&[185.5, 184.25, 186.0])))
        .mount(&server)
        .await;

    let item = test_data::item("AAPL", Interval::Weekly);
    let records = client_for(&server).fetch_history(&item, start()).await.expect("fetch succeeds");

    // Tue..Thu of ISO week 1 fold into the first bar's date
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].timestamp, test_data::first_session_date());
    assert_eq!(records[0].close, 186.0);
}
