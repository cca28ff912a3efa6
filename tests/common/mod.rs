//! Common test utilities and helpers

#![allow(dead_code)]

pub mod mocks;

pub use database::{init_fresh_test_database, TestDatabase};

/// Test data utilities
pub mod test_data {
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use stock_ingest::models::{Interval, PriceRecord, WorkItem};

    /// 2024-01-02 14:30:00 UTC, a US market open
    pub const FIRST_SESSION: i64 = 1_704_205_800;

    pub fn first_session_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    pub fn item(ticker: &str, interval: Interval) -> WorkItem {
        WorkItem::new(ticker, interval)
    }

    /// Create a test price bar
    pub fn create_test_record(
        ticker: &str,
        interval: Interval,
        date: NaiveDate,
        close: f64,
    ) -> PriceRecord {
        PriceRecord {
            ticker: ticker.to_string(),
            interval,
            timestamp: date,
            open: 100.0,
            high: 105.0,
            low: 95.0,
            close,
            adjusted_close: close - 1.0,
            volume: 1_000_000,
        }
    }

    /// Create `days` consecutive daily bars starting at `start`
    pub fn create_test_records(
        ticker: &str,
        interval: Interval,
        start: NaiveDate,
        days: i64,
    ) -> Vec<PriceRecord> {
        (0..days)
            .map(|i| {
                create_test_record(
                    ticker,
                    interval,
                    start + chrono::Duration::days(i),
                    100.0 + i as f64,
                )
            })
            .collect()
    }

    /// Chart API body with one bar per close, one day apart from FIRST_SESSION
    pub fn chart_body(closes: &[f64]) -> Value {
        let timestamps: Vec<i64> = (0..closes.len() as i64)
            .map(|i| FIRST_SESSION + i * 86_400)
            .collect();
        let volumes: Vec<i64> = vec![1_000; closes.len()];
        let adjusted: Vec<f64> = closes.iter().map(|c| c - 0.5).collect();
        json!({
            "chart": {
                "result": [{
                    "meta": {"gmtoffset": -18000},
                    "timestamp": timestamps,
                    "indicators": {
                        "quote": [{
                            "open": closes,
                            "high": closes,
                            "low": closes,
                            "close": closes,
                            "volume": volumes
                        }],
                        "adjclose": [{"adjclose": adjusted}]
                    }
                }],
                "error": null
            }
        })
    }

    /// Chart API body for an unknown symbol
    pub fn not_found_body() -> Value {
        json!({
            "chart": {
                "result": null,
                "error": {
                    "code": "Not Found",
                    "description": "No data found, symbol may be delisted"
                }
            }
        })
    }
}

/// Logging utilities for tests
pub mod logging {
    use std::sync::Once;
    use tracing::{debug, info};

    static INIT: Once = Once::new();

    /// Route stock_ingest logs to the test writer, once per test binary
    pub fn init_test_logging() {
        INIT.call_once(|| {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter("stock_ingest=debug")
                .with_test_writer()
                .finish();
            // test-log may already have installed one
            let _ = tracing::subscriber::set_global_default(subscriber);
        });
    }

    /// Log test step
    pub fn log_test_step(step: &str) {
        info!("🧪 Test Step: {}", step);
    }

    /// Log test data
    pub fn log_test_data<T: std::fmt::Debug>(label: &str, data: &T) {
        debug!("📊 {}: {:?}", label, data);
    }
}
