//! Error types for the ingestion pipeline.
//!
//! Each stage has its own error enum so the collector can decide, by type,
//! whether an attempt is worth repeating:
//! - [`ConfigError`]: the work list could not be built. Fatal for the run.
//! - [`FetchError`]: the market-data call failed, either transiently or permanently.
//! - [`StoreError`]: the SQLite store rejected a read or write. Never retried.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading the work list.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Malformed(String),

    #[error("unsupported interval '{interval}' for {ticker} (expected daily, weekly or monthly)")]
    UnsupportedInterval { ticker: String, interval: String },

    #[error("blank ticker symbol in config")]
    BlankTicker,
}

/// Errors raised by a [`PriceProvider`](crate::api::PriceProvider).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Timeouts, rate limiting, upstream 5xx. Another attempt may succeed.
    #[error("transient fetch error: {0}")]
    Transient(String),

    /// Unknown ticker, unsupported interval, rejected request.
    #[error("permanent fetch error: {0}")]
    Permanent(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            return Self::Transient(err.to_string());
        }
        if let Some(status) = err.status() {
            return classify_status(status, &err.to_string());
        }
        if err.is_decode() {
            return Self::Transient(format!("undecodable response: {err}"));
        }
        Self::Permanent(err.to_string())
    }
}

/// Maps a non-success HTTP status onto the retry taxonomy.
pub fn classify_status(status: reqwest::StatusCode, detail: &str) -> FetchError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        FetchError::Transient(format!("HTTP {status}: {detail}"))
    } else {
        FetchError::Permanent(format!("HTTP {status}: {detail}"))
    }
}

/// Errors raised by a [`PriceSink`](crate::database::PriceSink).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid stored value in {column}: {value}")]
    InvalidValue { column: &'static str, value: String },
}
