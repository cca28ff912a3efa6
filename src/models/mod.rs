use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Sampling period of a price series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    pub const ALL: [Interval; 3] = [Interval::Daily, Interval::Weekly, Interval::Monthly];

    /// Parse a config spelling. Accepts the canonical names and the
    /// upstream codes (`1d`, `1wk`, `1mo`), case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" | "1d" => Some(Interval::Daily),
            "weekly" | "1wk" => Some(Interval::Weekly),
            "monthly" | "1mo" => Some(Interval::Monthly),
            _ => None,
        }
    }

    /// Name stored in the `interval` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Daily => "daily",
            Interval::Weekly => "weekly",
            Interval::Monthly => "monthly",
        }
    }

    /// Interval code understood by the Yahoo chart API
    pub fn yahoo_code(&self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::Weekly => "1wk",
            Interval::Monthly => "1mo",
        }
    }

    /// Whether two bar dates belong to the same sampling period
    /// (ISO week for weekly, calendar month for monthly).
    pub fn same_period(&self, a: NaiveDate, b: NaiveDate) -> bool {
        match self {
            Interval::Daily => a == b,
            Interval::Weekly => a.iso_week() == b.iso_week(),
            Interval::Monthly => a.year() == b.year() && a.month() == b.month(),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (ticker, interval) pair to ingest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub ticker: String,
    pub interval: Interval,
}

impl WorkItem {
    pub fn new(ticker: impl Into<String>, interval: Interval) -> Self {
        Self {
            ticker: ticker.into(),
            interval,
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ticker, self.interval)
    }
}

/// Normalized price bar for one WorkItem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub ticker: String,
    pub interval: Interval,
    pub timestamp: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adjusted_close: f64,
    pub volume: i64,
}

/// Lifecycle of a WorkItem inside the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Attempting,
    Succeeded,
    Exhausted,
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemState::Pending => "pending",
            ItemState::Attempting => "attempting",
            ItemState::Succeeded => "succeeded",
            ItemState::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

/// Terminal result for one WorkItem
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptOutcome {
    pub item: WorkItem,
    pub succeeded: bool,
    pub attempts_used: u32,
    pub last_error: Option<String>,
    pub rows_written: usize,
}

impl AttemptOutcome {
    pub fn state(&self) -> ItemState {
        if self.succeeded {
            ItemState::Succeeded
        } else {
            ItemState::Exhausted
        }
    }
}

/// Outcomes of one run, in work-list order
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<AttemptOutcome>,
}

impl RunSummary {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.succeeded)
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    pub fn exhausted_count(&self) -> usize {
        self.outcomes.len() - self.succeeded_count()
    }

    pub fn rows_written(&self) -> usize {
        self.outcomes.iter().map(|o| o.rows_written).sum()
    }

    /// Process exit status: 0 when every item succeeded, 1 otherwise
    pub fn exit_status(&self) -> u8 {
        if self.all_succeeded() {
            0
        } else {
            1
        }
    }
}

/// Bounded, fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 15;
    pub const DEFAULT_RETRY_DELAY_SECS: u64 = 15;

    /// `max_attempts` is clamped to at least one attempt.
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_MAX_ATTEMPTS,
            Duration::from_secs(Self::DEFAULT_RETRY_DELAY_SECS),
        )
    }
}

/// Per-series statistics reported by `status`
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStats {
    pub ticker: String,
    pub interval: String,
    pub row_count: i64,
    pub first_timestamp: Option<NaiveDate>,
    pub last_timestamp: Option<NaiveDate>,
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub work_list_path: PathBuf,
    pub database_path: PathBuf,
    pub api_base_url: String,
    pub http_timeout: Duration,
    pub retry_policy: RetryPolicy,
    pub default_start_date: NaiveDate,
}

impl Config {
    pub const DEFAULT_API_BASE_URL: &'static str = "https://query1.finance.yahoo.com";

    /// First date requested for a series with nothing stored yet
    pub fn fallback_start_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let max_attempts = std::env::var("MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(RetryPolicy::DEFAULT_MAX_ATTEMPTS);
        let retry_delay_secs = std::env::var("RETRY_DELAY_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(RetryPolicy::DEFAULT_RETRY_DELAY_SECS);

        Config {
            work_list_path: std::env::var("STOCKS_CONFIG_PATH")
                .unwrap_or_else(|_| "stocks_intervals.json".to_string())
                .into(),
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "yahoo_finance_stocks.db".to_string())
                .into(),
            api_base_url: std::env::var("YAHOO_API_BASE_URL")
                .unwrap_or_else(|_| Self::DEFAULT_API_BASE_URL.to_string()),
            http_timeout: Duration::from_secs(
                std::env::var("HTTP_TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
            retry_policy: RetryPolicy::new(max_attempts, Duration::from_secs(retry_delay_secs)),
            default_start_date: std::env::var("DEFAULT_START_DATE")
                .ok()
                .and_then(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d").ok())
                .unwrap_or_else(Self::fallback_start_date),
        }
    }
}
