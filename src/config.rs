//! Work-list loading.
//!
//! Two JSON layouts are understood:
//!
//! ```json
//! {"AAPL": ["daily"], "MSFT": ["weekly", "monthly"]}
//! ```
//!
//! ```json
//! [{"stocks": ["AAPL", "MSFT"], "intervals": ["1d", "1wk"]}]
//! ```
//!
//! Both expand to an ordered list of [`WorkItem`]s.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::ConfigError;
use crate::models::{Interval, WorkItem};

/// A ticker's interval list; a bare string counts as a single interval.
#[derive(Deserialize)]
#[serde(untagged)]
enum IntervalSpec {
    One(String),
    Many(Vec<String>),
}

impl IntervalSpec {
    fn into_vec(self) -> Vec<String> {
        match self {
            IntervalSpec::One(value) => vec![value],
            IntervalSpec::Many(values) => values,
        }
    }
}

#[derive(Deserialize)]
struct StockGroup {
    #[serde(default)]
    stocks: Vec<String>,
    #[serde(default)]
    intervals: Vec<String>,
}

/// Read and expand the work list at `path`.
pub fn load_work_items(path: impl AsRef<Path>) -> Result<Vec<WorkItem>, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let items = parse_work_items(&content)?;
    debug!("Loaded {} work items from {}", items.len(), path.display());
    Ok(items)
}

/// Expand an in-memory work-list document.
pub fn parse_work_items(content: &str) -> Result<Vec<WorkItem>, ConfigError> {
    let document: Value =
        serde_json::from_str(content).map_err(|e| ConfigError::Malformed(e.to_string()))?;

    let mut items = Vec::new();
    match document {
        Value::Object(map) => {
            for (ticker, intervals) in map {
                let intervals: IntervalSpec = serde_json::from_value(intervals).map_err(|_| {
                    ConfigError::Malformed(format!(
                        "intervals for {ticker} must be a string or a list of strings"
                    ))
                })?;
                for interval in intervals.into_vec() {
                    items.push(work_item(&ticker, &interval)?);
                }
            }
        }
        Value::Array(groups) => {
            for (index, group) in groups.into_iter().enumerate() {
                let group: StockGroup = serde_json::from_value(group).map_err(|e| {
                    ConfigError::Malformed(format!("entry {index}: {e}"))
                })?;
                for stock in &group.stocks {
                    for interval in &group.intervals {
                        items.push(work_item(stock, interval)?);
                    }
                }
            }
        }
        _ => {
            return Err(ConfigError::Malformed(
                "expected a JSON object or array at the top level".to_string(),
            ))
        }
    }

    Ok(items)
}

fn work_item(ticker: &str, interval: &str) -> Result<WorkItem, ConfigError> {
    let ticker = ticker.trim().to_ascii_uppercase();
    if ticker.is_empty() {
        return Err(ConfigError::BlankTicker);
    }
    let interval = Interval::parse(interval).ok_or_else(|| ConfigError::UnsupportedInterval {
        ticker: ticker.clone(),
        interval: interval.to_string(),
    })?;
    Ok(WorkItem::new(ticker, interval))
}
