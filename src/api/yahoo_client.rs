use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::PriceProvider;
use crate::errors::{classify_status, FetchError};
use crate::models::{PriceRecord, WorkItem};

/// Chart endpoint envelope
#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
    #[serde(default)]
    adjclose: Vec<AdjCloseColumn>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct AdjCloseColumn {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Yahoo Finance chart API client
pub struct YahooClient {
    client: Client,
    base_url: Url,
}

impl YahooClient {
    /// Create a new client against `base_url` (normally
    /// `https://query1.finance.yahoo.com`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("API base URL cannot carry a path: {}", base_url));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (compatible; stock-ingest/0.1)")
            .build()?;

        Ok(Self { client, base_url })
    }

    fn chart_url(&self, item: &WorkItem, start: NaiveDate) -> Url {
        let period1 = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        let period2 = Utc::now().timestamp();

        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v8", "finance", "chart", item.ticker.as_str()]);
        }
        url.query_pairs_mut()
            .append_pair("interval", item.interval.yahoo_code())
            .append_pair("period1", &period1.to_string())
            .append_pair("period2", &period2.to_string())
            .append_pair("events", "div|split")
            .append_pair("includeAdjustedClose", "true");
        url
    }
}

#[async_trait]
impl PriceProvider for YahooClient {
    async fn fetch_history(
        &self,
        item: &WorkItem,
        start: NaiveDate,
    ) -> Result<Vec<PriceRecord>, FetchError> {
        let url = self.chart_url(item, start);
        debug!("Making request to: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &error_detail(&body)));
        }

        let body = response.text().await?;
        let envelope: ChartEnvelope = serde_json::from_str(&body)
            .map_err(|e| FetchError::Transient(format!("undecodable chart response: {e}")))?;

        let records = normalize(item, envelope)?;
        debug!("Retrieved {} bars for {} since {}", records.len(), item, start);
        Ok(records)
    }
}

/// Prefer the API's own error description over the raw body.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ChartEnvelope>(body) {
        Ok(ChartEnvelope {
            chart: ChartBody { error: Some(err), .. },
        }) => err.description,
        _ => body.trim().chars().take(200).collect(),
    }
}

fn normalize(item: &WorkItem, envelope: ChartEnvelope) -> Result<Vec<PriceRecord>, FetchError> {
    if let Some(err) = envelope.chart.error {
        return Err(FetchError::Permanent(format!(
            "{}: {}",
            err.code, err.description
        )));
    }

    let result = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| FetchError::Permanent(format!("no chart result for {}", item)))?;

    let Some(timestamps) = result.timestamp else {
        return Ok(Vec::new());
    };

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|column| column.adjclose)
        .unwrap_or_default();
    let offset = result.meta.gmtoffset;

    let mut records: Vec<PriceRecord> = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        // Null rows mark sessions without trades
        let (Some(open), Some(high), Some(low), Some(close)) = (
            value_at(&quote.open, i),
            value_at(&quote.high, i),
            value_at(&quote.low, i),
            value_at(&quote.close, i),
        ) else {
            continue;
        };
        let Some(timestamp) = ts
            .checked_add(offset)
            .and_then(|local| DateTime::from_timestamp(local, 0))
            .map(|dt| dt.date_naive())
        else {
            continue;
        };

        let record = PriceRecord {
            ticker: item.ticker.clone(),
            interval: item.interval,
            timestamp,
            open,
            high,
            low,
            close,
            adjusted_close: value_at(&adjclose, i).unwrap_or(close),
            volume: value_at(&quote.volume, i).map(|v| v as i64).unwrap_or(0),
        };

        // The live bar can land in the same period as the last settled one.
        // It keeps the settled bar's date and takes the newer values.
        match records.last_mut() {
            Some(last) if item.interval.same_period(last.timestamp, record.timestamp) => {
                *last = PriceRecord {
                    timestamp: last.timestamp,
                    ..record
                };
            }
            _ => records.push(record),
        }
    }

    Ok(records)
}

fn value_at(values: &[Option<f64>], index: usize) -> Option<f64> {
    values.get(index).copied().flatten()
}
