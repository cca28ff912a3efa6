use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::api::PriceProvider;
use crate::database::PriceSink;
use crate::errors::{FetchError, StoreError};
use crate::models::{AttemptOutcome, ItemState, RetryPolicy, RunSummary, WorkItem};

/// Why a single attempt failed
#[derive(Error, Debug)]
enum AttemptError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AttemptError {
    fn is_retryable(&self) -> bool {
        matches!(self, AttemptError::Fetch(err) if err.is_transient())
    }
}

/// Drives fetch-then-write for every work item under a bounded retry policy
pub struct DataCollector<P, S> {
    provider: P,
    sink: S,
    policy: RetryPolicy,
    default_start: NaiveDate,
}

impl<P: PriceProvider, S: PriceSink> DataCollector<P, S> {
    /// `default_start` is requested for series with nothing stored yet.
    pub fn new(provider: P, sink: S, policy: RetryPolicy, default_start: NaiveDate) -> Self {
        Self {
            provider,
            sink,
            policy,
            default_start,
        }
    }

    /// Process `items` one at a time, in order. A failed item never stops the rest.
    pub async fn run(&self, items: &[WorkItem]) -> RunSummary {
        let total = items.len();
        info!(
            "🚀 Processing {} work items (max {} attempts, {}s between retries)",
            total,
            self.policy.max_attempts,
            self.policy.retry_delay.as_secs_f64()
        );

        let mut outcomes = Vec::with_capacity(total);
        for (index, item) in items.iter().enumerate() {
            info!("📈 {}/{}: {} {}", index + 1, total, item, ItemState::Pending);
            outcomes.push(self.process_item(item).await);
        }

        let summary = RunSummary { outcomes };
        info!(
            "🏁 Run complete: {} succeeded, {} exhausted, {} rows written",
            summary.succeeded_count(),
            summary.exhausted_count(),
            summary.rows_written()
        );
        summary
    }

    /// Run one item to a terminal state.
    pub async fn process_item(&self, item: &WorkItem) -> AttemptOutcome {
        let max_attempts = self.policy.max_attempts;
        let mut attempts_used = 0;

        loop {
            attempts_used += 1;
            info!(
                "🔄 {} {}: attempt {}/{}",
                item,
                ItemState::Attempting,
                attempts_used,
                max_attempts
            );

            match self.attempt(item).await {
                Ok(rows_written) => {
                    info!(
                        "✅ {} {} after {} attempt(s): {} rows written",
                        item,
                        ItemState::Succeeded,
                        attempts_used,
                        rows_written
                    );
                    return AttemptOutcome {
                        item: item.clone(),
                        succeeded: true,
                        attempts_used,
                        last_error: None,
                        rows_written,
                    };
                }
                Err(err) if err.is_retryable() && attempts_used < max_attempts => {
                    warn!(
                        "⚠️  {} attempt {}/{} failed: {}. Retrying in {}s...",
                        item,
                        attempts_used,
                        max_attempts,
                        err,
                        self.policy.retry_delay.as_secs_f64()
                    );
                    tokio::time::sleep(self.policy.retry_delay).await;
                }
                Err(err) => {
                    error!(
                        "❌ {} {} after {} attempt(s): {}",
                        item,
                        ItemState::Exhausted,
                        attempts_used,
                        err
                    );
                    return AttemptOutcome {
                        item: item.clone(),
                        succeeded: false,
                        attempts_used,
                        last_error: Some(err.to_string()),
                        rows_written: 0,
                    };
                }
            }
        }
    }

    async fn attempt(&self, item: &WorkItem) -> Result<usize, AttemptError> {
        // Resume from the newest stored bar; it is re-fetched and overwritten.
        let start = self
            .sink
            .latest_timestamp(item)
            .await?
            .unwrap_or(self.default_start);

        let records = self.provider.fetch_history(item, start).await?;
        debug!("Fetched {} bars for {} from {}", records.len(), item, start);

        Ok(self.sink.write_records(item, &records).await?)
    }
}
