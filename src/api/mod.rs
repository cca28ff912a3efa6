use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::FetchError;
use crate::models::{PriceRecord, WorkItem};

pub mod yahoo_client;
pub use yahoo_client::YahooClient;

/// Source of historical price bars.
///
/// One call makes at most one upstream request; retrying is the caller's job.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Fetch every bar of `item` from `start` (inclusive) up to now.
    ///
    /// An empty vector means the ticker exists but has no bars in range.
    async fn fetch_history(
        &self,
        item: &WorkItem,
        start: NaiveDate,
    ) -> Result<Vec<PriceRecord>, FetchError>;
}
