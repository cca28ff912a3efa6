//! mockall doubles for the provider and sink seams

use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::mock;

use stock_ingest::api::PriceProvider;
use stock_ingest::database::PriceSink;
use stock_ingest::errors::{FetchError, StoreError};
use stock_ingest::models::{PriceRecord, WorkItem};

mock! {
    pub Provider {}

    #[async_trait]
    impl PriceProvider for Provider {
        async fn fetch_history(
            &self,
            item: &WorkItem,
            start: NaiveDate,
        ) -> Result<Vec<PriceRecord>, FetchError>;
    }
}

mock! {
    pub Sink {}

    #[async_trait]
    impl PriceSink for Sink {
        async fn write_records(
            &self,
            item: &WorkItem,
            records: &[PriceRecord],
        ) -> Result<usize, StoreError>;

        async fn latest_timestamp(&self, item: &WorkItem) -> Result<Option<NaiveDate>, StoreError>;
    }
}

/// A sink with nothing stored that accepts every write
pub fn empty_sink() -> MockSink {
    let mut sink = MockSink::new();
    sink.expect_latest_timestamp().returning(|_| Ok(None));
    sink.expect_write_records()
        .returning(|_, records| Ok(records.len()));
    sink
}
