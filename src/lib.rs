pub mod api;
pub mod config;
pub mod data_collector;
pub mod database;
pub mod errors;
pub mod models;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::YahooClient;
use crate::data_collector::DataCollector;
use crate::database::PriceStore;
use crate::models::{Config, RunSummary};

/// Load the work list, ingest every item and close the store.
///
/// Fails only when the work list is invalid or the store cannot be opened;
/// per-item failures are reported in the returned summary.
pub async fn run_ingest(config: &Config) -> Result<RunSummary> {
    let items = config::load_work_items(&config.work_list_path).with_context(|| {
        format!(
            "failed to load work list from {}",
            config.work_list_path.display()
        )
    })?;
    info!(
        "📋 Loaded {} work items from {}",
        items.len(),
        config.work_list_path.display()
    );
    if items.is_empty() {
        warn!("Work list is empty, nothing to ingest");
    }

    let client = YahooClient::new(&config.api_base_url, config.http_timeout)
        .context("failed to build market-data client")?;

    let store = PriceStore::open(&config.database_path)
        .await
        .with_context(|| {
            format!(
                "failed to open database {}",
                config.database_path.display()
            )
        })?;

    let collector = DataCollector::new(
        client,
        store.clone(),
        config.retry_policy,
        config.default_start_date,
    );
    let summary = collector.run(&items).await;

    store.close().await;
    Ok(summary)
}
