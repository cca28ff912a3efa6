use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row, SqlitePool,
};
use std::path::Path;
use tracing::{debug, info};

use crate::errors::StoreError;
use crate::models::{Interval, PriceRecord, SeriesStats, WorkItem};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Destination for normalized price bars.
#[async_trait]
pub trait PriceSink: Send + Sync {
    /// Upsert `records` for `item`, returning how many rows were written.
    async fn write_records(
        &self,
        item: &WorkItem,
        records: &[PriceRecord],
    ) -> Result<usize, StoreError>;

    /// Most recent stored bar date for `item`, if any.
    async fn latest_timestamp(&self, item: &WorkItem) -> Result<Option<NaiveDate>, StoreError>;
}

/// SQLite-backed price store
#[derive(Clone)]
pub struct PriceStore {
    pool: SqlitePool,
}

impl PriceStore {
    /// Open (creating if missing) the database file and ensure the schema exists.
    pub async fn open(database_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let database_path = database_path.as_ref();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(database_path)
                    .create_if_missing(true),
            )
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        info!("💾 Database ready at {}", database_path.display());
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS price_history (
                ticker TEXT NOT NULL,
                interval TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                adjusted_close REAL NOT NULL,
                volume INTEGER NOT NULL,
                PRIMARY KEY (ticker, interval, timestamp)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// All stored bars of one series, oldest first
    pub async fn load_records(
        &self,
        ticker: &str,
        interval: Interval,
    ) -> Result<Vec<PriceRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT timestamp, open, high, low, close, adjusted_close, volume
            FROM price_history
            WHERE ticker = ? AND interval = ?
            ORDER BY timestamp
            "#,
        )
        .bind(ticker)
        .bind(interval.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| -> Result<PriceRecord, StoreError> {
                Ok(PriceRecord {
                    ticker: ticker.to_string(),
                    interval,
                    timestamp: parse_date(&r.try_get::<String, _>("timestamp")?)?,
                    open: r.try_get("open")?,
                    high: r.try_get("high")?,
                    low: r.try_get("low")?,
                    close: r.try_get("close")?,
                    adjusted_close: r.try_get("adjusted_close")?,
                    volume: r.try_get("volume")?,
                })
            })
            .collect()
    }

    /// Total number of stored bars
    pub async fn count_rows(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM price_history")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Row count and date range of every stored series
    pub async fn series_stats(&self) -> Result<Vec<SeriesStats>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT ticker, interval, COUNT(*) AS row_count,
                   MIN(timestamp) AS first_ts, MAX(timestamp) AS last_ts
            FROM price_history
            GROUP BY ticker, interval
            ORDER BY ticker, interval
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| -> Result<SeriesStats, StoreError> {
                Ok(SeriesStats {
                    ticker: r.try_get("ticker")?,
                    interval: r.try_get("interval")?,
                    row_count: r.try_get("row_count")?,
                    first_timestamp: parse_optional_date(r.try_get("first_ts")?)?,
                    last_timestamp: parse_optional_date(r.try_get("last_ts")?)?,
                })
            })
            .collect()
    }

    /// Release every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl PriceSink for PriceStore {
    async fn write_records(
        &self,
        item: &WorkItem,
        records: &[PriceRecord],
    ) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO price_history (
                    ticker, interval, timestamp, open, high, low, close, adjusted_close, volume
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(ticker, interval, timestamp) DO UPDATE SET
                    open = excluded.open,
                    high = excluded.high,
                    low = excluded.low,
                    close = excluded.close,
                    adjusted_close = excluded.adjusted_close,
                    volume = excluded.volume
                "#,
            )
            .bind(&item.ticker)
            .bind(item.interval.as_str())
            .bind(record.timestamp.format(DATE_FORMAT).to_string())
            .bind(record.open)
            .bind(record.high)
            .bind(record.low)
            .bind(record.close)
            .bind(record.adjusted_close)
            .bind(record.volume)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!("Upserted {} rows for {}", records.len(), item);
        Ok(records.len())
    }

    async fn latest_timestamp(&self, item: &WorkItem) -> Result<Option<NaiveDate>, StoreError> {
        let latest: Option<String> = sqlx::query_scalar(
            "SELECT MAX(timestamp) FROM price_history WHERE ticker = ? AND interval = ?",
        )
        .bind(&item.ticker)
        .bind(item.interval.as_str())
        .fetch_one(&self.pool)
        .await?;

        parse_optional_date(latest)
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| StoreError::InvalidValue {
        column: "timestamp",
        value: value.to_string(),
    })
}

fn parse_optional_date(value: Option<String>) -> Result<Option<NaiveDate>, StoreError> {
    value.as_deref().map(parse_date).transpose()
}
