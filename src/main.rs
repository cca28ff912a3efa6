use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use stock_ingest::database::PriceStore;
use stock_ingest::models::{Config, RetryPolicy};

/// Fetch historical prices for configured tickers into SQLite
#[derive(Parser)]
#[command(name = "stock-ingest", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every configured ticker/interval and upsert it (default)
    Ingest(IngestArgs),
    /// Show stored row counts and date ranges per series
    Status(StatusArgs),
}

#[derive(Args, Default)]
struct IngestArgs {
    /// JSON work list mapping tickers to intervals
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,

    /// Attempts per ticker/interval before giving up
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Fixed delay between attempts, in seconds
    #[arg(long)]
    retry_delay_secs: Option<u64>,

    /// First date requested for series with no stored rows (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Market-data API base URL
    #[arg(long)]
    api_base_url: Option<String>,
}

impl IngestArgs {
    fn apply(self, config: &mut Config) {
        if let Some(path) = self.config {
            config.work_list_path = path;
        }
        if let Some(path) = self.database {
            config.database_path = path;
        }
        let max_attempts = self.max_attempts.unwrap_or(config.retry_policy.max_attempts);
        let retry_delay = self
            .retry_delay_secs
            .map(Duration::from_secs)
            .unwrap_or(config.retry_policy.retry_delay);
        config.retry_policy = RetryPolicy::new(max_attempts, retry_delay);
        if let Some(date) = self.start_date {
            config.default_start_date = date;
        }
        if let Some(url) = self.api_base_url {
            config.api_base_url = url;
        }
    }
}

#[derive(Args)]
struct StatusArgs {
    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stock_ingest=info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {}", e);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    let mut config = Config::from_env();

    let result = match cli.command.unwrap_or(Command::Ingest(IngestArgs::default())) {
        Command::Ingest(args) => {
            args.apply(&mut config);
            stock_ingest::run_ingest(&config)
                .await
                .map(|summary| summary.exit_status())
        }
        Command::Status(args) => {
            if let Some(path) = args.database {
                config.database_path = path;
            }
            print_status(&config).await.map(|_| 0)
        }
    };

    match result {
        Ok(status) => ExitCode::from(status),
        Err(e) => {
            error!("Fatal: {:#}", e);
            eprintln!("❌ {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn print_status(config: &Config) -> Result<()> {
    let store = PriceStore::open(&config.database_path)
        .await
        .with_context(|| format!("failed to open database {}", config.database_path.display()))?;
    let stats = store.series_stats().await;
    store.close().await;
    let stats = stats?;

    println!();
    println!("📊 {}", config.database_path.display());
    println!("{:<10} {:<8} {:>8}  {:<10}  {:<10}", "TICKER", "INTERVAL", "ROWS", "FIRST", "LAST");
    for s in &stats {
        println!(
            "{:<10} {:<8} {:>8}  {:<10}  {:<10}",
            s.ticker,
            s.interval,
            s.row_count,
            s.first_timestamp.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
            s.last_timestamp.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
        );
    }
    if stats.is_empty() {
        println!("(no rows stored)");
    }
    Ok(())
}
