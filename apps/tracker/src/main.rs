mod cli;
mod config;
mod db;
mod errors;
mod models;
mod report;
mod scrape;
mod store;

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use sqlx::PgPool;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Cli;
use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::report::refresh_reports;
use crate::scrape::{
    HttpPageFetcher, MalPeopleParser, PageCollector, PaginationDriver, PaginationSettings,
};
use crate::store::PgSnapshotStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.validate().map_err(anyhow::Error::msg)?;

    let config = Config::from_env()?;

    // Logs go to stderr; stdout carries the JSON run summaries
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting tracker v{}", env!("CARGO_PKG_VERSION"));

    // One date for the whole run, even if it crosses midnight
    let today = Local::now().date_naive();

    let pool = create_pool(config.database.connect_options()?).await?;
    let outcome = run(&cli, &config, &pool, today).await;
    pool.close().await;

    if let Err(e) = &outcome {
        error!("Run failed: {e:#}");
    }
    outcome
}

async fn run(cli: &Cli, config: &Config, pool: &PgPool, today: NaiveDate) -> Result<()> {
    ensure_schema(pool).await?;
    let store = PgSnapshotStore::new(pool.clone());

    if cli.reports_only {
        info!("Skipping the listing walk, rebuilding reports only");
    } else {
        let fetcher = HttpPageFetcher::new(&config.listing_url, config.fetch_timeout)?;
        let collector = PageCollector::new(Arc::new(fetcher), Arc::new(MalPeopleParser::new()));
        let settings = PaginationSettings {
            stride: cli.stride,
            max_offset: cli.max_offset,
            pace: config.request_delay,
        };

        info!(
            %today,
            stride = settings.stride,
            max_offset = settings.max_offset,
            "Walking listing at {}",
            config.listing_url
        );
        let summary = PaginationDriver::new(&collector, &store, settings)
            .run(today)
            .await?;

        info!(
            pages = summary.pages_fetched,
            inserted = summary.records_inserted,
            "Listing walk finished: {:?}",
            summary.stop
        );
        println!("{}", serde_json::to_string(&summary)?);
    }

    let (reports, failed) = refresh_reports(&store, &cli.windows, today).await;
    for report in &reports {
        println!("{}", serde_json::to_string(report)?);
    }
    if failed > 0 {
        bail!("{failed} of {} reports failed", cli.windows.len());
    }

    Ok(())
}
