use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use pricewatch::config::AppConfig;
use pricewatch::engine::TrackerEngine;
use pricewatch::extract::PriceExtractor;
use pricewatch::notify::TelegramNotifier;
use pricewatch::scheduler::PollScheduler;
use pricewatch::store::SqliteStore;

#[derive(Parser, Debug)]
#[command(name = "pricewatch", about = "Price tracking engine with Telegram alerts")]
struct Cli {
    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pricewatch=debug".parse()?),
        )
        .init();

    let config = AppConfig::from_env()?;
    info!("Starting pricewatch...");

    if config.metrics.enabled {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], config.metrics.port))
            .install()?;
        info!(
            port = config.metrics.port,
            endpoint = %config.metrics.endpoint,
            "metrics exporter started"
        );
    }

    let store = Arc::new(SqliteStore::connect(&config.database).await?);
    let extractor = Arc::new(PriceExtractor::new(config.fetcher.clone())?);
    let notifier = Arc::new(TelegramNotifier::new(config.telegram.clone()));
    let engine = Arc::new(TrackerEngine::new(
        store,
        extractor,
        notifier,
        config.monitor.clone(),
        config.fetcher.max_concurrent_checks,
    ));

    if cli.once {
        let summary = engine.run_cycle_once().await?;
        info!(
            checked = summary.checked,
            alerts = summary.alerts,
            "single poll cycle finished"
        );
        return Ok(());
    }

    let mut scheduler = PollScheduler::new(Arc::clone(&engine), config.scheduler.clone()).await?;
    scheduler.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    scheduler.shutdown().await?;

    Ok(())
}
