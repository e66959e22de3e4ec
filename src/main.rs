use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use publications::api::{self, AppState, ResponseCache};
use publications::config::Config;
use publications::feeds::RssFeedsClient;
use publications::metrics::Metrics;
use publications::server::{shutdown_signal, Server};
use publications::service::PublicationService;
use publications::storage::Database;

#[derive(Parser, Debug)]
#[command(
    name = "publications-api",
    version,
    about = "Publishers and publications API with RSS feed registration"
)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    config.apply_env();
    publications::logging::init(&config.logging);
    tracing::debug!(config = ?config, "Configuration");

    let db = Database::connect(&config.database)
        .await
        .context("Failed to open database")?;

    let registrar = RssFeedsClient::new(&config.feeds_api.url, config.registrar_timeout())
        .context("Invalid feeds_api.url")?;

    let metrics = Arc::new(Metrics::new().context("Failed to register metrics")?);
    let service = PublicationService::new(Arc::new(db.clone()), Arc::new(registrar))
        .with_compensation_grace(Duration::from_secs(config.feeds_api.compensation_grace_secs))
        .with_metrics(Arc::clone(&metrics));
    let cache = ResponseCache::new(
        config.server.list_cache_capacity,
        Duration::from_millis(config.server.list_cache_ttl_ms),
    );
    let router = api::router(AppState::new(service, cache, metrics), &config.server);

    let (server, handle) = Server::bind(
        &config.server.address,
        router,
        Duration::from_secs(config.server.shutdown_grace_secs),
    )
    .await
    .with_context(|| format!("Failed to bind {}", config.server.address))?;

    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => tracing::warn!("Interrupted by system or user, shutting down"),
            Err(e) => tracing::error!(error = %e, "Signal handler failed, shutting down"),
        }
        handle.shutdown();
    });

    server.run().await.context("HTTP server failed")?;
    db.close().await;
    tracing::info!("Gracefully stopped");
    Ok(())
}
