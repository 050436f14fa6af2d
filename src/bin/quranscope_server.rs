//! quranscope-server: HTTP front end for the explanation service.
//!
//! Reads `.env`, layers configuration (see `quranscope::config`), starts the
//! cache sweeper and serves until Ctrl-C.
//!
//! ENVIRONMENT:
//!     OPENAI_API_KEY      Provider API key (required)
//!     QURANSCOPE_CONFIG   Optional YAML config file
//!     RUST_LOG            Log filter (default: info)

use anyhow::Context;
use quranscope::cache::CacheSweeper;
use quranscope::{server, ExplainService, ServiceConfig};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine; the environment may already be populated.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServiceConfig::load().context("failed to load configuration")?;
    let service = Arc::new(
        ExplainService::from_config(&config).context("failed to initialise explanation service")?,
    );
    info!(
        model = %config.model,
        ttl_secs = config.cache_ttl_secs,
        sweep_secs = config.sweep_interval_secs,
        "starting quranscope"
    );

    let sweeper = CacheSweeper::spawn(Arc::clone(service.cache()), config.sweep_interval());

    let result = server::start_server(
        &config.bind,
        service,
        config.frontend_url.as_deref(),
        shutdown_signal(),
    )
    .await;

    sweeper.shutdown().await;
    result.context("server error")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
