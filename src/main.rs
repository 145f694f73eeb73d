use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tenant_config_api::app::{app, AppState};
use tenant_config_api::cli::Cli;
use tenant_config_api::config::AppConfig;
use tenant_config_api::metrics::Metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so local runs pick up HASURA_GRAPHQL_ADMIN_SECRET etc.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) => EnvFilter::try_new(directives),
        Err(_) => EnvFilter::try_new(&cli.loglevel),
    }
    .with_context(|| format!("invalid log filter '{}'", cli.loglevel))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        "Starting tenant-config-api in {:?} mode with {:?} store",
        config.environment,
        config.store.backend
    );

    let state = AppState::from_config(&config).await?;
    let metrics = Metrics::install().context("failed to install metrics recorder")?;
    let app = app(state, metrics, &config);

    let listener = tokio::net::TcpListener::bind(&cli.listen)
        .await
        .with_context(|| format!("failed to bind {}", cli.listen))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
