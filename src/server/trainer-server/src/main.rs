//! Trainer Server - Main entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trainer_server::{app, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::parse();

    tracing::info!("Starting trainer gate...");
    tracing::info!("Bind address: {}", config.bind);
    tracing::info!("API: {}", config.api_url);

    if config.insecure_cookies {
        tracing::warn!("Issuing cookies without Secure - DO NOT USE IN PRODUCTION");
    }
    if config.upstream_url.is_none() {
        tracing::warn!("No page renderer configured, allowed pages will answer 404");
    }

    let state = AppState::from_config(&config)?;
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;

    tracing::info!("Trainer gate listening on {}", listener.local_addr()?);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {e}");
            }
            tracing::info!("Shutting down...");
        })
        .await?;

    Ok(())
}
