use anyhow::Result;
use tokio::signal;

mod api;
mod client;
mod config;
mod extract;
mod models;
mod validate;

use api::AppState;
use client::TikTokioClient;
use config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    let client = TikTokioClient::new(config.scraper.clone())?;
    tracing::info!(
        endpoint = %client.config().endpoint,
        timeout_ms = client.config().timeout.as_millis() as u64,
        "upstream configured"
    );

    let app = api::router(AppState::new(client, config.environment.clone()));

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!(
        "listening on {} ({})",
        listener.local_addr()?,
        config.environment
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutting down");
}
