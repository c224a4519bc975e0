//! pathz-relay server entry point.
//!
//! Starts the Axum HTTP server with the push-channel endpoint and, when a
//! node provider key is configured, the upstream event watcher.

use tracing_subscriber::EnvFilter;

use pathz_relay::api;
use pathz_relay::app_state::AppState;
use pathz_relay::config::RelayConfig;
use pathz_relay::watcher::{EventWatcher, RpcClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = RelayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        addr = %config.listen_addr,
        contract = %config.contract_address,
        allowed_origins = ?config.allowed_origins.hosts(),
        "starting pathz-relay"
    );

    // Build application state
    let app_state = AppState::new(config.clone());

    // Start the upstream watcher
    match (&config.api_key, config.watcher_enabled) {
        (_, false) => tracing::info!("event watcher disabled"),
        (None, true) => tracing::error!("ALCHEMY_API_KEY missing, event watcher not started"),
        (Some(api_key), true) => {
            let client = RpcClient::new(config.network, api_key, config.contract_address.clone())?;
            tracing::info!(network = %client.network(), "event watcher started");
            let watcher = EventWatcher::new(
                client,
                app_state.broadcaster.clone(),
                config.poll_interval,
                config.max_block_range,
            );
            tokio::spawn(watcher.run());
        }
    }

    // Build router
    let app = api::build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
