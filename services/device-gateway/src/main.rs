// Device Registry Gateway - HTTP entry point
// Opens the ledger once, serves device requests, shuts the ledger down on exit

use device_gateway::{config::GatewayConfig, router, AppState};
use device_ledger::Ledger;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .with_line_number(true)
        .init();

    info!("Starting device registry gateway");

    let config = GatewayConfig::load()?;

    info!(backend = ?config.ledger.backend, data_dir = ?config.ledger.data_dir, "Opening ledger");
    let ledger = Arc::new(Ledger::open(config.ledger.clone()).await?);

    if config.init_ledger_on_start {
        info!("--> Submit Transaction: InitLedger, writes the initial placeholder device");
        ledger.init_ledger().await?;
        info!("*** Result: Committed InitLedger");
    }

    let app = router(AppState::new(ledger.clone(), config.legacy_error_status));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Gateway listening on: {}", config.bind_addr);
    info!("   POST /register - Register a device");
    info!("   POST /update   - Update device status");
    info!("   POST /auth     - Authenticate a device");
    info!("   GET  /getall   - List all devices");
    info!("   POST /delete   - Delete a device");
    info!("   GET  /health   - Health check");
    info!("   GET  /metrics  - Prometheus metrics");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down ledger");
    ledger.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
