use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use policy_front::api::routes::{create_router, AppState};
use policy_front::config::Config;
use policy_front::engine::DecisionClient;
use policy_front::observability::{init_tracing, MetricsRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration
    let config = Config::parse();

    // Initialize tracing
    init_tracing(&config.log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting policy front door"
    );

    config.validate()?;

    // Open the engine session; nothing is served without one
    let raw_config = config.engine_config_bytes()?;
    if config.write_engine_config(&raw_config)? {
        info!(
            path = ?config.engine_config_out,
            "Wrote policy engine configuration"
        );
    }

    let client = match DecisionClient::open(
        &raw_config,
        &config.decision_url,
        config.decision_timeout(),
    ) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!(error = %e, "Failed to open policy engine session");
            return Err(e.into());
        }
    };

    if config.enforce {
        info!("Decision enforcement enabled");
    }

    // Create application state
    let state = Arc::new(AppState {
        client: client.clone(),
        metrics: Arc::new(MetricsRegistry::new()),
        policy_path: config.policy_path.clone(),
        enforce: config.enforce,
        start_time: Instant::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        latency_budget_ms: config.latency_budget_ms,
    });

    // Create router
    let app = create_router(state);

    let addr = config.socket_addr()?;

    info!(addr = %addr, policy_path = %config.policy_path, "Starting HTTP server");

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server with graceful shutdown
    if config.graceful_shutdown {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    } else {
        axum::serve(listener, app).await?;
    }

    // Cleanup
    info!("Shutting down...");
    match tokio::time::timeout(config.shutdown_timeout(), client.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Failed to close policy engine session"),
        Err(_) => warn!("Timed out closing policy engine session"),
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
