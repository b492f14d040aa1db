//! Dusty Vaults aggregator binary.

use dusty_aggregator::{create_router, Aggregator, AppState, Config};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Dusty Vaults aggregator");

    let config: Config = config::Config::builder()
        .add_source(config::File::with_name("aggregator").required(false))
        .add_source(config::Environment::with_prefix("AGGREGATOR"))
        .build()
        .and_then(|c| c.try_deserialize())
        .unwrap_or_else(|e| {
            // Fall back only when no config exists; parsing errors fail hard.
            let err_str = format!("{e}");
            if err_str.contains("not found") || err_str.contains("missing field") {
                warn!(error = %e, "No config file found, using defaults");
                Config::default()
            } else {
                error!(error = %e, "FATAL: Config error, fix env vars or aggregator.toml");
                std::process::exit(1);
            }
        });

    if std::env::var("AGGREGATOR_API_KEY")
        .map(|k| !k.is_empty())
        .unwrap_or(false)
    {
        info!("API key auth enabled");
    } else {
        warn!("AGGREGATOR_API_KEY not set, control endpoints are unprotected (dev mode)");
    }

    info!(
        chain = %config.chain_id,
        rpc = %config.rpc_url,
        vault = %config.vault_contract_id,
        token = %config.token_contract_id,
        "Configuration loaded"
    );

    let bind_address = config.bind_address.clone();
    let (events_tx, events_rx) = mpsc::channel(32);
    let state = Arc::new(AppState::new(config, events_tx)?);

    let cancel = CancellationToken::new();
    let aggregator = Aggregator::new(Arc::clone(&state));
    let cancel_bg = cancel.clone();
    tokio::spawn(async move {
        // Mount-time sequence: silent network guard, auto-connect, fetch.
        if aggregator.connect_and_refresh(true).await.is_err() {
            warn!("Startup auto-connect failed; waiting for user-initiated connect");
        }
        aggregator.run_event_loop(events_rx, cancel_bg).await;
    });

    let app = create_router(state.clone());

    info!(address = %bind_address, "Listening");

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    info!("Aggregator shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
