// src/server/mod.rs

use crate::config::Config;
use anyhow::Result;
use std::future::Future;
use tokio::net::TcpListener;
use tracing::error;

mod connection_loop;
mod context;
pub mod dispatcher;
mod initialization;
mod metrics_server;
mod spawner;

/// The main server startup function, orchestrating all setup phases.
/// Runs until SIGINT or SIGTERM.
pub async fn run(config: Config) -> Result<()> {
    // 1. Initialize server state and bind the listener.
    let mut server_context = initialization::setup(config).await?;

    // 2. Spawn all background tasks.
    spawner::spawn_all(&mut server_context)?;

    // 3. Start the main connection acceptance loop. This runs until shutdown.
    connection_loop::run(server_context, shutdown_signal()).await;

    Ok(())
}

/// Runs the server on an already bound listener until `shutdown` resolves.
pub async fn run_with_listener(
    config: Config,
    listener: TcpListener,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let mut server_context = initialization::setup_with_listener(config, listener)?;
    spawner::spawn_all(&mut server_context)?;
    connection_loop::run(server_context, shutdown).await;
    Ok(())
}

/// Resolves when the process receives SIGINT or SIGTERM.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigint, mut sigterm) = match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to register signal handlers: {}. Falling back to Ctrl-C.", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            return;
        }
    };

    tokio::select! {
        _ = sigint.recv() => tracing::info!("SIGINT received."),
        _ = sigterm.recv() => tracing::info!("SIGTERM received."),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
