// src/server/initialization.rs

//! Handles server initialization: shared state setup and binding the
//! listening endpoint.

use super::context::ServerContext;
use crate::config::Config;
use crate::core::state::ServerState;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::info;

/// Binds the configured address and initializes all server components.
pub async fn setup(config: Config) -> Result<ServerContext> {
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind listener on {addr}"))?;
    setup_with_listener(config, listener)
}

/// Initializes all server components around an already bound listener.
pub fn setup_with_listener(config: Config, listener: TcpListener) -> Result<ServerContext> {
    log_startup_info(&config);
    let (shutdown_tx, _) = broadcast::channel(1);

    let state = Arc::new(ServerState::new(config));
    info!("Server state initialized.");

    let local_addr = listener.local_addr()?;
    info!("lobbyd listening on {}", local_addr);

    Ok(ServerContext {
        state,
        listener,
        shutdown_tx,
        background_tasks: JoinSet::new(),
    })
}

/// Logs key configuration parameters at startup.
fn log_startup_info(config: &Config) {
    info!(
        "Sessions silent on ping for more than {} ms will be disconnected.",
        config.liveness_timeout_ms
    );
    info!(
        "Messages are limited to {} bytes including the newline.",
        config.max_message_size
    );
}
