// src/server/connection_loop.rs

//! Contains the acceptor loop and graceful shutdown handling.

use super::context::ServerContext;
use crate::connection::{ConnectionHandler, Session};
use crate::core::metrics;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// How long shutdown waits for client handlers before aborting them.
const CLIENT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Accepts connections until `shutdown` resolves or a background task fails.
///
/// Every accepted socket gets a fresh `Session` and its own handler task, and
/// the loop goes straight back to accepting.
pub async fn run(mut ctx: ServerContext, shutdown: impl Future<Output = ()>) {
    let mut client_tasks = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("Shutdown requested, initiating graceful shutdown.");
                break;
            }

            Some(res) = ctx.background_tasks.join_next() => {
                match res {
                    Ok(Ok(())) => warn!("A background task finished unexpectedly without an error."),
                    Ok(Err(e)) => { error!("CRITICAL: Background task failed: {}. Shutting down.", e); break; }
                    Err(e) => { error!("CRITICAL: Background task panicked: {e:?}. Shutting down."); break; }
                }
            },

            res = ctx.listener.accept() => {
                match res {
                    Ok((socket, addr)) => {
                        info!("Accepted new connection from: {}", addr);
                        metrics::CONNECTIONS_RECEIVED_TOTAL.inc();

                        let session = Session::new(ctx.state.next_session_id(), addr);
                        let state_clone = ctx.state.clone();
                        let global_shutdown_rx = ctx.shutdown_tx.subscribe();

                        client_tasks.spawn(async move {
                            let mut handler = ConnectionHandler::new(socket, session, state_clone, global_shutdown_rx);
                            if let Err(e) = handler.run().await {
                                warn!("Connection from {} terminated unexpectedly: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => error!("Failed to accept connection: {}", e),
                }
            },

            Some(res) = client_tasks.join_next() => {
                if let Err(e) = res
                    && e.is_panic()
                {
                    error!("A client handler panicked: {e:?}");
                }
            },
        }
    }

    info!("Shutting down. Sending signal to all tasks.");
    if ctx.shutdown_tx.send(()).is_err() {
        info!("No tasks were listening for the shutdown signal.");
    }

    // Handlers stop their sessions as soon as they see the signal.
    if tokio::time::timeout(CLIENT_DRAIN_TIMEOUT, async {
        while client_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!(
            "{} client handler(s) ignored the shutdown signal; aborting them.",
            client_tasks.len()
        );
        // Dropping an aborted handler drops its guard, which stops the session.
        client_tasks.abort_all();
        while client_tasks.join_next().await.is_some() {}
    }
    info!(
        "All client connections closed. {} sessions remain registered.",
        ctx.state.registry.len()
    );

    info!("Waiting for background tasks to finish...");
    if tokio::time::timeout(Duration::from_secs(10), async {
        while ctx.background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for background tasks to finish cleanly.");
    };
    info!("Server shutdown complete.");
}
