// src/server/dispatcher.rs

//! Builds the event dispatcher: a fixed pool of worker threads sharing one
//! queue of ready I/O completions and timers. Any worker may poll any
//! session's task, and a single session may move between workers over its
//! lifetime.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::runtime::{Builder, Runtime};
use tracing::info;

/// Creates the multi-threaded runtime that every connection runs on.
pub fn build(worker_threads: usize) -> Result<Runtime> {
    let runtime = Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .thread_name_fn(|| {
            static WORKER_ID: AtomicUsize = AtomicUsize::new(0);
            let id = WORKER_ID.fetch_add(1, Ordering::Relaxed);
            format!("lobbyd-worker-{id}")
        })
        .enable_all()
        .build()
        .with_context(|| format!("Failed to start dispatcher with {worker_threads} workers"))?;
    info!("Dispatcher started with {} worker threads.", worker_threads);
    Ok(runtime)
}
