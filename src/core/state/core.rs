// src/core/state/core.rs

//! Defines the central `ServerState` struct, holding all shared server-wide state.

use crate::config::Config;
use crate::core::registry::SessionRegistry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// The central struct holding all shared, server-wide state.
/// It is wrapped in an `Arc` and handed to every connection handler and
/// liveness timer.
#[derive(Debug)]
pub struct ServerState {
    pub config: Config,
    /// Every session between `start()` and `stop()`.
    pub registry: SessionRegistry,
    /// Source of session ids, incremented once per accepted connection.
    session_id_counter: AtomicU64,
}

impl ServerState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: SessionRegistry::new(),
            session_id_counter: AtomicU64::new(0),
        }
    }

    /// Allocates the id for a newly accepted connection.
    pub fn next_session_id(&self) -> u64 {
        self.session_id_counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.config.liveness_timeout_ms)
    }
}
