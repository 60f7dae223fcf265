// src/core/metrics.rs

//! Defines and registers Prometheus metrics for server monitoring.
//!
//! This module uses `lazy_static` so the metrics are registered exactly once
//! for the lifetime of the process.

use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, TextEncoder, register_counter, register_gauge};

lazy_static! {
    /// The number of sessions currently between start and stop.
    pub static ref CONNECTED_SESSIONS: Gauge =
        register_gauge!("lobbyd_connected_sessions", "Number of currently active sessions.").unwrap();

    /// The total number of connections accepted since startup.
    pub static ref CONNECTIONS_RECEIVED_TOTAL: Counter =
        register_counter!("lobbyd_connections_received_total", "Total number of connections received.").unwrap();
    /// The total number of well-formed commands processed since startup.
    pub static ref COMMANDS_PROCESSED_TOTAL: Counter =
        register_counter!("lobbyd_commands_processed_total", "Total number of commands processed.").unwrap();
    /// The total number of messages that did not parse as a command.
    pub static ref INVALID_MESSAGES_TOTAL: Counter =
        register_counter!("lobbyd_invalid_messages_total", "Total number of ignored invalid messages.").unwrap();
    /// The total number of sessions stopped by the liveness timer.
    pub static ref LIVENESS_TIMEOUTS_TOTAL: Counter =
        register_counter!("lobbyd_liveness_timeouts_total", "Total number of sessions stopped for missing pings.").unwrap();
    /// The total number of client-list change broadcasts.
    pub static ref MEMBERSHIP_BROADCASTS_TOTAL: Counter =
        register_counter!("lobbyd_membership_broadcasts_total", "Total number of membership change broadcasts.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|e| format!("# failed to encode metrics: {e}\n"))
}
