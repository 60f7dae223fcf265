// src/connection/guard.rs

//! Defines `ConnectionGuard`, an RAII guard that stops a session however its
//! handler exits.

use super::session::{Session, StopReason};
use crate::core::state::ServerState;
use std::sync::Arc;
use tracing::debug;

/// Stops the guarded session when dropped, unless it is already stopped.
pub struct ConnectionGuard {
    pub(crate) state: Arc<ServerState>,
    pub(crate) session: Arc<Session>,
    /// The reason reported if the drop performs the stop.
    pub(crate) reason: StopReason,
}

impl ConnectionGuard {
    pub(crate) fn new(state: Arc<ServerState>, session: Arc<Session>) -> Self {
        Self {
            state,
            session,
            reason: StopReason::PeerClosed,
        }
    }

    /// Records why the handler is about to exit.
    pub(crate) fn set_reason(&mut self, reason: StopReason) {
        self.reason = reason;
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if !self.session.stop(&self.state.registry, self.reason) {
            debug!(
                "ConnectionGuard for session {} dropping, session was already stopped.",
                self.session.id()
            );
        }
    }
}
