// src/core/liveness.rs

//! The per-session liveness timer.
//!
//! Each session owns exactly one outstanding deadline, held by a small task
//! that runs alongside the connection handler. The handler rearms it after
//! every completed read; when it fires, the session either gets stopped or
//! has its ping timestamp refreshed. There is no explicit cancel: once the
//! session stops, the task observes it and exits, and a firing that races
//! with a stop is a no-op inside `Session::check_liveness`.

use crate::connection::{LivenessVerdict, Session};
use crate::core::state::ServerState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

/// The default liveness timeout.
pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_millis(5000);

/// The task side of a session's liveness deadline.
pub struct LivenessTimer {
    session: Arc<Session>,
    state: Arc<ServerState>,
    timeout: Duration,
    deadline_rx: watch::Receiver<Instant>,
}

/// The handler side of a session's liveness deadline.
#[derive(Debug)]
pub struct LivenessHandle {
    deadline_tx: watch::Sender<Instant>,
    timeout: Duration,
    task: JoinHandle<()>,
}

impl LivenessTimer {
    /// Arms the first deadline and spawns the timer task.
    pub fn spawn(session: Arc<Session>, state: Arc<ServerState>, timeout: Duration) -> LivenessHandle {
        let (deadline_tx, deadline_rx) = watch::channel(Instant::now() + timeout);
        let timer = LivenessTimer {
            session,
            state,
            timeout,
            deadline_rx,
        };
        let task = tokio::spawn(timer.run());
        LivenessHandle {
            deadline_tx,
            timeout,
            task,
        }
    }

    async fn run(mut self) {
        let mut deadline = *self.deadline_rx.borrow_and_update();
        loop {
            tokio::select! {
                _ = self.session.stopped() => break,
                changed = self.deadline_rx.changed() => {
                    if changed.is_err() {
                        // The handler is gone; its guard takes care of the stop.
                        break;
                    }
                    deadline = *self.deadline_rx.borrow_and_update();
                }
                _ = sleep_until(deadline) => {
                    match self.session.check_liveness(&self.state.registry, self.timeout) {
                        LivenessVerdict::Refreshed => {
                            debug!("Session {}: liveness refreshed.", self.session.id());
                            deadline = Instant::now() + self.timeout;
                        }
                        LivenessVerdict::Expired | LivenessVerdict::AlreadyStopped => break,
                    }
                }
            }
        }
    }
}

impl LivenessHandle {
    /// Replaces the outstanding deadline with one `timeout` from now.
    pub fn rearm(&self) {
        self.deadline_tx.send_replace(Instant::now() + self.timeout);
    }

    pub fn deadline(&self) -> Instant {
        *self.deadline_tx.borrow()
    }

    /// True once the timer task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
