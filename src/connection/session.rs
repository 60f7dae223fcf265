// src/connection/session.rs

//! Defines the state shared by everything that acts on one client connection:
//! the connection handler, the liveness timer task and registry snapshots.

use crate::core::metrics;
use crate::core::protocol::Reply;
use crate::core::registry::SessionRegistry;
use parking_lot::Mutex;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// The lifecycle phase of a session. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Active,
    Stopped,
}

/// Why a session was stopped. Used for logging and metrics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    PeerClosed,
    TransportError,
    LivenessTimeout,
    Shutdown,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::PeerClosed => "closed by peer",
            StopReason::TransportError => "transport error",
            StopReason::LivenessTimeout => "no ping in time",
            StopReason::Shutdown => "server shutdown",
        };
        f.write_str(s)
    }
}

/// Outcome of a liveness deadline firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessVerdict {
    /// The timeout was exceeded and the session has been stopped.
    Expired,
    /// The timeout was not reached; `last_ping` was refreshed.
    Refreshed,
    /// The session was already stopped. Nothing was done.
    AlreadyStopped,
}

/// Mutable fields of a session. Always accessed through `Session::inner`.
#[derive(Debug)]
struct SessionInner {
    phase: SessionPhase,
    username: String,
    last_ping: Instant,
    clients_changed: bool,
}

/// Server-side state for one client connection.
///
/// Sessions are handed around as `Arc<Session>`: the registry holds one
/// reference and every in-flight task (handler, liveness timer, snapshot
/// iteration) holds its own, so a session outlives whichever of them ends
/// last. Every public method takes the inner lock exactly once.
pub struct Session {
    id: u64,
    addr: SocketAddr,
    inner: Mutex<SessionInner>,
    /// Cancelled on stop. The handler drops the socket when it observes this.
    stopped: CancellationToken,
}

impl Session {
    pub fn new(id: u64, addr: SocketAddr) -> Arc<Self> {
        Arc::new(Self {
            id,
            addr,
            inner: Mutex::new(SessionInner {
                phase: SessionPhase::Connecting,
                username: String::new(),
                last_ping: Instant::now(),
                clients_changed: false,
            }),
            stopped: CancellationToken::new(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.lock().phase
    }

    pub fn is_active(&self) -> bool {
        self.phase() == SessionPhase::Active
    }

    /// The username, empty until a successful login.
    pub fn username(&self) -> String {
        self.inner.lock().username.clone()
    }

    pub fn last_ping(&self) -> Instant {
        self.inner.lock().last_ping
    }

    pub fn clients_changed(&self) -> bool {
        self.inner.lock().clients_changed
    }

    pub fn set_clients_changed(&self) {
        self.inner.lock().clients_changed = true;
    }

    /// Transitions Connecting -> Active: registers the session and stamps
    /// the initial liveness timestamp. Returns false if the session was not
    /// in the Connecting phase.
    pub fn start(self: &Arc<Self>, registry: &SessionRegistry) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.phase != SessionPhase::Connecting {
                return false;
            }
            inner.phase = SessionPhase::Active;
            inner.last_ping = Instant::now();
            // Registered under the session lock so a stop cannot slip in
            // between the phase change and the registration.
            registry.add(Arc::clone(self));
        }
        metrics::CONNECTED_SESSIONS.inc();
        debug!("Session {} ({}) started.", self.id, self.addr);
        true
    }

    /// Transitions Active -> Stopped.
    ///
    /// Only the first caller performs the teardown: it signals the handler to
    /// close the socket, removes the session from the registry and broadcasts
    /// the membership change. Every later or concurrent caller returns false.
    pub fn stop(self: &Arc<Self>, registry: &SessionRegistry, reason: StopReason) -> bool {
        let username = {
            let mut inner = self.inner.lock();
            if inner.phase != SessionPhase::Active {
                // A session that never started has nothing to tear down, but
                // it must not start later either.
                if inner.phase == SessionPhase::Connecting {
                    inner.phase = SessionPhase::Stopped;
                    self.stopped.cancel();
                }
                return false;
            }
            inner.phase = SessionPhase::Stopped;
            inner.username.clone()
        };
        self.stopped.cancel();

        if reason == StopReason::LivenessTimeout {
            info!("stopping {} - no ping in time", display_name(&username, self.addr));
            metrics::LIVENESS_TIMEOUTS_TOTAL.inc();
        } else {
            info!(
                "Session {} ({}) stopped: {}.",
                self.id,
                display_name(&username, self.addr),
                reason
            );
        }

        registry.remove(self);
        metrics::CONNECTED_SESSIONS.dec();
        registry.broadcast_changed();
        true
    }

    /// Resolves once the session has been stopped.
    pub async fn stopped(&self) {
        self.stopped.cancelled().await
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }

    /// Records the username from a `login` command. The caller is
    /// responsible for broadcasting the change.
    ///
    /// Returns `None` without touching the username once the session is no
    /// longer Active.
    pub fn login(&self, username: &str) -> Option<Reply> {
        {
            let mut inner = self.inner.lock();
            if inner.phase != SessionPhase::Active {
                return None;
            }
            inner.username = username.to_string();
        }
        info!("{} logged in", username);
        Some(Reply::LoginOk)
    }

    /// Answers a `ping`: reports and clears the changed flag, and refreshes
    /// the liveness timestamp.
    pub fn ping(&self) -> Reply {
        let mut inner = self.inner.lock();
        inner.last_ping = Instant::now();
        if std::mem::take(&mut inner.clients_changed) {
            Reply::PingClientListChanged
        } else {
            Reply::PingOk
        }
    }

    /// Evaluates a liveness deadline that has just fired.
    ///
    /// If `timeout` has elapsed since the last ping the session is stopped;
    /// otherwise the timestamp is refreshed. A deadline never fires early, so
    /// reaching the timeout exactly counts as exceeding it.
    pub fn check_liveness(
        self: &Arc<Self>,
        registry: &SessionRegistry,
        timeout: Duration,
    ) -> LivenessVerdict {
        let expired = {
            let mut inner = self.inner.lock();
            if inner.phase != SessionPhase::Active {
                return LivenessVerdict::AlreadyStopped;
            }
            let now = Instant::now();
            if now.duration_since(inner.last_ping) >= timeout {
                true
            } else {
                inner.last_ping = now;
                false
            }
        };

        if !expired {
            return LivenessVerdict::Refreshed;
        }
        if self.stop(registry, StopReason::LivenessTimeout) {
            LivenessVerdict::Expired
        } else {
            LivenessVerdict::AlreadyStopped
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .field("phase", &inner.phase)
            .field("username", &inner.username)
            .field("clients_changed", &inner.clients_changed)
            .finish()
    }
}

fn display_name(username: &str, addr: SocketAddr) -> String {
    if username.is_empty() {
        addr.to_string()
    } else {
        username.to_string()
    }
}
