// src/core/registry.rs

//! The registry of live sessions and the membership-change broadcast.
//!
//! All mutation happens under one lock. Readers never iterate the live
//! collection: they copy it under the lock, release the lock, and then work
//! on the copy. Because the copy holds `Arc`s, a session that stops while a
//! snapshot is being walked stays valid until the walk is done.

use crate::connection::Session;
use crate::core::metrics;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<Vec<Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a session. A session that is already present is not added twice.
    pub fn add(&self, session: Arc<Session>) {
        let mut sessions = self.sessions.lock();
        if sessions.iter().any(|s| Arc::ptr_eq(s, &session)) {
            warn!("Session {} is already registered.", session.id());
            return;
        }
        sessions.push(session);
    }

    /// Removes a session by identity. Returns false if it was not registered.
    pub fn remove(&self, session: &Arc<Session>) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.iter().position(|s| Arc::ptr_eq(s, session)) {
            Some(index) => {
                sessions.remove(index);
                true
            }
            None => {
                debug!("Session {} was not in the registry upon removal.", session.id());
                false
            }
        }
    }

    /// Returns a copy of the current membership.
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    pub fn contains(&self, session: &Arc<Session>) -> bool {
        self.sessions.lock().iter().any(|s| Arc::ptr_eq(s, session))
    }

    /// Marks every registered session as having a changed client list.
    pub fn broadcast_changed(&self) {
        let snapshot = self.snapshot();
        for session in &snapshot {
            session.set_clients_changed();
        }
        metrics::MEMBERSHIP_BROADCASTS_TOTAL.inc();
        debug!("Client list change broadcast to {} sessions.", snapshot.len());
    }

    /// The usernames of every registered session that has logged in, in
    /// snapshot order.
    pub fn usernames(&self) -> Vec<String> {
        self.snapshot()
            .iter()
            .map(|s| s.username())
            .filter(|name| !name.is_empty())
            .collect()
    }
}

// Sessions take their own lock while registering, so formatting must not
// reach into them while the registry lock is held.
impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("len", &self.len())
            .finish()
    }
}
