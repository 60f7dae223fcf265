// src/connection/mod.rs

//! Manages the lifecycle of a single client TCP connection: the shared
//! session state machine, the read/dispatch/write loop that drives it, and
//! the guard that guarantees it is stopped exactly once.

mod guard;
mod handler;
mod session;

pub use guard::ConnectionGuard;
pub use handler::ConnectionHandler;
pub use session::{LivenessVerdict, Session, SessionPhase, StopReason};
