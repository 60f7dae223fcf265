// src/core/mod.rs

//! The central module containing the protocol, shared state and session
//! bookkeeping of lobbyd.

pub mod errors;
pub mod liveness;
pub mod metrics;
pub mod protocol;
pub mod registry;
pub mod state;

pub use errors::LobbyError;
pub use protocol::{Command, Reply};
