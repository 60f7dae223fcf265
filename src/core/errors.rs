// src/core/errors.rs

//! Defines the primary error type for the session engine.

use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing every failure a session can run into.
/// None of these cross the connection boundary: each one ends up either
/// ignored (protocol errors) or as a session stop (transport errors).
#[derive(Error, Debug)]
pub enum LobbyError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Invalid message '{0}'")]
    InvalidCommand(String),

    #[error("Login requires a username")]
    MissingUsername,
}

impl LobbyError {
    /// True for errors that only concern a single malformed message. The
    /// connection stays open after these.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            LobbyError::InvalidCommand(_) | LobbyError::MissingUsername
        )
    }
}

// `std::io::Error` is not cloneable, so it is shared behind an Arc.
impl Clone for LobbyError {
    fn clone(&self) -> Self {
        match self {
            LobbyError::Io(e) => LobbyError::Io(Arc::clone(e)),
            LobbyError::InvalidCommand(s) => LobbyError::InvalidCommand(s.clone()),
            LobbyError::MissingUsername => LobbyError::MissingUsername,
        }
    }
}

impl PartialEq for LobbyError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LobbyError::Io(e1), LobbyError::Io(e2)) => e1.kind() == e2.kind(),
            (LobbyError::InvalidCommand(s1), LobbyError::InvalidCommand(s2)) => s1 == s2,
            (LobbyError::MissingUsername, LobbyError::MissingUsername) => true,
            _ => false,
        }
    }
}

impl From<std::io::Error> for LobbyError {
    fn from(e: std::io::Error) -> Self {
        LobbyError::Io(Arc::new(e))
    }
}
