// src/core/protocol/command.rs

//! Parses framed lines into `Command`s and renders `Reply`s.

use crate::core::LobbyError;
use std::fmt;

/// A request sent by a client. Matching is by prefix of the framed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `login <name>`
    Login(String),
    /// `ping`
    Ping,
    /// `ask_clients`
    AskClients,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login(_) => "login",
            Command::Ping => "ping",
            Command::AskClients => "ask_clients",
        }
    }
}

impl TryFrom<&str> for Command {
    type Error = LobbyError;

    fn try_from(line: &str) -> Result<Self, Self::Error> {
        if line.starts_with("login ") {
            // The second whitespace-delimited token is the username.
            let name = line
                .split_whitespace()
                .nth(1)
                .ok_or(LobbyError::MissingUsername)?;
            Ok(Command::Login(name.to_string()))
        } else if line.starts_with("ping") {
            Ok(Command::Ping)
        } else if line.starts_with("ask_clients") {
            Ok(Command::AskClients)
        } else {
            Err(LobbyError::InvalidCommand(line.to_string()))
        }
    }
}

/// A response sent back to the client. Each reply is one line on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    LoginOk,
    PingOk,
    PingClientListChanged,
    Clients(Vec<String>),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::LoginOk => f.write_str("login ok"),
            Reply::PingOk => f.write_str("ping ok"),
            Reply::PingClientListChanged => f.write_str("ping client_list_changed"),
            Reply::Clients(names) => write!(f, "clients {}", names.join(" ")),
        }
    }
}
