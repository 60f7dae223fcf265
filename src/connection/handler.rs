// src/connection/handler.rs

//! Defines the `ConnectionHandler` which manages the full lifecycle of a client connection.

use super::guard::ConnectionGuard;
use super::session::{Session, StopReason};
use crate::core::liveness::LivenessTimer;
use crate::core::metrics;
use crate::core::protocol::{Command, LineCodec, Reply};
use crate::core::state::ServerState;
use crate::core::LobbyError;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// Drives one session: frames incoming lines, dispatches commands, writes
/// replies and keeps the liveness timer armed.
///
/// Replies are written one at a time and the next read is only polled once
/// the previous write has completed, so a session never has more than one
/// write outstanding.
pub struct ConnectionHandler<S> {
    framed: Framed<S, LineCodec>,
    state: Arc<ServerState>,
    session: Arc<Session>,
    global_shutdown_rx: broadcast::Receiver<()>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> ConnectionHandler<S> {
    pub fn new(
        socket: S,
        session: Arc<Session>,
        state: Arc<ServerState>,
        global_shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        let codec = LineCodec::new(state.config.max_message_size);
        Self {
            framed: Framed::new(socket, codec),
            state,
            session,
            global_shutdown_rx,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The main event loop for the connection. Returns once the session has
    /// stopped; the socket is closed when the handler is dropped.
    pub async fn run(&mut self) -> Result<(), LobbyError> {
        let mut guard = ConnectionGuard::new(self.state.clone(), self.session.clone());
        if !self.session.start(&self.state.registry) {
            debug!(
                "Session {} was stopped before it could start.",
                self.session.id()
            );
            return Ok(());
        }
        let liveness = LivenessTimer::spawn(
            self.session.clone(),
            self.state.clone(),
            self.state.liveness_timeout(),
        );

        let result = loop {
            tokio::select! {
                // Prioritize stop and shutdown signals over reads.
                biased;
                _ = self.global_shutdown_rx.recv() => {
                    info!("Session {} received shutdown signal.", self.session.id());
                    guard.set_reason(StopReason::Shutdown);
                    break Ok(());
                }
                _ = self.session.stopped() => {
                    debug!("Session {} stopped, closing its socket.", self.session.id());
                    break Ok(());
                }
                frame = self.framed.next() => {
                    match frame {
                        Some(Ok(line)) => {
                            if let Some(reply) = self.process_line(&line) {
                                debug!("Session {}: Sending reply: {}", self.session.id(), reply);
                                // A peer that stops reading must not keep a
                                // stopped session's socket open.
                                tokio::select! {
                                    biased;
                                    _ = self.global_shutdown_rx.recv() => {
                                        info!("Session {} received shutdown signal while writing.", self.session.id());
                                        guard.set_reason(StopReason::Shutdown);
                                        break Ok(());
                                    }
                                    _ = self.session.stopped() => {
                                        debug!("Session {} stopped while writing, closing its socket.", self.session.id());
                                        break Ok(());
                                    }
                                    sent = self.framed.send(reply) => {
                                        if let Err(e) = sent {
                                            guard.set_reason(StopReason::TransportError);
                                            break filter_disconnect(e, &self.session);
                                        }
                                    }
                                }
                            }
                            // Armed together with the next read.
                            liveness.rearm();
                        }
                        Some(Err(e)) => {
                            guard.set_reason(StopReason::TransportError);
                            break filter_disconnect(e, &self.session);
                        }
                        None => {
                            debug!("Connection from {} closed by peer.", self.session.addr());
                            guard.set_reason(StopReason::PeerClosed);
                            break Ok(());
                        }
                    }
                }
            }
        };

        drop(guard);
        result
    }

    /// Parses one framed line and runs the command, returning the reply to
    /// write. Unparseable input is logged and gets no reply.
    fn process_line(&self, line: &str) -> Option<Reply> {
        let command = match Command::try_from(line) {
            Ok(command) => command,
            Err(e) => {
                warn!("Session {}: invalid msg {:?}: {}", self.session.id(), line, e);
                metrics::INVALID_MESSAGES_TOTAL.inc();
                return None;
            }
        };
        metrics::COMMANDS_PROCESSED_TOTAL.inc();
        debug!(
            "Session {}: Received command: {}",
            self.session.id(),
            command.name()
        );

        let reply = match command {
            Command::Login(username) => {
                // Refused once the timer has stopped the session.
                let reply = self.session.login(&username)?;
                self.state.registry.broadcast_changed();
                reply
            }
            Command::Ping => self.session.ping(),
            Command::AskClients => Reply::Clients(self.state.registry.usernames()),
        };

        // A session stopped by its timer while this command ran gets no reply.
        self.session.is_active().then_some(reply)
    }
}

/// Logs a transport error and decides whether it is worth reporting upward.
fn filter_disconnect(e: LobbyError, session: &Session) -> Result<(), LobbyError> {
    if is_normal_disconnect(&e) {
        debug!("Connection from {} closed by peer: {}", session.addr(), e);
        Ok(())
    } else {
        Err(e)
    }
}

/// Helper function to check for non-critical disconnection errors.
fn is_normal_disconnect(e: &LobbyError) -> bool {
    matches!(e, LobbyError::Io(io_err) if matches!(
        io_err.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionAborted
    ))
}
