// src/core/protocol/line_codec.rs

//! Implements newline framing for the text protocol along with the matching
//! `Encoder` for replies.
//!
//! After every partial read the decoder is handed everything buffered so far
//! and scans it for a `\n`. Until one shows up it asks for more data; once
//! found, the bytes up to the newline form one message. The scan resumes from
//! where the previous call stopped, so no byte is inspected twice.

use super::command::Reply;
use crate::core::LobbyError;
use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

/// The default bound on a single message, newline included.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024;

/// A `tokio_util::codec` implementation framing `\n`-terminated lines.
#[derive(Debug)]
pub struct LineCodec {
    /// Index into the buffer up to which bytes are known to hold no newline.
    next_index: usize,
    /// Upper bound on the bytes that may accumulate without a newline.
    max_message_size: usize,
    /// Set once a message overflowed the bound. No further message is ever
    /// framed for this connection.
    wedged: bool,
}

impl LineCodec {
    pub fn new(max_message_size: usize) -> Self {
        Self {
            next_index: 0,
            max_message_size,
            wedged: false,
        }
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Returns true once an oversized message has stalled this codec.
    pub fn is_wedged(&self) -> bool {
        self.wedged
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_SIZE)
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = LobbyError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.wedged {
            // Input keeps arriving but can never complete a frame.
            src.clear();
            return Ok(None);
        }

        let read_to = src.len().min(self.max_message_size);
        let newline = src[self.next_index..read_to]
            .iter()
            .position(|b| *b == b'\n');

        match newline {
            Some(offset) => {
                let end = self.next_index + offset;
                self.next_index = 0;
                let mut line = src.split_to(end + 1);
                line.truncate(end);
                if line.last() == Some(&b'\r') {
                    line.truncate(end - 1);
                }
                Ok(Some(String::from_utf8_lossy(&line).into_owned()))
            }
            None if read_to >= self.max_message_size => {
                warn!(
                    "Message exceeded {} bytes without a newline; no further input will be framed.",
                    self.max_message_size
                );
                self.wedged = true;
                self.next_index = 0;
                src.clear();
                Ok(None)
            }
            None => {
                self.next_index = read_to;
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(line) => Ok(Some(line)),
            None => {
                // A trailing fragment without a newline never formed a message.
                buf.advance(buf.len());
                self.next_index = 0;
                Ok(None)
            }
        }
    }
}

impl Encoder<Reply> for LineCodec {
    type Error = LobbyError;

    fn encode(&mut self, item: Reply, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let text = item.to_string();
        dst.reserve(text.len() + 1);
        dst.extend_from_slice(text.as_bytes());
        dst.extend_from_slice(b"\n");
        Ok(())
    }
}
