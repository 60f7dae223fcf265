// src/core/protocol/mod.rs

pub mod command;
pub mod line_codec;
pub use command::{Command, Reply};
pub use line_codec::{DEFAULT_MAX_MESSAGE_SIZE, LineCodec};
