//! tcr protocol - wire protocol for the chat relay
//!
//! This crate pins down the few things both ends of a connection must
//! agree on: the chunk-is-message framing parameters and the handshake
//! reply grammar. Everything after the handshake is plain UTF-8 text.

pub mod message;
pub mod wire;

pub use message::{Reply, ReplyParseError};
pub use wire::{DEFAULT_PORT, MAX_CHUNK_SIZE};
