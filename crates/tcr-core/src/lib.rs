//! tcr core - shared domain types for the chat relay
//!
//! This crate provides the types shared between the relay daemon (tcrd)
//! and the terminal client (tcr): validated peer names and the chat
//! events the relay emits.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod event;
pub mod name;

// Re-exports for convenience
pub use event::ChatEvent;
pub use name::{NameError, PeerName};
