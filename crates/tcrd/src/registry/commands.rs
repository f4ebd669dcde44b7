//! Registry actor commands and errors.
//!
//! This module defines the message types for communicating with the
//! `RegistryActor`:
//! - `RegistryCommand`: commands sent to the actor
//! - `JoinError`: why a handshake's claim on a name failed
//!
//! All types are designed for async message passing and follow the
//! panic-free policy.

use tcr_core::{NameError, PeerName};
use thiserror::Error;
use tokio::sync::oneshot;

use super::PeerWriter;

/// Commands sent to the registry actor.
///
/// Each request/response command carries a oneshot channel for the
/// reply, enabling request-response patterns in async code without
/// blocking.
pub enum RegistryCommand {
    /// Claim a name and register its write handle, atomically.
    ///
    /// Validation and the duplicate check happen inside the actor so
    /// that of two concurrent claimants for one name, exactly one wins.
    Join {
        /// The raw candidate name as received from the wire.
        candidate: String,
        /// Write half of the claimant's connection.
        writer: PeerWriter,
        /// Channel to send the result
        respond_to: oneshot::Sender<Result<PeerName, JoinError>>,
    },

    /// Remove a name from the registry.
    ///
    /// Idempotent: removing an absent name is a no-op reported as
    /// `false`.
    Leave {
        /// The name to remove
        name: PeerName,
        /// Whether an entry was actually removed
        respond_to: oneshot::Sender<bool>,
    },

    /// Take a point-in-time copy of the registry for broadcast.
    ///
    /// Returns cloned write handles; the fan-out happens in the caller,
    /// never inside the actor.
    Snapshot {
        /// Channel to send the enumeration
        respond_to: oneshot::Sender<Vec<(PeerName, PeerWriter)>>,
    },

    /// Current number of registered peers.
    PeerCount {
        /// Channel to send the count
        respond_to: oneshot::Sender<usize>,
    },
}

/// Why a handshake's claim on a name failed.
///
/// Uses `thiserror` for ergonomic error handling and Display
/// implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    /// The candidate failed validation (blank or contains whitespace).
    #[error("invalid name: {0}")]
    Invalid(#[from] NameError),

    /// Another live connection already holds this name.
    #[error("name already in use: {0}")]
    Taken(PeerName),

    /// The registry actor has shut down.
    #[error("registry channel closed")]
    ChannelClosed,
}
