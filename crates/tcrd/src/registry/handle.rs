//! Client interface for interacting with the RegistryActor.
//!
//! The `RegistryHandle` provides a cheap-to-clone interface for sending
//! commands to the registry actor. One handle is held by every
//! connection handler; the actor stops when the last handle is dropped.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel errors are mapped to `JoinError::ChannelClosed` or to the
//!   operation's neutral value

use tokio::sync::{mpsc, oneshot};

use tcr_core::PeerName;

use super::commands::{JoinError, RegistryCommand};
use super::PeerWriter;

/// Handle for interacting with the registry actor.
///
/// Cheap to clone and share across connection handler tasks. All
/// methods are async and communicate with the actor via channels.
#[derive(Clone)]
pub struct RegistryHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Create a new registry handle.
    pub fn new(sender: mpsc::Sender<RegistryCommand>) -> Self {
        Self { sender }
    }

    /// Claim a name for a connection, atomically.
    ///
    /// # Errors
    ///
    /// - `JoinError::Invalid` if the candidate is blank or contains whitespace
    /// - `JoinError::Taken` if another connection holds the name
    /// - `JoinError::ChannelClosed` if the actor has shut down
    pub async fn join(
        &self,
        candidate: impl Into<String>,
        writer: PeerWriter,
    ) -> Result<PeerName, JoinError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Join {
                candidate: candidate.into(),
                writer,
                respond_to: tx,
            })
            .await
            .map_err(|_| JoinError::ChannelClosed)?;

        rx.await.map_err(|_| JoinError::ChannelClosed)?
    }

    /// Remove a name from the registry. Idempotent.
    ///
    /// Returns `true` if an entry was removed, `false` if the name was
    /// absent or the actor has shut down.
    pub async fn leave(&self, name: PeerName) -> bool {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::Leave {
                name,
                respond_to: tx,
            })
            .await
            .is_err()
        {
            return false;
        }

        rx.await.unwrap_or(false)
    }

    /// Take a point-in-time copy of the registry for broadcast.
    ///
    /// Returns an empty enumeration if the actor has shut down.
    pub async fn snapshot(&self) -> Vec<(PeerName, PeerWriter)> {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::Snapshot { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// Current number of registered peers.
    pub async fn peer_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::PeerCount { respond_to: tx })
            .await
            .is_err()
        {
            return 0;
        }

        rx.await.unwrap_or(0)
    }

    /// Check if the actor is still running.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}
