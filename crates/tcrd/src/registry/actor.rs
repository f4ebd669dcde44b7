//! Registry actor - owns the name → connection table.
//!
//! The `RegistryActor` is the single owner of the peer table. It
//! receives commands via an mpsc channel and processes them one at a
//! time, which is the whole concurrency discipline: check-then-insert
//! is atomic and snapshots are never torn because nothing else can
//! touch the table.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Channel send failures are logged but don't panic

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use tcr_core::PeerName;

use super::commands::{JoinError, RegistryCommand};
use super::PeerWriter;

/// The registry actor - owns the peer table.
///
/// Implements the actor pattern: receives commands via mpsc channel and
/// processes them sequentially. All state mutation happens within this
/// single task; a name present in the table implies its connection
/// handler registered it and has not yet cleaned up.
pub struct RegistryActor {
    /// Command receiver
    receiver: mpsc::Receiver<RegistryCommand>,

    /// Peer table: name → shared write half.
    /// At most one entry per name at any instant.
    peers: HashMap<PeerName, PeerWriter>,
}

impl RegistryActor {
    /// Creates a new registry actor.
    pub fn new(receiver: mpsc::Receiver<RegistryCommand>) -> Self {
        Self {
            receiver,
            peers: HashMap::new(),
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all handles
    /// dropped). This is the main entry point - call this in a spawned
    /// task.
    pub async fn run(mut self) {
        info!("Peer registry starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!(peers = self.peers.len(), "Peer registry stopped");
    }

    /// Dispatches a command to the appropriate handler.
    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Join {
                candidate,
                writer,
                respond_to,
            } => {
                let result = self.handle_join(&candidate, writer);
                // Ignore send error - the claimant may have disconnected
                let _ = respond_to.send(result);
            }
            RegistryCommand::Leave { name, respond_to } => {
                let removed = self.handle_leave(&name);
                let _ = respond_to.send(removed);
            }
            RegistryCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(self.handle_snapshot());
            }
            RegistryCommand::PeerCount { respond_to } => {
                let _ = respond_to.send(self.peers.len());
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    /// Validates a candidate name and inserts it, in one step.
    ///
    /// Both the validation and the duplicate check happen here, under
    /// the actor's serialization, so two concurrent handshakes for the
    /// same name can never both observe it as free.
    fn handle_join(
        &mut self,
        candidate: &str,
        writer: PeerWriter,
    ) -> Result<PeerName, JoinError> {
        let name = PeerName::parse(candidate)?;

        if self.peers.contains_key(&name) {
            debug!(peer = %name, "Name already in use, rejecting claim");
            return Err(JoinError::Taken(name));
        }

        self.peers.insert(name.clone(), writer);

        info!(
            peer = %name,
            total_peers = self.peers.len(),
            "Peer joined"
        );

        Ok(name)
    }

    /// Removes a name if present. Idempotent.
    fn handle_leave(&mut self, name: &PeerName) -> bool {
        let removed = self.peers.remove(name).is_some();

        if removed {
            info!(
                peer = %name,
                remaining_peers = self.peers.len(),
                "Peer left"
            );
        } else {
            debug!(peer = %name, "Leave for unregistered name, ignoring");
        }

        removed
    }

    /// Returns a point-in-time copy of the table.
    ///
    /// Clones the `Arc` write handles only; the caller performs any
    /// network I/O outside the actor.
    fn handle_snapshot(&self) -> Vec<(PeerName, PeerWriter)> {
        self.peers
            .iter()
            .map(|(name, writer)| (name.clone(), Arc::clone(writer)))
            .collect()
    }

    // ========================================================================
    // Accessors (for testing)
    // ========================================================================

    /// Returns the number of peers currently registered.
    #[cfg(test)]
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}
