//! Peer registry using Actor pattern.
//!
//! The registry is the authoritative name → connection mapping for the
//! relay. It receives commands via a tokio mpsc channel and is the only
//! owner of the table, so check-then-insert during a handshake and the
//! snapshot taken for a broadcast are both single commands processed in
//! sequence: no two concurrent handshakes can claim the same name, and
//! no snapshot can observe a torn insert or remove.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────────────────┐
//! │ConnectionHandler│────▶│       RegistryActor         │
//! │  (per client)   │     │ HashMap<PeerName,PeerWriter>│
//! └─────────────────┘     └─────────────────────────────┘
//!         │  RegistryCommand (mpsc)        │
//!         │                                │ snapshot (cloned handles)
//!         ▼                                ▼
//!    join / leave                  Broadcaster fan-out
//!                                  (outside the actor)
//! ```
//!
//! Network I/O never happens inside the actor: a snapshot hands out
//! cloned `Arc` write handles and the fan-out writes run in the calling
//! task, so one slow peer cannot stall joins or leaves.
//!
//! # Panic-Free Guarantees
//!
//! All operations in this module follow the panic-free policy:
//! - No `.unwrap()` or `.expect()` in production code
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio::sync::{mpsc, Mutex};

mod actor;
mod commands;
mod handle;

pub use actor::RegistryActor;
pub use commands::{JoinError, RegistryCommand};
pub use handle::RegistryHandle;

/// Command channel buffer size
const COMMAND_BUFFER: usize = 100;

/// Shared write half of a peer connection.
///
/// Stored in the registry and handed out in snapshots; the mutex
/// serializes concurrent fan-out writes to the same peer so chunks
/// never interleave.
pub type PeerWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// Wraps a transport write half as a registrable `PeerWriter`.
pub fn peer_writer<W>(writer: W) -> PeerWriter
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    Arc::new(Mutex::new(Box::new(writer) as Box<dyn AsyncWrite + Send + Unpin>))
}

/// Spawn the registry actor and return a handle for interaction.
///
/// The actor runs until every handle is dropped and the command channel
/// closes.
pub fn spawn_registry() -> RegistryHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

    let actor = RegistryActor::new(cmd_rx);
    tokio::spawn(actor.run());

    RegistryHandle::new(cmd_tx)
}
