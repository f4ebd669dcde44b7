//! Connection handler for individual chat peers.
//!
//! Each accepted socket gets its own `ConnectionHandler` running the
//! three-state life cycle:
//!
//! ```text
//! AWAITING_NAME ──ok──▶ REGISTERED ──eof/error──▶ CLOSED
//!       │                                           ▲
//!       └──rejected/timeout/eof────────────────────-┘ (close only,
//!                                                     never registered)
//! ```
//!
//! The CLOSED cleanup - deregister, announce the leave, drop the
//! transport - is the tail of `run()`, reached from every registered
//! exit path exactly once.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Connection errors are logged and terminate only this handler

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use tcr_core::{ChatEvent, PeerName};
use tcr_protocol::{Reply, MAX_CHUNK_SIZE};

use crate::broadcast::Broadcaster;
use crate::registry::{peer_writer, JoinError, PeerWriter, RegistryHandle};

/// Connection handler for a single peer.
///
/// Owns the read half exclusively; the write half is shared with the
/// registry so broadcasts from other handlers can reach this peer.
pub struct ConnectionHandler {
    /// Read half, owned by this handler alone
    reader: OwnedReadHalf,

    /// Shared write half, registered under the peer's name on join
    writer: PeerWriter,

    /// Remote address, for diagnostics
    peer_addr: SocketAddr,

    /// How long to wait for the name chunk before dropping the peer
    handshake_timeout: Duration,

    /// Handle to the peer registry
    registry: RegistryHandle,

    /// Fan-out for messages and notices
    broadcaster: Broadcaster,
}

impl ConnectionHandler {
    /// Creates a handler for an accepted connection.
    pub fn new(
        stream: TcpStream,
        peer_addr: SocketAddr,
        handshake_timeout: Duration,
        registry: RegistryHandle,
        broadcaster: Broadcaster,
    ) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader,
            writer: peer_writer(writer),
            peer_addr,
            handshake_timeout,
            registry,
            broadcaster,
        }
    }

    /// Runs the handler to completion.
    ///
    /// Returns the name the peer held, if the handshake succeeded.
    pub async fn run(mut self) -> Option<PeerName> {
        debug!(peer = %self.peer_addr, "New connection");

        let name = match self.handshake().await {
            Ok(name) => name,
            Err(ConnectionError::Rejected(reason)) => {
                warn!(peer = %self.peer_addr, %reason, "Handshake rejected");
                return None;
            }
            Err(e) => {
                debug!(peer = %self.peer_addr, error = %e, "Handshake aborted");
                return None;
            }
        };

        info!(peer = %self.peer_addr, name = %name, "Peer registered");

        // REGISTERED: the insert is visible, announce to everyone
        // (the joiner included).
        self.broadcaster
            .broadcast(&ChatEvent::Join(name.clone()), None)
            .await;

        if let Err(e) = self.relay_loop(&name).await {
            debug!(name = %name, error = %e, "Relay loop ended with error");
        }

        // CLOSED: runs exactly once on every registered path.
        self.close(&name).await;

        info!(peer = %self.peer_addr, name = %name, "Peer disconnected");
        Some(name)
    }

    /// AWAITING_NAME: reads one chunk as the candidate name and claims
    /// it in the registry.
    ///
    /// On rejection the `ERROR:` reply is sent before erroring out; the
    /// caller only drops the socket.
    async fn handshake(&mut self) -> Result<PeerName, ConnectionError> {
        let mut buf = [0u8; MAX_CHUNK_SIZE];

        let n = match timeout(self.handshake_timeout, self.reader.read(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(ConnectionError::Io(e.to_string())),
            Err(_) => return Err(ConnectionError::HandshakeTimeout),
        };

        if n == 0 {
            return Err(ConnectionError::NoNameSent);
        }

        let candidate = String::from_utf8_lossy(buf.get(..n).unwrap_or_default()).into_owned();

        match self.registry.join(candidate, Arc::clone(&self.writer)).await {
            Ok(name) => {
                if let Err(e) = self.send(Reply::ok()).await {
                    // The peer is already gone; undo the insert so the
                    // name doesn't point at a dead writer.
                    self.registry.leave(name).await;
                    return Err(e);
                }
                Ok(name)
            }
            Err(JoinError::Invalid(reason)) => {
                let _ = self.send(Reply::reject_name(reason)).await;
                Err(ConnectionError::Rejected(JoinError::Invalid(reason)))
            }
            Err(JoinError::Taken(name)) => {
                let _ = self.send(Reply::reject_taken()).await;
                Err(ConnectionError::Rejected(JoinError::Taken(name)))
            }
            Err(JoinError::ChannelClosed) => Err(ConnectionError::Shutdown),
        }
    }

    /// REGISTERED: relays each inbound chunk to everyone else.
    ///
    /// Reads block indefinitely; a zero-length read (peer closed) or a
    /// read error ends the loop.
    async fn relay_loop(&mut self, name: &PeerName) -> Result<(), ConnectionError> {
        let mut buf = [0u8; MAX_CHUNK_SIZE];

        loop {
            let n = self
                .reader
                .read(&mut buf)
                .await
                .map_err(|e| ConnectionError::Io(e.to_string()))?;

            if n == 0 {
                debug!(name = %name, "Peer closed the connection");
                return Ok(());
            }

            let text = String::from_utf8_lossy(buf.get(..n).unwrap_or_default()).into_owned();
            let message = ChatEvent::Message {
                from: name.clone(),
                text,
            };

            self.broadcaster.broadcast(&message, Some(name)).await;
        }
    }

    /// CLOSED: deregister and announce the departure.
    ///
    /// The leave is idempotent; the transport closes when the handler
    /// drops both halves.
    async fn close(&self, name: &PeerName) {
        self.registry.leave(name.clone()).await;
        self.broadcaster
            .broadcast(&ChatEvent::Leave(name.clone()), None)
            .await;
    }

    /// Sends a handshake reply to this peer.
    async fn send(&self, reply: Reply) -> Result<(), ConnectionError> {
        let chunk = reply.encode();
        let mut writer = self.writer.lock().await;

        writer
            .write_all(chunk.as_bytes())
            .await
            .map_err(|e| ConnectionError::Io(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| ConnectionError::Io(e.to_string()))?;

        Ok(())
    }
}

/// Errors that can occur during connection handling.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The peer closed before sending any name chunk.
    #[error("peer closed before sending a name")]
    NoNameSent,

    /// No name chunk arrived within the handshake timeout.
    #[error("no name received within the handshake timeout")]
    HandshakeTimeout,

    /// The registry refused the claimed name.
    #[error("handshake rejected: {0}")]
    Rejected(JoinError),

    /// The registry shut down mid-handshake; the process is exiting.
    #[error("server shutting down")]
    Shutdown,

    /// Transport failure local to this connection.
    #[error("I/O error: {0}")]
    Io(String),
}
