//! TCP listener for the chat relay.
//!
//! The server:
//! - Binds a TCP listening socket (bind failure is the only fatal error)
//! - Spawns a ConnectionHandler for each accepted connection
//! - Supports graceful shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   RelayServer   │
//! │                 │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ConnectionHandler│────▶│  RegistryHandle │
//! │   (per peer)    │     │                 │
//! └───────┬─────────┘     └─────────────────┘
//!         │
//!         │ Broadcaster
//!         ▼
//! ┌─────────────────┐
//! │ Registered peers│
//! └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Accept errors are logged and the loop continues

mod connection;

pub use connection::{ConnectionError, ConnectionHandler};

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::broadcast::Broadcaster;
use crate::config::RelayConfig;
use crate::registry::RegistryHandle;

/// TCP server for the chat relay.
///
/// Accepts connections and hands each one to its own handler task;
/// accepting never blocks on any handler's lifetime.
pub struct RelayServer {
    /// The bound listening socket
    listener: TcpListener,

    /// Actual bound address (differs from the configured one when
    /// binding port 0)
    local_addr: SocketAddr,

    /// Handshake read timeout for new connections
    handshake_timeout: Duration,

    /// Handle to the peer registry
    registry: RegistryHandle,

    /// Fan-out shared by all handlers
    broadcaster: Broadcaster,

    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,
}

impl RelayServer {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// `ServerError::Bind` when the endpoint cannot be bound - the one
    /// error the process cannot recover from.
    pub async fn bind(
        config: &RelayConfig,
        registry: RegistryHandle,
        broadcaster: Broadcaster,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind)
            .await
            .map_err(|e| ServerError::Bind {
                addr: config.bind,
                error: e.to_string(),
            })?;

        let local_addr = listener.local_addr().map_err(|e| ServerError::Bind {
            addr: config.bind,
            error: e.to_string(),
        })?;

        Ok(Self {
            listener,
            local_addr,
            handshake_timeout: config.handshake_timeout(),
            registry,
            broadcaster,
            cancel_token,
        })
    }

    /// Returns the address the server is actually listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the accept loop.
    ///
    /// Accepts until the cancellation token fires, then drops the
    /// listener; in-flight handlers drain naturally on their next I/O.
    /// This method does not return until shutdown.
    pub async fn run(self) -> Result<(), ServerError> {
        info!(addr = %self.local_addr, "Relay server listening");

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            debug!(peer = %peer_addr, "Accepted connection");
                            self.handle_connection(stream, peer_addr);
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                            // Continue accepting other connections
                        }
                    }
                }
            }
        }

        info!("Relay server stopped accepting");
        Ok(())
    }

    /// Hands an accepted connection to its own handler task.
    fn handle_connection(&self, stream: TcpStream, peer_addr: SocketAddr) {
        let handler = ConnectionHandler::new(
            stream,
            peer_addr,
            self.handshake_timeout,
            self.registry.clone(),
            self.broadcaster.clone(),
        );

        tokio::spawn(async move {
            let _ = handler.run().await;
        });
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listening endpoint could not be bound. Fatal.
    #[error("failed to bind {addr}: {error}")]
    Bind { addr: SocketAddr, error: String },
}
