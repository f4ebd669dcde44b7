//! Best-effort fan-out of chat events.
//!
//! The broadcaster is fire-and-forget multicast: it appends the event
//! to the chat log, takes a registry snapshot, and attempts one write
//! per recipient. A failed or slow recipient costs only its own
//! delivery - there is no retry, no acknowledgement, no backpressure,
//! and the registry is never locked across a write.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tracing::debug;

use tcr_core::{ChatEvent, PeerName};

use crate::chatlog::EventSink;
use crate::registry::{PeerWriter, RegistryHandle};

/// Upper bound on a single fan-out write.
///
/// Bounds how long one wedged peer can hold its own writer lock; other
/// peers' deliveries proceed regardless.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Fans chat events out to every registered peer.
///
/// Cheap to clone; every connection handler holds one.
#[derive(Clone)]
pub struct Broadcaster {
    /// Source of registry snapshots.
    registry: RegistryHandle,

    /// Chat log, written synchronously before fan-out.
    sink: Arc<dyn EventSink>,
}

impl Broadcaster {
    /// Creates a broadcaster over a registry and a chat log sink.
    pub fn new(registry: RegistryHandle, sink: Arc<dyn EventSink>) -> Self {
        Self { registry, sink }
    }

    /// Delivers an event to every registered peer except `exclude`.
    ///
    /// The event is logged first, then written best-effort to each
    /// recipient from a point-in-time snapshot. Per-recipient failures
    /// are swallowed and never abort delivery to the rest.
    pub async fn broadcast(&self, event: &ChatEvent, exclude: Option<&PeerName>) {
        let line = event.to_string();

        if event.is_lifecycle() {
            self.sink.event(&line);
        } else {
            self.sink.message(&line);
        }

        let peers = self.registry.snapshot().await;

        for (name, writer) in peers {
            if exclude == Some(&name) {
                continue;
            }

            if let Err(e) = send_chunk(&writer, line.as_bytes()).await {
                debug!(
                    peer = %name,
                    error = %e,
                    "Dropping undeliverable broadcast"
                );
            }
        }
    }
}

/// Writes one chunk to a peer under the write timeout.
async fn send_chunk(writer: &PeerWriter, chunk: &[u8]) -> io::Result<()> {
    let mut writer = writer.lock().await;

    match timeout(WRITE_TIMEOUT, async {
        writer.write_all(chunk).await?;
        writer.flush().await
    })
    .await
    {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "peer write timed out",
        )),
    }
}
