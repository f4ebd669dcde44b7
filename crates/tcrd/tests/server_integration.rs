//! Integration tests for the TCP relay server.
//!
//! These verify the relay as a complete system over real sockets:
//! handshakes, rebroadcast with sender exclusion, departure notices,
//! chat log records, and graceful shutdown.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - the panic-free policy
//! applies to production code only.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;

use tcrd::broadcast::Broadcaster;
use tcrd::chatlog::{EventSink, MemorySink, RecordKind};
use tcrd::config::RelayConfig;
use tcrd::registry::spawn_registry;
use tcrd::server::RelayServer;

// ============================================================================
// Constants
// ============================================================================

/// Maximum time to wait for an expected chunk or log record
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a connection must stay quiet to count as silent
const SILENCE_WINDOW: Duration = Duration::from_millis(300);

/// Grace period for server shutdown
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_millis(100);

// ============================================================================
// Test Helpers
// ============================================================================

/// Test server bound to an ephemeral loopback port.
struct TestServer {
    addr: SocketAddr,
    cancel_token: CancellationToken,
    sink: Arc<MemorySink>,
}

impl TestServer {
    /// Spawns a server with default settings.
    async fn spawn() -> Self {
        let mut config = RelayConfig::default();
        config.bind = "127.0.0.1:0".parse().expect("loopback address");

        let registry = spawn_registry();
        let sink = Arc::new(MemorySink::new());
        let broadcaster =
            Broadcaster::new(registry.clone(), Arc::clone(&sink) as Arc<dyn EventSink>);
        let cancel_token = CancellationToken::new();

        let server = RelayServer::bind(&config, registry, broadcaster, cancel_token.clone())
            .await
            .expect("bind test server");
        let addr = server.local_addr();

        tokio::spawn(async move {
            let _ = server.run().await;
        });

        TestServer {
            addr,
            cancel_token,
            sink,
        }
    }

    /// Opens a raw connection without handshaking.
    async fn connect(&self) -> TestPeer {
        let stream = TcpStream::connect(self.addr)
            .await
            .expect("connect to server");
        TestPeer {
            stream,
            seen: String::new(),
        }
    }

    /// Connects and completes the handshake as `name`.
    async fn join(&self, name: &str) -> TestPeer {
        let mut peer = self.connect().await;
        peer.send(name).await;
        let reply = peer.recv().await;
        assert!(
            reply.starts_with("OK"),
            "expected OK for {name}, got {reply:?}"
        );
        peer
    }

    /// Waits until the chat log holds a record containing `needle`.
    async fn wait_for_record(&self, needle: &str) {
        let deadline = Instant::now() + RECV_TIMEOUT;
        while Instant::now() < deadline {
            if self
                .sink
                .records()
                .iter()
                .any(|record| record.line.contains(needle))
            {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "no log record containing {needle:?}; have {:?}",
            self.sink.records()
        );
    }

    /// Shuts down the server gracefully.
    async fn shutdown(self) {
        self.cancel_token.cancel();
        sleep(SHUTDOWN_GRACE_PERIOD).await;
    }
}

/// One wire-level chat peer.
///
/// Accumulates everything received: the protocol has no framing, so
/// broadcasts may coalesce with the handshake reply or each other, and
/// assertions must tolerate any chunking.
struct TestPeer {
    stream: TcpStream,
    seen: String,
}

impl TestPeer {
    /// Sends one chunk.
    async fn send(&mut self, chunk: &str) {
        self.stream
            .write_all(chunk.as_bytes())
            .await
            .expect("send chunk");
    }

    /// Receives one chunk and records it.
    async fn recv(&mut self) -> String {
        let mut buf = [0u8; 1024];
        let n = timeout(RECV_TIMEOUT, self.stream.read(&mut buf))
            .await
            .expect("recv timed out")
            .expect("read failed");
        let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
        self.seen.push_str(&chunk);
        chunk
    }

    /// Reads until `needle` has appeared somewhere in the received
    /// stream (including chunks already consumed).
    async fn recv_until(&mut self, needle: &str) {
        let deadline = Instant::now() + RECV_TIMEOUT;

        while !self.seen.contains(needle) {
            let mut buf = [0u8; 1024];
            let remaining = deadline.saturating_duration_since(Instant::now());
            match timeout(remaining, self.stream.read(&mut buf)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => self.seen.push_str(&String::from_utf8_lossy(&buf[..n])),
                _ => break,
            }
        }

        assert!(
            self.seen.contains(needle),
            "did not receive {needle:?}, saw {:?}",
            self.seen
        );
    }

    /// Asserts nothing arrives within the silence window.
    async fn expect_silence(&mut self) {
        let mut buf = [0u8; 1024];
        match timeout(SILENCE_WINDOW, self.stream.read(&mut buf)).await {
            Err(_) => {}
            Ok(Ok(n)) => panic!(
                "expected silence, got {:?}",
                String::from_utf8_lossy(&buf[..n])
            ),
            Ok(Err(e)) => panic!("read error while expecting silence: {e}"),
        }
    }

    /// Drains pending chunks until the server closes the connection.
    async fn recv_eof(&mut self) {
        let deadline = Instant::now() + RECV_TIMEOUT;
        loop {
            let mut buf = [0u8; 1024];
            let remaining = deadline.saturating_duration_since(Instant::now());
            match timeout(remaining, self.stream.read(&mut buf)).await {
                Ok(Ok(0)) => return,
                Ok(Ok(_)) => continue,
                Ok(Err(_)) => return, // reset counts as closed
                Err(_) => panic!("connection was not closed"),
            }
        }
    }
}

// ============================================================================
// Handshake Tests
// ============================================================================

#[tokio::test]
async fn test_handshake_accepts_valid_name() {
    let server = TestServer::spawn().await;

    let _alice = server.join("alice").await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_duplicate_name_rejected_and_closed() {
    let server = TestServer::spawn().await;

    let _alice = server.join("alice").await;

    let mut impostor = server.connect().await;
    impostor.send("alice").await;

    let reply = impostor.recv().await;
    assert!(
        reply.contains("ERROR: Rejected - Name already in use."),
        "got {reply:?}"
    );
    impostor.recv_eof().await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_blank_name_rejected() {
    let server = TestServer::spawn().await;

    let mut peer = server.connect().await;
    peer.send("   ").await;

    let reply = peer.recv().await;
    assert!(
        reply.contains("ERROR: Rejected - Name cannot be blank."),
        "got {reply:?}"
    );
    peer.recv_eof().await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_whitespace_name_rejected() {
    let server = TestServer::spawn().await;

    let mut peer = server.connect().await;
    peer.send("alice smith").await;

    let reply = peer.recv().await;
    assert!(
        reply.contains("ERROR: Rejected - Name cannot contain whitespace."),
        "got {reply:?}"
    );
    peer.recv_eof().await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_simultaneous_claimants_single_winner() {
    let server = TestServer::spawn().await;

    let mut first = server.connect().await;
    let mut second = server.connect().await;

    // Race the two claims as closely as the wire allows
    first.send("alice").await;
    second.send("alice").await;

    let replies = [first.recv().await, second.recv().await];
    let oks = replies.iter().filter(|r| r.starts_with("OK")).count();
    let errors = replies
        .iter()
        .filter(|r| r.contains("Name already in use"))
        .count();

    assert_eq!(oks, 1, "replies: {replies:?}");
    assert_eq!(errors, 1, "replies: {replies:?}");

    server.shutdown().await;
}

// ============================================================================
// Relay Tests
// ============================================================================

#[tokio::test]
async fn test_join_notice_broadcast_to_all() {
    let server = TestServer::spawn().await;

    let mut alice = server.join("alice").await;
    // The joiner itself is included in the join broadcast
    alice.recv_until("** alice is joining the chat **").await;

    let mut carol = server.join("carol").await;
    carol.recv_until("** carol is joining the chat **").await;
    alice.recv_until("** carol is joining the chat **").await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_message_relayed_with_sender_prefix_and_no_echo() {
    let server = TestServer::spawn().await;

    let mut alice = server.join("alice").await;
    let mut carol = server.join("carol").await;

    // Drain the join notices so silence checks start clean
    alice.recv_until("** carol is joining the chat **").await;
    carol.recv_until("** carol is joining the chat **").await;

    alice.send("hello").await;

    carol.recv_until("[alice] hello").await;
    alice.expect_silence().await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_messages_relayed_to_all_other_peers() {
    let server = TestServer::spawn().await;

    let mut alice = server.join("alice").await;
    let mut bob = server.join("bob").await;
    let mut carol = server.join("carol").await;

    alice.recv_until("** carol is joining the chat **").await;
    bob.recv_until("** carol is joining the chat **").await;
    carol.recv_until("** carol is joining the chat **").await;

    bob.send("hi all").await;

    alice.recv_until("[bob] hi all").await;
    carol.recv_until("[bob] hi all").await;
    bob.expect_silence().await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_disconnect_broadcasts_leave_and_frees_name() {
    let server = TestServer::spawn().await;

    let alice = server.join("alice").await;
    let mut carol = server.join("carol").await;
    carol.recv_until("** carol is joining the chat **").await;

    // Wire-level departure: just close the socket, no sentinel
    drop(alice);

    carol.recv_until("** alice is leaving the chat **").await;

    // The name is immediately claimable again
    let _alice_again = server.join("alice").await;

    server.shutdown().await;
}

// ============================================================================
// Chat Log Tests
// ============================================================================

#[tokio::test]
async fn test_chat_log_records_joins_messages_and_leaves() {
    let server = TestServer::spawn().await;

    let mut alice = server.join("alice").await;
    let mut carol = server.join("carol").await;
    carol.recv_until("** carol is joining the chat **").await;

    alice.send("hello").await;
    carol.recv_until("[alice] hello").await;

    drop(alice);
    carol.recv_until("** alice is leaving the chat **").await;

    server
        .wait_for_record("** alice is joining the chat **")
        .await;
    server.wait_for_record("[alice] hello").await;
    server
        .wait_for_record("** alice is leaving the chat **")
        .await;

    let records = server.sink.records();
    let message_record = records
        .iter()
        .find(|r| r.line == "[alice] hello")
        .expect("message record present");
    assert_eq!(message_record.kind, RecordKind::Message);

    let join_record = records
        .iter()
        .find(|r| r.line == "** alice is joining the chat **")
        .expect("join record present");
    assert_eq!(join_record.kind, RecordKind::Event);

    server.shutdown().await;
}

// ============================================================================
// Shutdown Tests
// ============================================================================

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let server = TestServer::spawn().await;
    let addr = server.addr;

    server.shutdown().await;

    // Either the connect is refused outright, or an in-flight accept
    // surfaces as an immediately-dead socket.
    match TcpStream::connect(addr).await {
        Err(_) => {}
        Ok(mut stream) => {
            let mut buf = [0u8; 16];
            match timeout(RECV_TIMEOUT, stream.read(&mut buf)).await {
                Ok(Ok(0)) | Ok(Err(_)) => {}
                other => panic!("listener still serving after shutdown: {other:?}"),
            }
        }
    }
}

#[tokio::test]
async fn test_connected_peers_survive_listener_shutdown() {
    let server = TestServer::spawn().await;

    let mut alice = server.join("alice").await;
    let mut carol = server.join("carol").await;
    carol.recv_until("** carol is joining the chat **").await;
    alice.recv_until("** carol is joining the chat **").await;

    server.cancel_token.cancel();
    sleep(SHUTDOWN_GRACE_PERIOD).await;

    // In-flight handlers drain naturally; relaying still works
    alice.send("parting words").await;
    carol.recv_until("[alice] parting words").await;
}
