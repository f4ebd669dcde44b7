//! Chat client connection loop.
//!
//! Connects, performs the name handshake, then runs two halves
//! concurrently: a receive task printing every inbound chunk, and a
//! stdin loop sending lines to the server. The `@exit` sentinel is
//! interpreted here - on the wire, leaving is just closing the
//! connection.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use tcr_core::PeerName;
use tcr_protocol::{Reply, MAX_CHUNK_SIZE};

/// How long to wait for the TCP connection to establish.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long to wait for the server's handshake reply.
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Client-local command that ends the session. Never sent on the wire.
const EXIT_COMMAND: &str = "@exit";

/// Connection parameters for one chat session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server host or IP address.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Validated display name to claim.
    pub name: PeerName,
}

/// Errors that can occur in a client session.
#[derive(Debug, Error)]
pub enum ClientError {
    /// TCP connection could not be established.
    #[error("failed to connect: {0}")]
    Connect(String),

    /// The connection attempt timed out.
    #[error("connection attempt timed out")]
    ConnectTimeout,

    /// The server closed before replying to the handshake.
    #[error("server closed during handshake")]
    ServerClosed,

    /// No handshake reply arrived in time.
    #[error("timed out waiting for the server's reply")]
    ReplyTimeout,

    /// The server refused the chosen name.
    #[error("server rejected connection: {0}")]
    Rejected(String),

    /// The handshake reply was not OK or ERROR.
    #[error("unexpected reply from server: {0}")]
    UnexpectedReply(String),

    /// Transport failure mid-session.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Runs one chat session to completion.
pub async fn run(config: ClientConfig) -> Result<(), ClientError> {
    println!("Attempting to connect to {}:{}...", config.host, config.port);

    let stream = match timeout(
        CONNECT_TIMEOUT,
        TcpStream::connect((config.host.as_str(), config.port)),
    )
    .await
    {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(ClientError::Connect(e.to_string())),
        Err(_) => return Err(ClientError::ConnectTimeout),
    };

    let (mut reader, mut writer) = stream.into_split();

    // Handshake: name out, one reply chunk back.
    writer
        .write_all(config.name.as_str().as_bytes())
        .await
        .map_err(|e| ClientError::Io(e.to_string()))?;

    let mut buf = [0u8; MAX_CHUNK_SIZE];
    let n = match timeout(REPLY_TIMEOUT, reader.read(&mut buf)).await {
        Ok(Ok(0)) => return Err(ClientError::ServerClosed),
        Ok(Ok(n)) => n,
        Ok(Err(e)) => return Err(ClientError::Io(e.to_string())),
        Err(_) => return Err(ClientError::ReplyTimeout),
    };

    let raw = String::from_utf8_lossy(buf.get(..n).unwrap_or_default()).into_owned();
    match Reply::parse(&raw) {
        Ok(Reply::Ok { info }) => {
            println!("Connected as {}.", config.name);
            // Broadcast chunks may already ride along with the OK
            if let Some(info) = info {
                println!("{info}");
            }
        }
        Ok(Reply::Error { reason }) => return Err(ClientError::Rejected(reason)),
        Err(e) => return Err(ClientError::UnexpectedReply(e.to_string())),
    }

    // Receive task: print whatever arrives until the server closes.
    let mut recv_task = tokio::spawn(async move {
        let mut buf = [0u8; MAX_CHUNK_SIZE];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => {
                    println!("Server disconnected.");
                    break;
                }
                Ok(n) => {
                    let line = String::from_utf8_lossy(buf.get(..n).unwrap_or_default());
                    println!("{line}");
                }
                Err(_) => {
                    println!("Connection error with the server.");
                    break;
                }
            }
        }
    });

    // Send loop: forward stdin lines until @exit, stdin EOF, or the
    // server goes away.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut voluntary_exit = false;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if line.trim() == EXIT_COMMAND {
                            voluntary_exit = true;
                            break;
                        }
                        if line.is_empty() {
                            continue;
                        }
                        if writer.write_all(line.as_bytes()).await.is_err() {
                            println!("Failed to send message.");
                            break;
                        }
                    }
                    Ok(None) => {
                        // stdin closed
                        voluntary_exit = true;
                        break;
                    }
                    Err(e) => return Err(ClientError::Io(e.to_string())),
                }
            }
            _ = &mut recv_task => {
                break;
            }
        }
    }

    if voluntary_exit {
        recv_task.abort();
    }

    // Departure on the wire is just closing our side.
    let _ = writer.shutdown().await;
    println!("Disconnected.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::Rejected("Rejected - Name already in use.".to_string());
        assert_eq!(
            err.to_string(),
            "server rejected connection: Rejected - Name already in use."
        );

        assert_eq!(
            ClientError::ConnectTimeout.to_string(),
            "connection attempt timed out"
        );
    }

    #[test]
    fn test_exit_command_is_client_local() {
        // The sentinel must never collide with the reply grammar.
        assert!(Reply::parse(EXIT_COMMAND).is_err());
    }
}
