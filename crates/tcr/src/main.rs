//! tcr - terminal client for the chat relay
//!
//! A thin reader/writer over the relay's wire protocol: sends the
//! chosen name, prints whatever the server broadcasts, and relays
//! stdin lines. Type `@exit` to leave.
//!
//! # Usage
//!
//! ```bash
//! tcr chat.example.net alice
//! tcr 127.0.0.1 alice --port 9001
//! ```

mod client;

use anyhow::{bail, Result};
use clap::Parser;

use tcr_core::PeerName;
use tcr_protocol::DEFAULT_PORT;

use client::ClientConfig;

/// Terminal client for the tcr chat relay
#[derive(Parser, Debug)]
#[command(name = "tcr", version, about)]
struct Args {
    /// Server host or IP address
    server: String,

    /// Display name to register with
    name: String,

    /// Server port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Validate locally before dialing; the server enforces this too.
    let name = match PeerName::parse(&args.name) {
        Ok(name) => name,
        Err(e) => bail!("Invalid name: {e}"),
    };

    let config = ClientConfig {
        host: args.server,
        port: args.port,
        name,
    };

    client::run(config).await?;
    Ok(())
}
