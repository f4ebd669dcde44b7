//! tcr daemon - chat relay server
//!
//! This binary runs the relay, accepting chat connections and
//! rebroadcasting every message to all other connected peers.
//!
//! # Usage
//!
//! ```bash
//! # Start the relay (foreground)
//! tcrd start
//!
//! # Start the relay (background/daemonized)
//! tcrd start -d
//!
//! # Custom endpoint and chat log
//! tcrd start --bind 0.0.0.0:9001 --chat-log /var/log/tcr/chat.log
//!
//! # Stop the running daemon
//! tcrd stop
//!
//! # Check daemon status
//! tcrd status
//!
//! # Enable debug logging
//! RUST_LOG=tcrd=debug tcrd start
//! ```
//!
//! # Signal Handling
//!
//! SIGTERM/SIGINT stop the listener; connected peers drain naturally.

use std::env;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tcrd::broadcast::Broadcaster;
use tcrd::chatlog::FileSink;
use tcrd::config::RelayConfig;
use tcrd::registry::spawn_registry;
use tcrd::server::RelayServer;

/// tcr daemon - concurrent TCP chat relay
#[derive(Parser, Debug)]
#[command(name = "tcrd", version, about)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the relay
    Start {
        /// Run as a background daemon (fork to background)
        #[arg(short = 'd', long)]
        daemon: bool,

        /// Address to listen on (overrides config file and TCRD_BIND)
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Chat event log path (overrides config file)
        #[arg(long)]
        chat_log: Option<PathBuf>,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Stop the running daemon
    Stop,
    /// Show daemon status
    Status,
}

/// Returns the path to the PID file.
fn pid_file_path() -> PathBuf {
    let state_dir = dirs::state_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("tcr");
    state_dir.join("tcrd.pid")
}

/// Returns the path to the daemon log file.
fn log_file_path() -> PathBuf {
    let state_dir = dirs::state_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("tcr");
    state_dir.join("tcrd.log")
}

/// Reads the PID from the PID file, if it exists.
fn read_pid() -> Option<u32> {
    let path = pid_file_path();
    let mut file = File::open(&path).ok()?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).ok()?;
    contents.trim().parse().ok()
}

/// Writes the current PID to the PID file.
fn write_pid() -> Result<()> {
    let path = pid_file_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create state directory")?;
    }
    let mut file = File::create(&path).context("Failed to create PID file")?;
    write!(file, "{}", process::id()).context("Failed to write PID")?;
    Ok(())
}

/// Removes the PID file.
fn remove_pid_file() {
    let path = pid_file_path();
    let _ = fs::remove_file(path);
}

/// Checks if a process with the given PID is running.
fn is_process_running(pid: u32) -> bool {
    PathBuf::from(format!("/proc/{pid}")).exists()
}

/// Checks if the daemon is already running.
fn is_daemon_running() -> Option<u32> {
    if let Some(pid) = read_pid() {
        if is_process_running(pid) {
            return Some(pid);
        }
        // Stale PID file - remove it
        remove_pid_file();
    }
    None
}

/// Sends SIGTERM to the daemon process.
fn stop_daemon(pid: u32) -> Result<()> {
    #[cfg(unix)]
    {
        let result = unsafe { libc::kill(pid as i32, libc::SIGTERM) };
        if result != 0 {
            bail!("Failed to send SIGTERM to process {pid}");
        }
    }
    #[cfg(not(unix))]
    {
        bail!("Stop command is only supported on Unix systems");
    }
    Ok(())
}

/// Layers configuration sources: file, then TCRD_BIND, then flags.
fn resolve_config(
    config_path: Option<&PathBuf>,
    bind: Option<SocketAddr>,
    chat_log: Option<PathBuf>,
) -> Result<RelayConfig> {
    let mut config = match config_path {
        Some(path) => RelayConfig::load(path)?,
        None => RelayConfig::default(),
    };

    if let Ok(addr) = env::var("TCRD_BIND") {
        config.bind = addr
            .parse()
            .with_context(|| format!("Invalid TCRD_BIND address: {addr}"))?;
    }

    if let Some(bind) = bind {
        config.bind = bind;
    }
    if let Some(chat_log) = chat_log {
        config.chat_log = chat_log;
    }

    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Default to 'start' if no subcommand given
    let command = args.command.unwrap_or(Command::Start {
        daemon: false,
        bind: None,
        chat_log: None,
        config: None,
    });

    match command {
        Command::Start {
            daemon,
            bind,
            chat_log,
            config,
        } => {
            if let Some(pid) = is_daemon_running() {
                eprintln!("Daemon is already running (PID {pid})");
                eprintln!("Use 'tcrd stop' to stop it first.");
                process::exit(1);
            }

            let config = resolve_config(config.as_ref(), bind, chat_log)?;

            if daemon {
                // Daemonize before starting the tokio runtime
                daemonize()?;
            }

            write_pid()?;

            let result = run_daemon(config);

            remove_pid_file();

            result
        }
        Command::Stop => {
            if let Some(pid) = is_daemon_running() {
                println!("Stopping daemon (PID {pid})...");
                stop_daemon(pid)?;

                // Wait for process to exit (up to 5 seconds)
                for _ in 0..50 {
                    if !is_process_running(pid) {
                        println!("Daemon stopped.");
                        return Ok(());
                    }
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }

                eprintln!("Daemon did not stop within 5 seconds.");
                process::exit(1);
            } else {
                println!("Daemon is not running.");
                Ok(())
            }
        }
        Command::Status => {
            if let Some(pid) = is_daemon_running() {
                println!("Daemon is running (PID {pid})");
                Ok(())
            } else {
                println!("Daemon is not running.");
                process::exit(1);
            }
        }
    }
}

/// Daemonizes the current process.
fn daemonize() -> Result<()> {
    use daemonize::Daemonize;

    let log_path = log_file_path();

    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).context("Failed to create log directory")?;
    }

    let stdout = File::create(&log_path).context("Failed to create log file for stdout")?;
    let stderr = File::create(&log_path).context("Failed to create log file for stderr")?;

    let daemonize = Daemonize::new()
        .working_directory("/")
        .stdout(stdout)
        .stderr(stderr);

    daemonize.start().context("Failed to daemonize")?;

    Ok(())
}

/// Runs the relay (async entry point).
#[tokio::main]
async fn run_daemon(config: RelayConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("tcrd=info".parse()?)
                .add_directive("tcr_core=info".parse()?)
                .add_directive("tcr_protocol=info".parse()?),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "tcr daemon starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let registry = spawn_registry();
    info!("Peer registry started");

    let sink = FileSink::open(&config.chat_log)
        .with_context(|| format!("Failed to open chat log {}", config.chat_log.display()))?;
    info!(chat_log = %config.chat_log.display(), "Chat log open");

    let broadcaster = Broadcaster::new(registry.clone(), Arc::new(sink));

    // Bind failure is fatal: the relay cannot provide its service.
    let server = RelayServer::bind(&config, registry, broadcaster, cancel_token)
        .await
        .map_err(|e| {
            error!(error = %e, "Cannot bind listening endpoint");
            anyhow::anyhow!(e)
        })?;

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("tcr daemon stopped");
    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
