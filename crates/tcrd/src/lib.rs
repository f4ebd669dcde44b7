//! tcr daemon - concurrent TCP chat relay
//!
//! This crate provides the core infrastructure for the tcrd daemon:
//! - `registry` - peer registry actor, the single owner of shared state
//! - `broadcast` - best-effort fan-out of messages and notices
//! - `chatlog` - append-only chat event log
//! - `server` - TCP listener and per-connection handlers
//! - `config` - daemon configuration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       tcrd daemon                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐    │
//! │  │   RelayServer   │────▶│       RegistryActor         │    │
//! │  │ (TcpListener)   │     │   (peer table owner)        │    │
//! │  └────────┬────────┘     └──────────────┬──────────────┘    │
//! │           │ one task per                │ snapshots         │
//! │           │ connection                  ▼                   │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐    │
//! │  │ConnectionHandler│────▶│        Broadcaster          │    │
//! │  │  (name, relay)  │     │  (fan-out + chat log)       │    │
//! │  └─────────────────┘     └─────────────────────────────┘    │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod broadcast;
pub mod chatlog;
pub mod config;
pub mod registry;
pub mod server;
