//! Chat events and their wire representation.
//!
//! Everything the relay ever sends to a peer is one of three events:
//! a join notice, a leave notice, or a relayed message. `Display`
//! renders the exact line that goes on the wire, so the daemon's
//! broadcaster and the event log agree on the text by construction.

use std::fmt;

use crate::name::PeerName;

/// An event flowing through the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A peer completed the handshake and entered the chat.
    Join(PeerName),

    /// A peer's connection ended and it left the chat.
    Leave(PeerName),

    /// A peer sent a message to be relayed to everyone else.
    Message {
        /// Who sent it.
        from: PeerName,
        /// The text, relayed verbatim.
        text: String,
    },
}

impl ChatEvent {
    /// Returns true for join/leave life-cycle notices.
    ///
    /// Life-cycle notices and relayed messages are logged as distinct
    /// record kinds so message content stays separable from membership
    /// churn.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Join(_) | Self::Leave(_))
    }

    /// The peer the event originated from.
    pub fn origin(&self) -> &PeerName {
        match self {
            Self::Join(name) | Self::Leave(name) => name,
            Self::Message { from, .. } => from,
        }
    }
}

impl fmt::Display for ChatEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Join(name) => write!(f, "** {name} is joining the chat **"),
            Self::Leave(name) => write!(f, "** {name} is leaving the chat **"),
            Self::Message { from, text } => write!(f, "[{from}] {text}"),
        }
    }
}
