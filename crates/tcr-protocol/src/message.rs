//! Handshake reply grammar.
//!
//! After a client sends its candidate name, the server answers with
//! exactly one chunk: `OK` (optionally followed by free text) on
//! acceptance, or `ERROR: <reason>` on rejection. `Reply` is the typed
//! form of that chunk, used by the daemon to encode and by the client
//! to parse.

use tcr_core::NameError;
use thiserror::Error;

/// Literal prefix of an acceptance reply.
const OK_PREFIX: &str = "OK";

/// Literal prefix of a rejection reply.
const ERROR_PREFIX: &str = "ERROR: ";

/// The server's answer to a handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Name accepted; the client is registered.
    Ok {
        /// Optional free-form text following the `OK` literal.
        info: Option<String>,
    },

    /// Name rejected; the server closes right after sending this.
    Error {
        /// Human-readable rejection reason.
        reason: String,
    },
}

impl Reply {
    /// Creates a bare acceptance reply.
    pub fn ok() -> Self {
        Self::Ok { info: None }
    }

    /// Creates a rejection reply.
    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error {
            reason: reason.into(),
        }
    }

    /// Rejection reply for a candidate name that failed validation.
    ///
    /// The reason strings are wire protocol; existing clients match on
    /// them verbatim.
    pub fn reject_name(err: NameError) -> Self {
        match err {
            NameError::Blank => Self::error("Rejected - Name cannot be blank."),
            NameError::ContainsWhitespace => {
                Self::error("Rejected - Name cannot contain whitespace.")
            }
        }
    }

    /// Rejection reply for a name already held by a registered peer.
    pub fn reject_taken() -> Self {
        Self::error("Rejected - Name already in use.")
    }

    /// Renders the reply as its wire chunk.
    pub fn encode(&self) -> String {
        match self {
            Self::Ok { info: None } => OK_PREFIX.to_string(),
            Self::Ok { info: Some(text) } => format!("{OK_PREFIX} {text}"),
            Self::Error { reason } => format!("{ERROR_PREFIX}{reason}"),
        }
    }

    /// Parses a received chunk as a handshake reply.
    ///
    /// The chunk may carry trailing data coalesced onto an `OK` reply
    /// (the protocol has no framing); anything after the `OK` literal is
    /// surfaced as `info`.
    ///
    /// # Errors
    ///
    /// `ReplyParseError::Unrecognized` if the chunk starts with neither
    /// literal.
    pub fn parse(raw: &str) -> Result<Self, ReplyParseError> {
        if let Some(reason) = raw.strip_prefix(ERROR_PREFIX) {
            return Ok(Self::Error {
                reason: reason.trim_end().to_string(),
            });
        }

        if let Some(rest) = raw.strip_prefix(OK_PREFIX) {
            let info = rest.trim();
            return Ok(Self::Ok {
                info: (!info.is_empty()).then(|| info.to_string()),
            });
        }

        Err(ReplyParseError::Unrecognized(raw.to_string()))
    }

    /// Returns true for the acceptance variant.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// Errors from parsing a handshake reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyParseError {
    /// The chunk started with neither `OK` nor `ERROR: `.
    #[error("unrecognized handshake reply: {0:?}")]
    Unrecognized(String),
}
