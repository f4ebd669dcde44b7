//! Framing parameters of the chunk-is-message protocol.
//!
//! There is no length prefix and no terminator: each socket read/write
//! call boundary is treated as one message. A message split across two
//! reads, or two messages coalesced into one, are both possible and both
//! tolerated; the protocol deliberately does not guard against them.

/// Maximum size of one wire chunk in bytes.
///
/// Protocol parameter: peers that want bit-for-bit interoperability must
/// read and write with exactly this bound.
pub const MAX_CHUNK_SIZE: usize = 1024;

/// Default TCP port the relay listens on.
pub const DEFAULT_PORT: u16 = 9000;
