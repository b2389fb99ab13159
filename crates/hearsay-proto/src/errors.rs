//! Protocol error types.

use crate::opcode::Opcode;

/// Convenience result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors from frame and payload encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Buffer is shorter than the data it claims to contain.
    #[error("frame too short: expected {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Bytes required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// Header magic number does not identify a Hearsay frame.
    #[error("invalid magic number")]
    InvalidMagic,

    /// Protocol version is not supported by this build.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Payload exceeds the maximum allowed size.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Claimed or actual payload size.
        size: usize,
        /// Maximum permitted size.
        max: usize,
    },

    /// Opcode value is not defined by this protocol version.
    #[error("unknown opcode: {0:#06x}")]
    UnknownOpcode(u16),

    /// Reserved header bytes carried nonzero values.
    ///
    /// Version 1 keeps them zero so future versions can assign meaning
    /// without ambiguity about what old peers sent.
    #[error("reserved header bytes set")]
    ReservedBytesSet,

    /// CBOR serialization failed.
    #[error("CBOR encode error: {0}")]
    CborEncode(String),

    /// CBOR deserialization failed.
    #[error("CBOR decode error: {0}")]
    CborDecode(String),

    /// Frame carried a different payload than the caller expected.
    #[error("unexpected payload for opcode {0:?}")]
    UnexpectedPayload(Opcode),
}
