//! Frame type combining header and raw payload bytes.
//!
//! A `Frame` is the transport-layer unit: 16-byte binary header plus
//! already-encoded payload bytes. The relay routes frames by opcode and
//! session state without deserializing payloads it only forwards; for
//! typed access see [`crate::Payload`].

use bytes::{BufMut, Bytes};

use crate::{
    errors::{ProtocolError, Result},
    header::FrameHeader,
};

/// Complete protocol frame.
///
/// Wire layout: `[FrameHeader: 16 bytes] + [payload: variable]`.
///
/// # Invariants
///
/// - `payload.len()` always matches `header.payload_size()`; enforced by
///   [`Frame::new`] and verified by [`Frame::decode`].
/// - `payload.len()` never exceeds [`FrameHeader::MAX_PAYLOAD_SIZE`];
///   enforced at [`Frame::encode`] and on decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header (16 bytes).
    pub header: FrameHeader,
    /// Raw payload bytes (already CBOR-encoded).
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame, stamping the header with the payload length.
    ///
    /// Setting the size here makes a header/payload length mismatch
    /// impossible to construct.
    #[must_use]
    pub fn new(mut header: FrameHeader, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();

        // Bytes is bounded by isize::MAX, far below u32::MAX after the
        // protocol size limit; truncation cannot occur for valid frames
        header.payload_size = (payload.len() as u32).to_be_bytes();

        Self { header, payload }
    }

    /// Encode the frame into `dst`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if the payload exceeds
    ///   [`FrameHeader::MAX_PAYLOAD_SIZE`]
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.payload.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.payload);

        Ok(())
    }

    /// Decode a frame from its wire form.
    ///
    /// # Errors
    ///
    /// - any header validation error from [`FrameHeader::from_bytes`]
    /// - `ProtocolError::FrameTooShort` if the buffer holds fewer bytes
    ///   than the header claims
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = *FrameHeader::from_bytes(bytes)?;
        let payload_size = header.payload_size() as usize;
        let total = FrameHeader::SIZE + payload_size;

        if bytes.len() < total {
            return Err(ProtocolError::FrameTooShort { expected: total, actual: bytes.len() });
        }

        let payload = Bytes::copy_from_slice(&bytes[FrameHeader::SIZE..total]);
        Ok(Self { header, payload })
    }

    /// Encode into a fresh `Vec<u8>`.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(FrameHeader::SIZE + self.payload.len());
        self.encode(&mut buf)?;
        Ok(buf)
    }
}
