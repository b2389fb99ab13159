//! CBOR-encoded protocol messages.
//!
//! Frame headers are raw binary; payloads are CBOR for type safety and
//! forward compatibility. The `Payload` enum covers every message type:
//! room membership, chat/presence, call signaling, and errors.
//!
//! # Invariants
//!
//! Each payload variant maps to exactly one opcode. Only the inner
//! struct is serialized — never a variant tag — because the header's
//! opcode already identifies the payload type, which makes mismatched
//! opcode/payload pairs impossible to construct on the wire. Round-trip
//! encoding must produce identical values.

pub mod call;
pub mod chat;
pub mod room;

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{ProtocolError, Result},
    frame::Frame,
    header::FrameHeader,
    opcode::Opcode,
};

/// All possible frame payloads.
///
/// The payload type is determined by the `Opcode` in the frame header.
/// `Leave`, `CallEnd`, and `CallEnded` carry no data and encode to zero
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    // Client → server
    /// Join a room.
    Join(room::JoinRequest),
    /// Leave the current room.
    Leave,
    /// Encrypted chat envelope.
    ChatSend(chat::ChatSend),
    /// Typing indicator.
    Typing(chat::TypingSet),
    /// Start a call.
    CallStart(call::CallStart),
    /// Call signaling for one member.
    CallSignal(call::CallSignal),
    /// End the call.
    CallEnd,

    // Server → client
    /// Join acknowledgement with roster snapshot.
    Joined(room::JoinAck),
    /// A member joined.
    MemberJoined(room::MemberJoined),
    /// A member left.
    MemberLeft(room::MemberLeft),
    /// Chat envelope delivery.
    ChatDeliver(chat::ChatDeliver),
    /// Typing state change.
    TypingUpdate(chat::TypingUpdate),
    /// A call started.
    CallIncoming(call::CallIncoming),
    /// Call signaling delivery.
    CallSignalDeliver(call::CallSignalDeliver),
    /// The call ended.
    CallEnded,

    /// Error response.
    Error(ErrorPayload),
}

/// Error payload for error frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error code identifying the type of error.
    pub code: u16,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorPayload {
    /// Request was structurally valid but semantically rejected
    /// (missing/empty required field).
    pub const VALIDATION: u16 = 0x0001;
    /// Payload bytes did not decode for the claimed opcode.
    pub const INVALID_PAYLOAD: u16 = 0x0002;
    /// Frame was rejected (unexpected opcode, connection limit, ...).
    pub const FRAME_REJECTED: u16 = 0x0003;

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self { code: Self::VALIDATION, message: msg.into() }
    }

    /// Create an invalid payload error.
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self { code: Self::INVALID_PAYLOAD, message: msg.into() }
    }

    /// Create a frame rejection error.
    pub fn frame_rejected(msg: impl Into<String>) -> Self {
        Self { code: Self::FRAME_REJECTED, message: msg.into() }
    }
}

impl Payload {
    /// Opcode corresponding to this payload type.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Join(_) => Opcode::Join,
            Self::Leave => Opcode::Leave,
            Self::ChatSend(_) => Opcode::ChatSend,
            Self::Typing(_) => Opcode::Typing,
            Self::CallStart(_) => Opcode::CallStart,
            Self::CallSignal(_) => Opcode::CallSignal,
            Self::CallEnd => Opcode::CallEnd,
            Self::Joined(_) => Opcode::Joined,
            Self::MemberJoined(_) => Opcode::MemberJoined,
            Self::MemberLeft(_) => Opcode::MemberLeft,
            Self::ChatDeliver(_) => Opcode::ChatDeliver,
            Self::TypingUpdate(_) => Opcode::TypingUpdate,
            Self::CallIncoming(_) => Opcode::CallIncoming,
            Self::CallSignalDeliver(_) => Opcode::CallSignalDeliver,
            Self::CallEnded => Opcode::CallEnded,
            Self::Error(_) => Opcode::Error,
        }
    }

    /// Encode the payload body into `dst` (no variant tag).
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let mut writer = dst.writer();

        match self {
            Self::Join(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::ChatSend(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Typing(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::CallStart(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::CallSignal(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Joined(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::MemberJoined(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::MemberLeft(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::ChatDeliver(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::TypingUpdate(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::CallIncoming(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::CallSignalDeliver(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Error(inner) => ciborium::ser::into_writer(inner, &mut writer),
            // Zero-byte payloads
            Self::Leave | Self::CallEnd | Self::CallEnded => Ok(()),
        }
        .map_err(|e| ProtocolError::CborEncode(e.to_string()))
    }

    /// Decode a payload body for the given opcode.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborDecode` if the bytes do not decode for the
    ///   opcode's payload type
    pub fn decode(opcode: Opcode, bytes: &[u8]) -> Result<Self> {
        fn read<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
            ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::CborDecode(e.to_string()))
        }

        match opcode {
            Opcode::Join => Ok(Self::Join(read(bytes)?)),
            Opcode::Leave => Ok(Self::Leave),
            Opcode::ChatSend => Ok(Self::ChatSend(read(bytes)?)),
            Opcode::Typing => Ok(Self::Typing(read(bytes)?)),
            Opcode::CallStart => Ok(Self::CallStart(read(bytes)?)),
            Opcode::CallSignal => Ok(Self::CallSignal(read(bytes)?)),
            Opcode::CallEnd => Ok(Self::CallEnd),
            Opcode::Joined => Ok(Self::Joined(read(bytes)?)),
            Opcode::MemberJoined => Ok(Self::MemberJoined(read(bytes)?)),
            Opcode::MemberLeft => Ok(Self::MemberLeft(read(bytes)?)),
            Opcode::ChatDeliver => Ok(Self::ChatDeliver(read(bytes)?)),
            Opcode::TypingUpdate => Ok(Self::TypingUpdate(read(bytes)?)),
            Opcode::CallIncoming => Ok(Self::CallIncoming(read(bytes)?)),
            Opcode::CallSignalDeliver => Ok(Self::CallSignalDeliver(read(bytes)?)),
            Opcode::CallEnded => Ok(Self::CallEnded),
            Opcode::Error => Ok(Self::Error(read(bytes)?)),
        }
    }

    /// Encode this payload into a complete frame.
    pub fn into_frame(self) -> Result<Frame> {
        let header = FrameHeader::new(self.opcode());
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        Ok(Frame::new(header, buf))
    }

    /// Decode the typed payload of a frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownOpcode` if the header opcode is not
    ///   defined (version-confusion defense: unknown frames are rejected,
    ///   never silently ignored)
    /// - `ProtocolError::CborDecode` on malformed payload bytes
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let opcode = frame
            .header
            .opcode()
            .ok_or(ProtocolError::UnknownOpcode(frame.header.opcode_raw()))?;

        Self::decode(opcode, &frame.payload)
    }
}
