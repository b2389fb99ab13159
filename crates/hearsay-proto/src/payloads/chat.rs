//! Chat and presence payload types.
//!
//! Chat content is opaque to the relay: ciphertext and nonce travel
//! through untouched, and the relay only adds sender identity and a
//! delivery timestamp.

use serde::{Deserialize, Serialize};

/// Size of the client-generated message correlation id.
pub const MESSAGE_ID_SIZE: usize = 16;

/// Encrypted chat envelope from a sender.
///
/// With `target_member_id` set the envelope goes to that one member;
/// without it the relay broadcasts to every other room member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSend {
    /// AEAD ciphertext including the authentication tag.
    pub ciphertext: Vec<u8>,
    /// 24-byte nonce, fresh random per encryption.
    pub nonce: [u8; 24],
    /// Client-generated id for deduplication/correlation. A logical
    /// message fanned out as several per-peer envelopes shares one id.
    pub message_id: [u8; MESSAGE_ID_SIZE],
    /// Optional direct-message target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_member_id: Option<u64>,
}

/// Encrypted chat envelope as delivered to a recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDeliver {
    /// Sender's room-scoped member id.
    pub sender_member_id: u64,
    /// Sender's display name at delivery time.
    pub sender_display_name: String,
    /// AEAD ciphertext, passed through unmodified.
    pub ciphertext: Vec<u8>,
    /// Nonce, passed through unmodified.
    pub nonce: [u8; 24],
    /// Client-generated correlation id, passed through unmodified.
    pub message_id: [u8; MESSAGE_ID_SIZE],
    /// Relay-assigned wall-clock milliseconds. Informational only —
    /// never an ordering guarantee across skewed client clocks.
    pub server_timestamp_ms: u64,
}

/// Typing indicator from a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingSet {
    /// Whether the sender is currently typing.
    pub is_typing: bool,
}

/// Typing indicator broadcast to the rest of the room. Advisory; no
/// delivery guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingUpdate {
    /// The typing member's id.
    pub member_id: u64,
    /// The typing member's display name.
    pub display_name: String,
    /// Whether that member is currently typing.
    pub is_typing: bool,
}
