//! Call signaling payload types.
//!
//! The relay delivers call-setup envelopes; the signaling content itself
//! (offers, answers, candidates) belongs to the media layer and is never
//! inspected here.

use serde::{Deserialize, Serialize};

/// Requested media type for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    /// Audio only.
    Audio,
    /// Audio and video.
    Video,
}

/// Start a call in the current room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStart {
    /// Media type the caller wants.
    pub media: MediaType,
}

/// Broadcast to the rest of the room when a member starts a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallIncoming {
    /// The calling member's id.
    pub sender_member_id: u64,
    /// The calling member's display name.
    pub sender_display_name: String,
    /// Media type of the call.
    pub media: MediaType,
}

/// Call-setup signaling envelope for one specific member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSignal {
    /// Member the signaling payload is for.
    pub target_member_id: u64,
    /// Opaque signaling bytes, owned by the call-setup layer.
    pub signal: Vec<u8>,
}

/// Call-setup signaling envelope delivered to its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSignalDeliver {
    /// Member the signaling payload came from.
    pub sender_member_id: u64,
    /// Opaque signaling bytes, passed through unmodified.
    pub signal: Vec<u8>,
}
