//! Room membership payload types.

use serde::{Deserialize, Serialize};

/// Join a room, creating it if the id is unknown to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Client-chosen room identifier. Opaque, case-sensitive, must be
    /// non-empty; entropy/format is deployment policy.
    pub room_id: String,

    /// The joiner's public key. Opaque to the relay — passed through to
    /// other members unmodified and never parsed server-side.
    pub public_key: Vec<u8>,

    /// Optional display name; the relay assigns a default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// One room member as seen in roster snapshots and join notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    /// Room-scoped member id, never reused for the life of the room.
    pub member_id: u64,
    /// The member's public key (opaque bytes).
    pub public_key: Vec<u8>,
    /// Display name (server default if the member supplied none).
    pub display_name: String,
}

/// Join acknowledgement sent to the joiner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinAck {
    /// The id assigned to the joiner.
    pub member_id: u64,
    /// Echo of the joined room id.
    pub room_id: String,
    /// Snapshot of all other current members.
    pub members: Vec<MemberInfo>,
}

/// Broadcast to existing members when someone joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberJoined {
    /// The new member's id.
    pub member_id: u64,
    /// The new member's public key (opaque bytes).
    pub public_key: Vec<u8>,
    /// The new member's display name.
    pub display_name: String,
}

/// Broadcast to remaining members when someone leaves or disconnects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberLeft {
    /// The departed member's id.
    pub member_id: u64,
    /// The departed member's display name.
    pub display_name: String,
}
