//! Client events and actions.

use hearsay_proto::{Frame, payloads::call::MediaType, payloads::chat::MESSAGE_ID_SIZE};

/// One other room member as tracked by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Room-scoped member id.
    pub member_id: u64,
    /// The peer's public key, as relayed (opaque until used).
    pub public_key: Vec<u8>,
    /// The peer's display name.
    pub display_name: String,
}

/// Events the caller feeds into the client.
///
/// The caller is responsible for receiving frames from the network,
/// driving time forward via ticks, and forwarding application intents.
///
/// Generic over `I` (instant type) to support both production time and
/// virtual time in tests.
#[derive(Debug, Clone)]
pub enum ClientEvent<I = std::time::Instant> {
    /// Frame received from the relay.
    FrameReceived(Frame),

    /// Time tick for join-timeout processing.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// The transport dropped; all key material must be discarded.
    Disconnected,

    /// Join a room (created by the relay if unknown).
    JoinRoom {
        /// Room id to join.
        room_id: String,
        /// Optional display name.
        display_name: Option<String>,
    },

    /// Leave the current room.
    LeaveRoom,

    /// Send an encrypted chat message.
    SendChat {
        /// Message plaintext.
        plaintext: Vec<u8>,
        /// Direct-message target, or `None` for the whole room.
        target_member_id: Option<u64>,
    },

    /// Update our typing state.
    SetTyping {
        /// Whether we are typing.
        is_typing: bool,
    },

    /// Start a call in the current room.
    StartCall {
        /// Requested media type.
        media: MediaType,
    },

    /// Send call-setup signaling to one member.
    SendCallSignal {
        /// Target member.
        target_member_id: u64,
        /// Opaque signaling bytes.
        signal: Vec<u8>,
    },

    /// End the current call.
    EndCall,
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Send a frame to the relay.
    Send(Frame),

    /// We are in the room; the roster snapshot is every other member.
    Joined {
        /// Room we joined.
        room_id: String,
        /// Our assigned member id.
        member_id: u64,
        /// All other current members.
        peers: Vec<Peer>,
    },

    /// The join did not complete (timeout or relay rejection).
    JoinFailed {
        /// Why the join failed.
        reason: String,
    },

    /// We left the room (or were disconnected); key material is gone.
    Left {
        /// Room we left.
        room_id: String,
    },

    /// Another member joined our room.
    PeerJoined(Peer),

    /// A member left our room.
    PeerLeft {
        /// The departed member's id.
        member_id: u64,
        /// The departed member's display name.
        display_name: String,
    },

    /// A chat message decrypted successfully.
    MessageReceived {
        /// Sender's member id.
        sender_member_id: u64,
        /// Sender's display name.
        sender_display_name: String,
        /// Decrypted plaintext.
        plaintext: Vec<u8>,
        /// Client-generated correlation id.
        message_id: [u8; MESSAGE_ID_SIZE],
        /// Relay-assigned delivery timestamp (informational).
        server_timestamp_ms: u64,
    },

    /// A chat message failed authentication — tampered, corrupted, or
    /// wrong key. Shown instead of the message, never silently dropped.
    MessageUndeliverable {
        /// Sender's member id.
        sender_member_id: u64,
        /// What went wrong.
        reason: String,
    },

    /// Encrypting for one recipient failed; nothing was sent to them.
    SendFailed {
        /// Recipient the message could not be encrypted for.
        target_member_id: u64,
        /// What went wrong.
        reason: String,
    },

    /// A member's typing state changed.
    TypingChanged {
        /// The typing member.
        member_id: u64,
        /// Their display name.
        display_name: String,
        /// Whether they are typing.
        is_typing: bool,
    },

    /// A member started a call.
    CallIncoming {
        /// The calling member.
        sender_member_id: u64,
        /// Their display name.
        sender_display_name: String,
        /// Requested media type.
        media: MediaType,
    },

    /// Call-setup signaling arrived for us.
    CallSignal {
        /// The member the signal came from.
        sender_member_id: u64,
        /// Opaque signaling bytes.
        signal: Vec<u8>,
    },

    /// The call ended.
    CallEnded,

    /// Diagnostic message for the caller's logger.
    Log {
        /// Log message.
        message: String,
    },
}
