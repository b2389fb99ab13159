//! Relay router: resolves senders and recipients for fan-out.
//!
//! Pure functions over the registry; no state of their own. Every
//! message class — chat, typing, call start/signal/end — goes through
//! the same two resolvers, so the addressing semantics and the
//! disconnect races are handled exactly once:
//!
//! - a sender with no room membership resolves to `None` (a frame racing
//!   its own disconnect; expected, silently dropped)
//! - a direct target that is gone resolves to an empty recipient list
//!   (same race from the other side; same silence)

use crate::registry::RoomRegistry;

/// A resolved route: who is sending, and which sessions receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTargets {
    /// Sender's room-scoped member id.
    pub sender_member_id: u64,
    /// Sender's display name at resolution time.
    pub sender_display_name: String,
    /// Recipient sessions, ordered by member id. May be empty (solo
    /// room, or a direct target that already left).
    pub sessions: Vec<u64>,
}

/// Resolve a broadcast from `sender_session` to every other member of
/// its room.
///
/// `None` if the sender is not currently a room member.
#[must_use]
pub fn broadcast_from<I: Copy>(
    registry: &RoomRegistry<I>,
    sender_session: u64,
) -> Option<RouteTargets> {
    let sender = registry.member_of(sender_session)?;
    let room_id = registry.room_of(sender_session)?;

    let sessions = registry
        .members_of(room_id)
        .into_iter()
        .filter(|m| m.session_id != sender_session)
        .map(|m| m.session_id)
        .collect();

    Some(RouteTargets {
        sender_member_id: sender.member_id,
        sender_display_name: sender.display_name.clone(),
        sessions,
    })
}

/// Resolve a direct message from `sender_session` to one member of its
/// room.
///
/// `None` if the sender is not currently a room member; an empty
/// session list if the target member is gone.
#[must_use]
pub fn direct_from<I: Copy>(
    registry: &RoomRegistry<I>,
    sender_session: u64,
    target_member_id: u64,
) -> Option<RouteTargets> {
    let sender = registry.member_of(sender_session)?;
    let room_id = registry.room_of(sender_session)?;

    let sessions = registry
        .session_for_member(room_id, target_member_id)
        .into_iter()
        .collect();

    Some(RouteTargets {
        sender_member_id: sender.member_id,
        sender_display_name: sender.display_name.clone(),
        sessions,
    })
}
