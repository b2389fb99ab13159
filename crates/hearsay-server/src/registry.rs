//! Room registry: membership state for every live room.
//!
//! Rooms are created lazily on the first join to an unknown id and
//! removed eagerly the instant their member count reaches zero (the
//! sweeper is a backstop, not the primary reclamation path). The
//! registry keeps a reverse session→room index, so a connection belongs
//! to at most one room at a time by construction — `join` tears down any
//! prior membership first and reports it.
//!
//! Member ids come from a per-room monotonic counter and are never
//! reused for the life of the room, even across rapid leave/rejoin by
//! the same connection.

use std::{collections::HashMap, time::Duration};

/// One member's server-side record.
///
/// The public key is opaque here: the relay stores and forwards it, but
/// never parses or validates it — key handling is exclusively a client
/// concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRecord {
    /// Room-scoped member id.
    pub member_id: u64,
    /// Transport session this member is reachable on.
    pub session_id: u64,
    /// Opaque public key bytes, passed through unmodified.
    pub public_key: Vec<u8>,
    /// Display name (server default when the client supplied none).
    pub display_name: String,
}

/// A membership that ended — by leave, disconnect, or displacement.
#[derive(Debug, Clone)]
pub struct Departure {
    /// Room the member left.
    pub room_id: String,
    /// The departed member's record.
    pub member: MemberRecord,
    /// Sessions of the members still in the room (empty if the room was
    /// destroyed by this departure).
    pub remaining_sessions: Vec<u64>,
}

/// Result of a successful join.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// The id minted for the joiner.
    pub member_id: u64,
    /// Snapshot of all other members, ordered by member id.
    pub existing: Vec<MemberRecord>,
    /// A prior membership of the same session that was torn down first.
    pub displaced: Option<Departure>,
}

/// Per-room state.
#[derive(Debug)]
struct Room<I> {
    created_at: I,
    next_member_id: u64,
    /// Session id → member record.
    members: HashMap<u64, MemberRecord>,
}

/// In-memory mapping from room id to member set.
///
/// Generic over `I` (instant type) to support virtual time in tests.
/// All mutation funnels through [`join`](Self::join),
/// [`leave`](Self::leave), and [`sweep`](Self::sweep); the owner is
/// responsible for serializing access (the server driver holds the
/// registry behind its single lock).
#[derive(Debug, Default)]
pub struct RoomRegistry<I = std::time::Instant> {
    rooms: HashMap<String, Room<I>>,
    /// Session id → room id reverse index.
    session_rooms: HashMap<u64, String>,
}

impl<I: Copy> RoomRegistry<I> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { rooms: HashMap::new(), session_rooms: HashMap::new() }
    }

    /// Register `session_id` as a member of `room_id`, creating the
    /// room if it does not exist.
    ///
    /// Any prior membership of the same session is removed first and
    /// reported via [`JoinOutcome::displaced`] so the caller can notify
    /// the old room.
    pub fn join(
        &mut self,
        room_id: &str,
        session_id: u64,
        public_key: Vec<u8>,
        display_name: Option<String>,
        now: I,
    ) -> JoinOutcome {
        // A connection belongs to at most one room at a time
        let displaced = self.leave(session_id);

        let room = self.rooms.entry(room_id.to_string()).or_insert_with(|| Room {
            created_at: now,
            next_member_id: 1,
            members: HashMap::new(),
        });

        let member_id = room.next_member_id;
        room.next_member_id += 1;

        let mut existing: Vec<MemberRecord> = room.members.values().cloned().collect();
        existing.sort_by_key(|m| m.member_id);

        let display_name = display_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("guest-{member_id}"));

        room.members.insert(session_id, MemberRecord {
            member_id,
            session_id,
            public_key,
            display_name,
        });
        self.session_rooms.insert(session_id, room_id.to_string());

        JoinOutcome { member_id, existing, displaced }
    }

    /// Remove `session_id` from whatever room it is in.
    ///
    /// No-op (returns `None`) if the session is not a member of any
    /// room. Explicit leave and transport disconnect both land here —
    /// one code path for both.
    pub fn leave(&mut self, session_id: u64) -> Option<Departure> {
        let room_id = self.session_rooms.remove(&session_id)?;
        let room = self.rooms.get_mut(&room_id)?;
        let member = room.members.remove(&session_id)?;

        let mut remaining_sessions: Vec<u64> = room.members.keys().copied().collect();
        remaining_sessions.sort_unstable();

        // Eager reclamation: an empty room does not exist
        if room.members.is_empty() {
            self.rooms.remove(&room_id);
        }

        Some(Departure { room_id, member, remaining_sessions })
    }

    /// The room a session is currently a member of.
    #[must_use]
    pub fn room_of(&self, session_id: u64) -> Option<&str> {
        self.session_rooms.get(&session_id).map(String::as_str)
    }

    /// The member record behind a session.
    #[must_use]
    pub fn member_of(&self, session_id: u64) -> Option<&MemberRecord> {
        let room_id = self.session_rooms.get(&session_id)?;
        self.rooms.get(room_id)?.members.get(&session_id)
    }

    /// Snapshot of a room's members, ordered by member id.
    #[must_use]
    pub fn members_of(&self, room_id: &str) -> Vec<&MemberRecord> {
        let mut members: Vec<&MemberRecord> = self
            .rooms
            .get(room_id)
            .map(|room| room.members.values().collect())
            .unwrap_or_default();
        members.sort_by_key(|m| m.member_id);
        members
    }

    /// Resolve a member id within a room to its transport session.
    #[must_use]
    pub fn session_for_member(&self, room_id: &str, member_id: u64) -> Option<u64> {
        self.rooms
            .get(room_id)?
            .members
            .values()
            .find(|m| m.member_id == member_id)
            .map(|m| m.session_id)
    }

    /// Whether a room currently exists.
    #[must_use]
    pub fn has_room(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Number of live rooms.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of members in a room (0 if the room does not exist).
    #[must_use]
    pub fn member_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, |room| room.members.len())
    }
}

impl<I> RoomRegistry<I>
where
    I: Copy + std::ops::Sub<Output = Duration>,
{
    /// Remove rooms that are empty and older than `retention`.
    ///
    /// Backstop for the eager reclamation in [`Self::leave`]: with that
    /// rule intact this removes nothing, but it bounds memory growth if
    /// reclamation is ever deferred. Returns the number of rooms
    /// removed.
    pub fn sweep(&mut self, now: I, retention: Duration) -> usize {
        let before = self.rooms.len();
        self.rooms
            .retain(|_, room| !(room.members.is_empty() && now - room.created_at >= retention));
        before - self.rooms.len()
    }
}
