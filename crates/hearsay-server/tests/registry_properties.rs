//! Property-based tests for the room registry.
//!
//! These verify invariants that must hold for all join/leave
//! interleavings, not just the scripted sequences in the behavior
//! tests.

use std::collections::{HashMap, HashSet};

use hearsay_server::RoomRegistry;
use proptest::prelude::*;

/// A scripted registry operation.
#[derive(Debug, Clone)]
enum Op {
    Join { room: u8, session: u64 },
    Leave { session: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..4, 0u64..16).prop_map(|(room, session)| Op::Join { room, session }),
        (0u64..16).prop_map(|session| Op::Leave { session }),
    ]
}

fn room_name(room: u8) -> String {
    format!("room-{room}")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: a session is a member of at most one room, no matter
    /// the interleaving of joins and leaves.
    #[test]
    fn prop_single_membership(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let mut registry: RoomRegistry<u64> = RoomRegistry::new();

        for op in ops {
            match op {
                Op::Join { room, session } => {
                    registry.join(&room_name(room), session, vec![1; 32], None, 0);
                },
                Op::Leave { session } => {
                    registry.leave(session);
                },
            }
        }

        let mut seen_sessions: HashMap<u64, String> = HashMap::new();
        for room in 0u8..4 {
            for member in registry.members_of(&room_name(room)) {
                let prior = seen_sessions.insert(member.session_id, room_name(room));
                prop_assert!(
                    prior.is_none(),
                    "session {} is in two rooms at once",
                    member.session_id
                );
            }
        }
    }

    /// Property: no room ever holds a duplicate member id, and ids are
    /// never reused while the room stays alive.
    #[test]
    fn prop_member_ids_unique_per_room_lifetime(
        ops in prop::collection::vec(op_strategy(), 0..64),
    ) {
        let mut registry: RoomRegistry<u64> = RoomRegistry::new();
        // Minted ids per room, reset when the room is destroyed
        let mut minted: HashMap<String, HashSet<u64>> = HashMap::new();

        for op in ops {
            match op {
                Op::Join { room, session } => {
                    let room = room_name(room);
                    let outcome = registry.join(&room, session, vec![1; 32], None, 0);

                    // A displacement that emptied its room ended that
                    // room's lifetime (even if this same join recreated
                    // the id immediately)
                    if let Some(departure) = &outcome.displaced {
                        if departure.remaining_sessions.is_empty() {
                            minted.remove(&departure.room_id);
                        }
                    }

                    let ids = minted.entry(room).or_default();
                    prop_assert!(
                        ids.insert(outcome.member_id),
                        "member id {} reused within a room lifetime",
                        outcome.member_id
                    );
                },
                Op::Leave { session } => {
                    if let Some(departure) = registry.leave(session) {
                        if departure.remaining_sessions.is_empty() {
                            minted.remove(&departure.room_id);
                        }
                    }
                },
            }
        }
    }

    /// Property: rooms exist exactly while they have members.
    #[test]
    fn prop_rooms_exist_iff_occupied(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let mut registry: RoomRegistry<u64> = RoomRegistry::new();

        for op in ops {
            match op {
                Op::Join { room, session } => {
                    registry.join(&room_name(room), session, vec![1; 32], None, 0);
                },
                Op::Leave { session } => {
                    registry.leave(session);
                },
            }

            for room in 0u8..4 {
                let name = room_name(room);
                prop_assert_eq!(registry.has_room(&name), registry.member_count(&name) > 0);
            }
        }
    }

    /// Property: the roster snapshot returned by join never contains
    /// the joiner and matches the registry state.
    #[test]
    fn prop_join_snapshot_excludes_joiner(sessions in prop::collection::hash_set(0u64..64, 1..16)) {
        let mut registry: RoomRegistry<u64> = RoomRegistry::new();

        let mut joined = 0usize;
        for session in sessions {
            let outcome = registry.join("shared", session, vec![1; 32], None, 0);

            prop_assert_eq!(outcome.existing.len(), joined);
            prop_assert!(outcome.existing.iter().all(|m| m.session_id != session));
            joined += 1;
        }
    }
}
