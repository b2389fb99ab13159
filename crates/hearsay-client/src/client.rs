//! Client state machine.
//!
//! Phases: `Idle → Joining → InRoom → Idle`. The join handshake is the
//! one protocol operation with a timeout — the client arms a deadline
//! when it sends `Join` and treats silence past it as failure (the relay
//! never acks-then-drops; absence of `Joined` IS the failure signal).
//!
//! Group messages are individually encrypted: one targeted envelope per
//! roster member, all sharing one message id. Every recipient therefore
//! gets exactly the envelope they can authenticate, and an
//! authentication failure stays a meaningful tamper signal.

use std::{collections::BTreeMap, time::Duration};

use hearsay_core::Environment;
use hearsay_crypto::KEY_SIZE;
use hearsay_proto::{
    Payload,
    payloads::{call, chat, room},
};

use crate::{
    error::ClientError,
    event::{ClientAction, ClientEvent, Peer},
    session::SessionManager,
};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long to wait for the relay's `Joined` before giving up.
    pub join_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { join_timeout: Duration::from_secs(10) }
    }
}

/// Active room membership.
struct RoomView {
    room_id: String,
    member_id: u64,
    session: SessionManager,
    /// Other members, keyed by member id. BTreeMap keeps envelope
    /// fan-out order deterministic.
    peers: BTreeMap<u64, Peer>,
}

/// Where the client is in its lifecycle.
enum Phase<I> {
    /// No membership, no key material.
    Idle,
    /// `Join` sent, waiting for `Joined` until the deadline.
    Joining { room_id: String, started_at: I, session: SessionManager },
    /// Member of a room.
    InRoom(RoomView),
}

/// Action-based client for the Hearsay relay.
pub struct Client<E: Environment> {
    env: E,
    config: ClientConfig,
    phase: Phase<E::Instant>,
}

impl<E: Environment> Client<E> {
    /// Create an idle client.
    pub fn new(env: E, config: ClientConfig) -> Self {
        Self { env, config, phase: Phase::Idle }
    }

    /// Whether the client currently holds a room membership.
    #[must_use]
    pub fn is_in_room(&self) -> bool {
        matches!(self.phase, Phase::InRoom(_))
    }

    /// Our member id, if joined.
    #[must_use]
    pub fn member_id(&self) -> Option<u64> {
        match &self.phase {
            Phase::InRoom(view) => Some(view.member_id),
            _ => None,
        }
    }

    /// Safety number for one roster member, for out-of-band comparison.
    pub fn safety_number(&self, member_id: u64) -> Result<String, ClientError> {
        let Phase::InRoom(view) = &self.phase else {
            return Err(ClientError::NotInRoom);
        };
        let peer = view.peers.get(&member_id).ok_or(ClientError::NotInRoom)?;
        let peer_key = decode_peer_key(&peer.public_key).ok_or(ClientError::NotInRoom)?;
        Ok(view.session.safety_number(&peer_key)?)
    }

    /// Process one event and return the actions to execute.
    pub fn process_event(
        &mut self,
        event: ClientEvent<E::Instant>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::FrameReceived(frame) => Ok(self.handle_frame(&frame)),
            ClientEvent::Tick { now } => Ok(self.handle_tick(now)),
            ClientEvent::Disconnected => Ok(self.handle_disconnected()),
            ClientEvent::JoinRoom { room_id, display_name } => {
                self.handle_join(room_id, display_name)
            },
            ClientEvent::LeaveRoom => self.handle_leave(),
            ClientEvent::SendChat { plaintext, target_member_id } => {
                self.handle_send_chat(&plaintext, target_member_id)
            },
            ClientEvent::SetTyping { is_typing } => {
                self.send_in_room(Payload::Typing(chat::TypingSet { is_typing }))
            },
            ClientEvent::StartCall { media } => {
                self.send_in_room(Payload::CallStart(call::CallStart { media }))
            },
            ClientEvent::SendCallSignal { target_member_id, signal } => self.send_in_room(
                Payload::CallSignal(call::CallSignal { target_member_id, signal }),
            ),
            ClientEvent::EndCall => self.send_in_room(Payload::CallEnd),
        }
    }

    fn handle_join(
        &mut self,
        room_id: String,
        display_name: Option<String>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        if !matches!(self.phase, Phase::Idle) {
            return Err(ClientError::AlreadyInRoom);
        }

        // The one key-pair creation per logical session
        let session = SessionManager::new(self.env.random_array());
        let public_key = session.public_key()?.to_vec();

        let frame = Payload::Join(room::JoinRequest {
            room_id: room_id.clone(),
            public_key,
            display_name,
        })
        .into_frame()?;

        self.phase = Phase::Joining { room_id, started_at: self.env.now(), session };
        Ok(vec![ClientAction::Send(frame)])
    }

    fn handle_leave(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => Ok(vec![]),
            Phase::Joining { room_id, mut session, .. } => {
                session.clear();
                let frame = Payload::Leave.into_frame()?;
                Ok(vec![
                    ClientAction::Send(frame),
                    ClientAction::JoinFailed { reason: format!("join to {room_id} cancelled") },
                ])
            },
            Phase::InRoom(mut view) => {
                // Forward-secrecy boundary: nothing survives leaving
                view.session.clear();
                let frame = Payload::Leave.into_frame()?;
                Ok(vec![
                    ClientAction::Send(frame),
                    ClientAction::Left { room_id: view.room_id },
                ])
            },
        }
    }

    fn handle_disconnected(&mut self) -> Vec<ClientAction> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => vec![],
            Phase::Joining { room_id, mut session, .. } => {
                session.clear();
                vec![ClientAction::JoinFailed {
                    reason: format!("disconnected while joining {room_id}"),
                }]
            },
            Phase::InRoom(mut view) => {
                view.session.clear();
                vec![ClientAction::Left { room_id: view.room_id }]
            },
        }
    }

    fn handle_tick(&mut self, now: E::Instant) -> Vec<ClientAction> {
        let Phase::Joining { started_at, .. } = &self.phase else {
            return vec![];
        };

        if now - *started_at < self.config.join_timeout {
            return vec![];
        }

        let Phase::Joining { room_id, mut session, .. } =
            std::mem::replace(&mut self.phase, Phase::Idle)
        else {
            return vec![];
        };
        session.clear();

        vec![ClientAction::JoinFailed { reason: format!("join to {room_id} timed out") }]
    }

    fn handle_frame(&mut self, frame: &hearsay_proto::Frame) -> Vec<ClientAction> {
        let payload = match Payload::from_frame(frame) {
            Ok(payload) => payload,
            Err(e) => {
                return vec![ClientAction::Log { message: format!("dropped bad frame: {e}") }];
            },
        };

        match payload {
            Payload::Joined(ack) => self.handle_joined(ack),
            Payload::MemberJoined(joined) => self.handle_member_joined(joined),
            Payload::MemberLeft(left) => self.handle_member_left(&left),
            Payload::ChatDeliver(deliver) => self.handle_chat_deliver(deliver),
            Payload::TypingUpdate(update) => self.in_room_action(ClientAction::TypingChanged {
                member_id: update.member_id,
                display_name: update.display_name,
                is_typing: update.is_typing,
            }),
            Payload::CallIncoming(incoming) => self.in_room_action(ClientAction::CallIncoming {
                sender_member_id: incoming.sender_member_id,
                sender_display_name: incoming.sender_display_name,
                media: incoming.media,
            }),
            Payload::CallSignalDeliver(signal) => self.in_room_action(ClientAction::CallSignal {
                sender_member_id: signal.sender_member_id,
                signal: signal.signal,
            }),
            Payload::CallEnded => self.in_room_action(ClientAction::CallEnded),
            Payload::Error(error) => self.handle_error_frame(error),
            other => vec![ClientAction::Log {
                message: format!("unexpected frame from relay: {:?}", other.opcode()),
            }],
        }
    }

    fn handle_joined(&mut self, ack: room::JoinAck) -> Vec<ClientAction> {
        match &self.phase {
            Phase::Joining { room_id, .. } if *room_id == ack.room_id => {},
            _ => {
                return vec![ClientAction::Log {
                    message: format!("unexpected Joined for room {}", ack.room_id),
                }];
            },
        }

        let Phase::Joining { room_id, session, .. } =
            std::mem::replace(&mut self.phase, Phase::Idle)
        else {
            return vec![];
        };

        let peers: BTreeMap<u64, Peer> = ack
            .members
            .into_iter()
            .map(|m| {
                (m.member_id, Peer {
                    member_id: m.member_id,
                    public_key: m.public_key,
                    display_name: m.display_name,
                })
            })
            .collect();

        let roster: Vec<Peer> = peers.values().cloned().collect();
        self.phase = Phase::InRoom(RoomView {
            room_id: room_id.clone(),
            member_id: ack.member_id,
            session,
            peers,
        });

        vec![ClientAction::Joined { room_id, member_id: ack.member_id, peers: roster }]
    }

    fn handle_member_joined(&mut self, joined: room::MemberJoined) -> Vec<ClientAction> {
        let Phase::InRoom(view) = &mut self.phase else {
            return vec![];
        };

        let peer = Peer {
            member_id: joined.member_id,
            public_key: joined.public_key,
            display_name: joined.display_name,
        };
        view.peers.insert(peer.member_id, peer.clone());

        vec![ClientAction::PeerJoined(peer)]
    }

    fn handle_member_left(&mut self, left: &room::MemberLeft) -> Vec<ClientAction> {
        let Phase::InRoom(view) = &mut self.phase else {
            return vec![];
        };

        view.peers.remove(&left.member_id);
        vec![ClientAction::PeerLeft {
            member_id: left.member_id,
            display_name: left.display_name.clone(),
        }]
    }

    fn handle_chat_deliver(&mut self, deliver: chat::ChatDeliver) -> Vec<ClientAction> {
        let Phase::InRoom(view) = &mut self.phase else {
            return vec![];
        };

        let undeliverable = |reason: String| ClientAction::MessageUndeliverable {
            sender_member_id: deliver.sender_member_id,
            reason,
        };

        let Some(peer) = view.peers.get(&deliver.sender_member_id) else {
            return vec![undeliverable("sender is not a known member".to_string())];
        };

        let Some(peer_key) = decode_peer_key(&peer.public_key) else {
            return vec![undeliverable("sender public key is malformed".to_string())];
        };

        match view.session.decrypt(&peer_key, &deliver.nonce, &deliver.ciphertext) {
            Ok(plaintext) => vec![ClientAction::MessageReceived {
                sender_member_id: deliver.sender_member_id,
                sender_display_name: deliver.sender_display_name,
                plaintext,
                message_id: deliver.message_id,
                server_timestamp_ms: deliver.server_timestamp_ms,
            }],
            Err(e) => vec![undeliverable(e.to_string())],
        }
    }

    fn handle_error_frame(&mut self, error: hearsay_proto::ErrorPayload) -> Vec<ClientAction> {
        if matches!(self.phase, Phase::Joining { .. }) {
            let Phase::Joining { mut session, .. } =
                std::mem::replace(&mut self.phase, Phase::Idle)
            else {
                return vec![];
            };
            session.clear();
            return vec![ClientAction::JoinFailed { reason: error.message }];
        }

        vec![ClientAction::Log { message: format!("relay error {}: {}", error.code, error.message) }]
    }

    fn handle_send_chat(
        &mut self,
        plaintext: &[u8],
        target_member_id: Option<u64>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let Phase::InRoom(view) = &mut self.phase else {
            return Err(ClientError::NotInRoom);
        };

        // One logical message, one correlation id across the fan-out
        let message_id: [u8; chat::MESSAGE_ID_SIZE] = self.env.random_array();

        let targets: Vec<u64> = match target_member_id {
            Some(id) => vec![id],
            None => view.peers.keys().copied().collect(),
        };

        let mut actions = Vec::with_capacity(targets.len());
        for target in targets {
            let Some(peer) = view.peers.get(&target) else {
                actions.push(ClientAction::SendFailed {
                    target_member_id: target,
                    reason: "unknown member".to_string(),
                });
                continue;
            };

            let Some(peer_key) = decode_peer_key(&peer.public_key) else {
                actions.push(ClientAction::SendFailed {
                    target_member_id: target,
                    reason: "peer public key is malformed".to_string(),
                });
                continue;
            };

            // Fresh random nonce per envelope, never reused
            match view.session.encrypt(&peer_key, plaintext, self.env.random_array()) {
                Ok(envelope) => {
                    let frame = Payload::ChatSend(chat::ChatSend {
                        ciphertext: envelope.ciphertext,
                        nonce: envelope.nonce,
                        message_id,
                        target_member_id: Some(target),
                    })
                    .into_frame()?;
                    actions.push(ClientAction::Send(frame));
                },
                Err(e) => {
                    // Fail-closed: this recipient gets nothing, and the
                    // caller hears about it synchronously
                    actions.push(ClientAction::SendFailed {
                        target_member_id: target,
                        reason: e.to_string(),
                    });
                },
            }
        }

        Ok(actions)
    }

    fn send_in_room(&mut self, payload: Payload) -> Result<Vec<ClientAction>, ClientError> {
        if !matches!(self.phase, Phase::InRoom(_)) {
            return Err(ClientError::NotInRoom);
        }
        Ok(vec![ClientAction::Send(payload.into_frame()?)])
    }

    fn in_room_action(&self, action: ClientAction) -> Vec<ClientAction> {
        if matches!(self.phase, Phase::InRoom(_)) { vec![action] } else { vec![] }
    }
}

/// Interpret relayed public-key bytes as an X25519 key.
///
/// The relay passes keys through as opaque bytes; a peer running
/// different software could publish anything, so length is checked at
/// the point of use.
fn decode_peer_key(bytes: &[u8]) -> Option<[u8; KEY_SIZE]> {
    bytes.try_into().ok()
}
