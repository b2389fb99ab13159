//! Server driver.
//!
//! Ties together the room registry, the relay router, and the lifecycle
//! sweeper behind one event-processing entry point. The driver is
//! Sans-IO and **infallible**: every per-connection failure — malformed
//! frame, invalid join, unexpected opcode — becomes an error frame
//! and/or a log action for that connection alone. One connection's
//! garbage never escalates into the shared runtime loop.
//!
//! The relay is zero-knowledge by construction: chat ciphertext, nonces,
//! public keys, and call signaling all pass through as opaque bytes.

use std::collections::HashSet;

use hearsay_core::Environment;
use hearsay_proto::{
    ErrorPayload, Frame, Payload,
    payloads::{call, chat, room},
};

use crate::{
    registry::{Departure, JoinOutcome, RoomRegistry},
    router,
    sweeper::{Sweeper, SweeperConfig},
};

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Lifecycle sweeper settings.
    pub sweeper: SweeperConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { max_connections: 10_000, sweeper: SweeperConfig::default() }
    }
}

/// Events the server driver processes.
///
/// Produced by the runtime (production transport or an in-memory test
/// harness).
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new connection was accepted.
    ConnectionAccepted {
        /// Unique connection id assigned by the runtime.
        session_id: u64,
    },

    /// A frame was received from a connection.
    FrameReceived {
        /// Connection that sent the frame.
        session_id: u64,
        /// The received frame.
        frame: Frame,
    },

    /// A connection closed (by peer or error). Routed through the same
    /// departure path as an explicit leave.
    ConnectionClosed {
        /// Connection that closed.
        session_id: u64,
        /// Reason for closure.
        reason: String,
    },

    /// Periodic tick for the lifecycle sweeper.
    Tick,
}

/// Actions the server driver produces.
///
/// Recipient sessions are resolved at processing time (inside the
/// driver's lock); executing these requires no further registry access,
/// so the runtime performs network writes only after the lock is
/// released.
#[derive(Debug, Clone)]
pub enum ServerAction {
    /// Send a frame to one session.
    SendToSession {
        /// Target session.
        session_id: u64,
        /// Frame to send.
        frame: Frame,
    },

    /// Close a connection.
    CloseConnection {
        /// Session to close.
        session_id: u64,
        /// Reason for closure.
        reason: String,
    },

    /// Log a message.
    Log {
        /// Severity.
        level: LogLevel,
        /// Message text.
        message: String,
    },
}

/// Log levels for driver actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information.
    Debug,
    /// Informational message.
    Info,
    /// Warning.
    Warn,
    /// Error.
    Error,
}

/// Action-based relay driver.
pub struct ServerDriver<E: Environment> {
    /// Live connections (members or not).
    connections: HashSet<u64>,
    /// Room membership state.
    registry: RoomRegistry<E::Instant>,
    /// Retention reaper over the registry.
    sweeper: Sweeper<E::Instant>,
    /// Environment (time, RNG).
    env: E,
    /// Configuration.
    config: ServerConfig,
}

impl<E: Environment> ServerDriver<E> {
    /// Create a new driver.
    pub fn new(env: E, config: ServerConfig) -> Self {
        Self {
            connections: HashSet::new(),
            registry: RoomRegistry::new(),
            sweeper: Sweeper::new(config.sweeper.clone()),
            env,
            config,
        }
    }

    /// Read-only view of the room registry (tests, diagnostics).
    #[must_use]
    pub fn registry(&self) -> &RoomRegistry<E::Instant> {
        &self.registry
    }

    /// Process one event and return the actions to execute.
    pub fn process_event(&mut self, event: ServerEvent) -> Vec<ServerAction> {
        match event {
            ServerEvent::ConnectionAccepted { session_id } => self.handle_accepted(session_id),
            ServerEvent::FrameReceived { session_id, frame } => {
                self.handle_frame(session_id, &frame)
            },
            ServerEvent::ConnectionClosed { session_id, reason } => {
                self.handle_closed(session_id, &reason)
            },
            ServerEvent::Tick => self.handle_tick(),
        }
    }

    fn handle_accepted(&mut self, session_id: u64) -> Vec<ServerAction> {
        if self.connections.len() >= self.config.max_connections {
            return vec![ServerAction::CloseConnection {
                session_id,
                reason: "connection limit reached".to_string(),
            }];
        }

        self.connections.insert(session_id);
        vec![log(LogLevel::Debug, format!("connection {session_id} accepted"))]
    }

    fn handle_closed(&mut self, session_id: u64, reason: &str) -> Vec<ServerAction> {
        self.connections.remove(&session_id);

        // Same code path as an explicit leave
        let mut actions = self.handle_departure(session_id);
        actions.push(log(LogLevel::Debug, format!("connection {session_id} closed: {reason}")));
        actions
    }

    fn handle_tick(&mut self) -> Vec<ServerAction> {
        let now = self.env.now();
        match self.sweeper.on_tick(&mut self.registry, now) {
            Some(reaped) if reaped > 0 => {
                vec![log(LogLevel::Info, format!("sweeper reaped {reaped} abandoned room(s)"))]
            },
            _ => vec![],
        }
    }

    fn handle_frame(&mut self, session_id: u64, frame: &Frame) -> Vec<ServerAction> {
        if !self.connections.contains(&session_id) {
            // Frame racing its own disconnect
            return vec![log(
                LogLevel::Debug,
                format!("dropped frame from unknown session {session_id}"),
            )];
        }

        let payload = match Payload::from_frame(frame) {
            Ok(payload) => payload,
            Err(e) => {
                return self.reject(session_id, ErrorPayload::invalid_payload(e.to_string()));
            },
        };

        match payload {
            Payload::Join(request) => self.handle_join(session_id, request),
            Payload::Leave => self.handle_departure(session_id),
            Payload::ChatSend(send) => self.handle_chat(session_id, send),
            Payload::Typing(typing) => self.handle_typing(session_id, typing),
            Payload::CallStart(start) => self.handle_call_start(session_id, start),
            Payload::CallSignal(signal) => self.handle_call_signal(session_id, signal),
            Payload::CallEnd => self.handle_call_end(session_id),
            other => self.reject(
                session_id,
                ErrorPayload::frame_rejected(format!(
                    "unexpected opcode {:?} from a client",
                    other.opcode()
                )),
            ),
        }
    }

    /// Join: validate, register (displacing any prior membership),
    /// ack the joiner with the roster, notify the room.
    fn handle_join(&mut self, session_id: u64, request: room::JoinRequest) -> Vec<ServerAction> {
        // Validation rejects before any state is mutated
        if request.room_id.is_empty() {
            return self.reject(session_id, ErrorPayload::validation("join requires a room id"));
        }
        if request.public_key.is_empty() {
            return self.reject(session_id, ErrorPayload::validation("join requires a public key"));
        }

        let now = self.env.now();
        let JoinOutcome { member_id, existing, displaced } = self.registry.join(
            &request.room_id,
            session_id,
            request.public_key.clone(),
            request.display_name,
            now,
        );

        let mut actions = Vec::new();

        // The prior room (if any) sees a normal departure
        if let Some(departure) = displaced {
            self.notify_departure(&departure, &mut actions);
        }

        let display_name = self
            .registry
            .member_of(session_id)
            .map(|m| m.display_name.clone())
            .unwrap_or_default();

        let ack = Payload::Joined(room::JoinAck {
            member_id,
            room_id: request.room_id.clone(),
            members: existing
                .iter()
                .map(|m| room::MemberInfo {
                    member_id: m.member_id,
                    public_key: m.public_key.clone(),
                    display_name: m.display_name.clone(),
                })
                .collect(),
        });
        self.send_payload(session_id, ack, &mut actions);

        let announce = Payload::MemberJoined(room::MemberJoined {
            member_id,
            public_key: request.public_key,
            display_name,
        });
        self.send_to_all(existing.iter().map(|m| m.session_id), &announce, &mut actions);

        actions.push(log(
            LogLevel::Info,
            format!(
                "member {member_id} joined room {:?} ({} existing)",
                request.room_id,
                existing.len()
            ),
        ));

        actions
    }

    /// Leave and disconnect both end here.
    fn handle_departure(&mut self, session_id: u64) -> Vec<ServerAction> {
        let mut actions = Vec::new();
        if let Some(departure) = self.registry.leave(session_id) {
            self.notify_departure(&departure, &mut actions);
            let destroyed = if departure.remaining_sessions.is_empty() {
                ", room destroyed"
            } else {
                ""
            };
            actions.push(log(
                LogLevel::Info,
                format!(
                    "member {} left room {:?}{destroyed}",
                    departure.member.member_id, departure.room_id
                ),
            ));
        }
        actions
    }

    fn notify_departure(&self, departure: &Departure, actions: &mut Vec<ServerAction>) {
        let payload = Payload::MemberLeft(room::MemberLeft {
            member_id: departure.member.member_id,
            display_name: departure.member.display_name.clone(),
        });
        self.send_to_all(departure.remaining_sessions.iter().copied(), &payload, actions);
    }

    /// Chat fan-out: direct when targeted, broadcast-except-sender
    /// otherwise. A sender without a membership is a silent no-op — the
    /// disconnect/in-flight race is expected, never an error.
    fn handle_chat(&mut self, session_id: u64, send: chat::ChatSend) -> Vec<ServerAction> {
        let route = match send.target_member_id {
            Some(target) => router::direct_from(&self.registry, session_id, target),
            None => router::broadcast_from(&self.registry, session_id),
        };
        let Some(route) = route else {
            return self.routing_miss(session_id, "chat");
        };

        let payload = Payload::ChatDeliver(chat::ChatDeliver {
            sender_member_id: route.sender_member_id,
            sender_display_name: route.sender_display_name.clone(),
            ciphertext: send.ciphertext,
            nonce: send.nonce,
            message_id: send.message_id,
            server_timestamp_ms: self.env.wall_clock_ms(),
        });

        let mut actions = Vec::new();
        self.send_to_all(route.sessions.iter().copied(), &payload, &mut actions);
        actions
    }

    fn handle_typing(&mut self, session_id: u64, typing: chat::TypingSet) -> Vec<ServerAction> {
        let Some(route) = router::broadcast_from(&self.registry, session_id) else {
            return self.routing_miss(session_id, "typing");
        };

        let payload = Payload::TypingUpdate(chat::TypingUpdate {
            member_id: route.sender_member_id,
            display_name: route.sender_display_name.clone(),
            is_typing: typing.is_typing,
        });

        let mut actions = Vec::new();
        self.send_to_all(route.sessions.iter().copied(), &payload, &mut actions);
        actions
    }

    fn handle_call_start(&mut self, session_id: u64, start: call::CallStart) -> Vec<ServerAction> {
        let Some(route) = router::broadcast_from(&self.registry, session_id) else {
            return self.routing_miss(session_id, "call start");
        };

        let payload = Payload::CallIncoming(call::CallIncoming {
            sender_member_id: route.sender_member_id,
            sender_display_name: route.sender_display_name.clone(),
            media: start.media,
        });

        let mut actions = Vec::new();
        self.send_to_all(route.sessions.iter().copied(), &payload, &mut actions);
        actions
    }

    fn handle_call_signal(
        &mut self,
        session_id: u64,
        signal: call::CallSignal,
    ) -> Vec<ServerAction> {
        let Some(route) =
            router::direct_from(&self.registry, session_id, signal.target_member_id)
        else {
            return self.routing_miss(session_id, "call signal");
        };

        // Signaling content is opaque; it is forwarded, never inspected
        let payload = Payload::CallSignalDeliver(call::CallSignalDeliver {
            sender_member_id: route.sender_member_id,
            signal: signal.signal,
        });

        let mut actions = Vec::new();
        self.send_to_all(route.sessions.iter().copied(), &payload, &mut actions);
        actions
    }

    fn handle_call_end(&mut self, session_id: u64) -> Vec<ServerAction> {
        let Some(route) = router::broadcast_from(&self.registry, session_id) else {
            return self.routing_miss(session_id, "call end");
        };

        let mut actions = Vec::new();
        self.send_to_all(route.sessions.iter().copied(), &Payload::CallEnded, &mut actions);
        actions
    }

    /// Encode `payload` once and queue a send per recipient.
    fn send_to_all(
        &self,
        sessions: impl Iterator<Item = u64>,
        payload: &Payload,
        actions: &mut Vec<ServerAction>,
    ) {
        match payload.clone().into_frame() {
            Ok(frame) => {
                for session_id in sessions {
                    actions.push(ServerAction::SendToSession {
                        session_id,
                        frame: frame.clone(),
                    });
                }
            },
            Err(e) => {
                actions.push(log(LogLevel::Error, format!("failed to encode fan-out frame: {e}")));
            },
        }
    }

    fn send_payload(&self, session_id: u64, payload: Payload, actions: &mut Vec<ServerAction>) {
        match payload.into_frame() {
            Ok(frame) => actions.push(ServerAction::SendToSession { session_id, frame }),
            Err(e) => {
                actions.push(log(LogLevel::Error, format!("failed to encode frame: {e}")));
            },
        }
    }

    /// Answer one offending frame with an error; nothing else changes.
    fn reject(&self, session_id: u64, error: ErrorPayload) -> Vec<ServerAction> {
        let message = error.message.clone();
        let mut actions = Vec::new();
        self.send_payload(session_id, Payload::Error(error), &mut actions);
        actions.push(log(LogLevel::Warn, format!("rejected frame from {session_id}: {message}")));
        actions
    }

    /// Expected race: a frame arrived from (or for) a session that is no
    /// longer a member. Not an error; the sender is not notified.
    fn routing_miss(&self, session_id: u64, kind: &str) -> Vec<ServerAction> {
        vec![log(
            LogLevel::Debug,
            format!("dropped {kind} from non-member session {session_id}"),
        )]
    }
}

fn log(level: LogLevel, message: String) -> ServerAction {
    ServerAction::Log { level, message }
}
