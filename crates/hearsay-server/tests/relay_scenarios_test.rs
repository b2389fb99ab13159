//! End-to-end relay scenarios.
//!
//! Real client state machines exchange frames with the server driver
//! entirely in memory: every `Send` action from a client becomes a
//! `FrameReceived` event at the driver, and every `SendToSession`
//! action from the driver becomes a `FrameReceived` event at the right
//! client. No sockets, fully deterministic.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use hearsay_client::{Client, ClientAction, ClientConfig, ClientEvent};
use hearsay_core::Environment;
use hearsay_server::{ServerAction, ServerConfig, ServerDriver, ServerEvent};

#[derive(Clone)]
struct TestEnv {
    rng_state: Arc<AtomicU64>,
}

impl TestEnv {
    fn new() -> Self {
        Self { rng_state: Arc::new(AtomicU64::new(1)) }
    }
}

impl Environment for TestEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        async {}
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        for byte in buffer {
            let mut x = self.rng_state.fetch_add(0x9E37_79B9, Ordering::SeqCst);
            x ^= x >> 33;
            x = x.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
            x ^= x >> 29;
            *byte = (x >> 56) as u8;
        }
    }

    fn wall_clock_ms(&self) -> u64 {
        1_700_000_000_000
    }
}

/// In-memory relay cluster: one server driver, N clients.
struct Cluster {
    /// One shared environment: clones share the RNG counter, so every
    /// client draws a distinct key seed.
    env: TestEnv,
    driver: ServerDriver<TestEnv>,
    clients: HashMap<u64, Client<TestEnv>>,
    /// Non-Send client actions, per session, in delivery order.
    inbox: HashMap<u64, Vec<ClientAction>>,
}

impl Cluster {
    fn new() -> Self {
        let env = TestEnv::new();
        Self {
            driver: ServerDriver::new(env.clone(), ServerConfig::default()),
            env,
            clients: HashMap::new(),
            inbox: HashMap::new(),
        }
    }

    /// Connect a fresh client under `session_id`.
    fn connect(&mut self, session_id: u64) {
        self.clients.insert(session_id, Client::new(self.env.clone(), ClientConfig::default()));
        self.inbox.insert(session_id, Vec::new());
        self.driver.process_event(ServerEvent::ConnectionAccepted { session_id });
    }

    /// Feed one application event to a client and pump all resulting
    /// frames through the relay until the system is quiescent.
    fn client_event(&mut self, session_id: u64, event: ClientEvent<std::time::Instant>) {
        let actions = self
            .clients
            .get_mut(&session_id)
            .unwrap()
            .process_event(event)
            .unwrap();

        let mut to_server: VecDeque<(u64, hearsay_proto::Frame)> = VecDeque::new();
        self.collect(session_id, actions, &mut to_server);

        while let Some((from, frame)) = to_server.pop_front() {
            let server_actions =
                self.driver.process_event(ServerEvent::FrameReceived { session_id: from, frame });

            for action in server_actions {
                if let ServerAction::SendToSession { session_id: to, frame } = action {
                    // Deliveries racing a departure are dropped, as the
                    // production executor would drop them
                    let Some(client) = self.clients.get_mut(&to) else {
                        continue;
                    };
                    let actions =
                        client.process_event(ClientEvent::FrameReceived(frame)).unwrap();
                    self.collect(to, actions, &mut to_server);
                }
            }
        }
    }

    /// Abrupt transport loss for one client.
    fn disconnect(&mut self, session_id: u64) {
        self.clients.remove(&session_id);
        let actions = self.driver.process_event(ServerEvent::ConnectionClosed {
            session_id,
            reason: "transport closed".to_string(),
        });

        let mut to_server = VecDeque::new();
        for action in actions {
            if let ServerAction::SendToSession { session_id: to, frame } = action {
                if let Some(client) = self.clients.get_mut(&to) {
                    let actions =
                        client.process_event(ClientEvent::FrameReceived(frame)).unwrap();
                    self.collect(to, actions, &mut to_server);
                }
            }
        }
        assert!(to_server.is_empty(), "membership events never trigger client sends");
    }

    fn collect(
        &mut self,
        session_id: u64,
        actions: Vec<ClientAction>,
        to_server: &mut VecDeque<(u64, hearsay_proto::Frame)>,
    ) {
        for action in actions {
            match action {
                ClientAction::Send(frame) => to_server.push_back((session_id, frame)),
                other => self.inbox.get_mut(&session_id).unwrap().push(other),
            }
        }
    }

    fn drain(&mut self, session_id: u64) -> Vec<ClientAction> {
        std::mem::take(self.inbox.get_mut(&session_id).unwrap())
    }
}

const X: u64 = 1;
const Y: u64 = 2;
const Z: u64 = 3;

#[test]
fn two_member_room_exchange() {
    let mut cluster = Cluster::new();

    // X joins first and sees an empty roster
    cluster.connect(X);
    cluster.client_event(X, ClientEvent::JoinRoom {
        room_id: "abc123".to_string(),
        display_name: Some("xena".to_string()),
    });
    let x_member_id = match cluster.drain(X).as_slice() {
        [ClientAction::Joined { room_id, member_id, peers }] => {
            assert_eq!(room_id, "abc123");
            assert!(peers.is_empty());
            *member_id
        },
        other => panic!("unexpected actions for X: {other:?}"),
    };

    // Y joins: X hears about it, Y sees X in the roster
    cluster.connect(Y);
    cluster.client_event(Y, ClientEvent::JoinRoom {
        room_id: "abc123".to_string(),
        display_name: Some("yuri".to_string()),
    });

    let x_actions = cluster.drain(X);
    assert!(matches!(
        x_actions.as_slice(),
        [ClientAction::PeerJoined(peer)] if peer.display_name == "yuri"
    ));

    match cluster.drain(Y).as_slice() {
        [ClientAction::Joined { peers, .. }] => {
            assert_eq!(peers.len(), 1);
            assert_eq!(peers[0].member_id, x_member_id);
            assert_eq!(peers[0].display_name, "xena");
        },
        other => panic!("unexpected actions for Y: {other:?}"),
    }

    // X broadcasts an encrypted message; only Y receives it, decrypted,
    // attributed to X
    cluster.client_event(X, ClientEvent::SendChat {
        plaintext: b"the relay reads nothing".to_vec(),
        target_member_id: None,
    });

    assert!(cluster.drain(X).is_empty(), "the sender never receives its own broadcast");
    match cluster.drain(Y).as_slice() {
        [ClientAction::MessageReceived { sender_member_id, plaintext, .. }] => {
            assert_eq!(*sender_member_id, x_member_id);
            assert_eq!(plaintext, b"the relay reads nothing");
        },
        other => panic!("unexpected actions for Y: {other:?}"),
    }
}

#[test]
fn typing_and_call_flow_between_members() {
    let mut cluster = Cluster::new();
    cluster.connect(X);
    cluster.client_event(X, ClientEvent::JoinRoom {
        room_id: "r".to_string(),
        display_name: None,
    });
    cluster.connect(Y);
    cluster.client_event(Y, ClientEvent::JoinRoom {
        room_id: "r".to_string(),
        display_name: None,
    });
    let y_member_id = match cluster.drain(Y).as_slice() {
        [ClientAction::Joined { member_id, .. }] => *member_id,
        other => panic!("unexpected actions for Y: {other:?}"),
    };
    cluster.drain(X);

    cluster.client_event(Y, ClientEvent::SetTyping { is_typing: true });
    assert!(matches!(
        cluster.drain(X).as_slice(),
        [ClientAction::TypingChanged { is_typing: true, member_id, .. }]
            if *member_id == y_member_id
    ));

    cluster.client_event(X, ClientEvent::StartCall {
        media: hearsay_proto::payloads::call::MediaType::Audio,
    });
    assert!(matches!(cluster.drain(Y).as_slice(), [ClientAction::CallIncoming { .. }]));

    cluster.client_event(X, ClientEvent::SendCallSignal {
        target_member_id: y_member_id,
        signal: b"offer sdp".to_vec(),
    });
    assert!(matches!(
        cluster.drain(Y).as_slice(),
        [ClientAction::CallSignal { signal, .. }] if signal == b"offer sdp"
    ));

    cluster.client_event(Y, ClientEvent::EndCall);
    assert!(matches!(cluster.drain(X).as_slice(), [ClientAction::CallEnded]));
}

#[test]
fn abrupt_disconnect_mid_call_is_harmless() {
    let mut cluster = Cluster::new();
    cluster.connect(X);
    cluster.client_event(X, ClientEvent::JoinRoom {
        room_id: "r".to_string(),
        display_name: None,
    });
    cluster.connect(Y);
    cluster.client_event(Y, ClientEvent::JoinRoom {
        room_id: "r".to_string(),
        display_name: None,
    });
    let y_member_id = match cluster.drain(Y).as_slice() {
        [ClientAction::Joined { member_id, .. }] => *member_id,
        other => panic!("unexpected actions for Y: {other:?}"),
    };
    cluster.drain(X);

    // Y vanishes mid-exchange; X still holds Y's old member id
    cluster.disconnect(Y);
    assert!(matches!(
        cluster.drain(X).as_slice(),
        [ClientAction::PeerLeft { member_id, .. }] if *member_id == y_member_id
    ));

    // Signaling at the stale id: no delivery anywhere, no server error,
    // the room keeps working
    cluster.client_event(X, ClientEvent::SendCallSignal {
        target_member_id: y_member_id,
        signal: b"late candidate".to_vec(),
    });
    assert!(cluster.drain(X).is_empty());
}

#[test]
fn room_resets_after_everyone_leaves() {
    let mut cluster = Cluster::new();
    cluster.connect(X);
    cluster.client_event(X, ClientEvent::JoinRoom {
        room_id: "abc123".to_string(),
        display_name: None,
    });
    cluster.drain(X);

    cluster.client_event(X, ClientEvent::LeaveRoom);
    let actions = cluster.drain(X);
    assert!(actions.iter().any(|a| matches!(a, ClientAction::Left { .. })));

    // The room is gone; Z starts it over with a fresh roster and a
    // fresh member-id space
    cluster.connect(Z);
    cluster.client_event(Z, ClientEvent::JoinRoom {
        room_id: "abc123".to_string(),
        display_name: None,
    });
    match cluster.drain(Z).as_slice() {
        [ClientAction::Joined { peers, .. }] => assert!(peers.is_empty()),
        other => panic!("unexpected actions for Z: {other:?}"),
    }
}

#[test]
fn three_member_broadcast_is_pairwise_encrypted() {
    let mut cluster = Cluster::new();
    for (session, name) in [(X, "xena"), (Y, "yuri"), (Z, "zoe")] {
        cluster.connect(session);
        cluster.client_event(session, ClientEvent::JoinRoom {
            room_id: "trio".to_string(),
            display_name: Some(name.to_string()),
        });
    }
    cluster.drain(X);
    cluster.drain(Y);
    cluster.drain(Z);

    cluster.client_event(X, ClientEvent::SendChat {
        plaintext: b"hello everyone".to_vec(),
        target_member_id: None,
    });

    for session in [Y, Z] {
        match cluster.drain(session).as_slice() {
            [ClientAction::MessageReceived { plaintext, sender_display_name, .. }] => {
                assert_eq!(plaintext, b"hello everyone");
                assert_eq!(sender_display_name, "xena");
            },
            other => panic!("unexpected actions for {session}: {other:?}"),
        }
    }
    assert!(cluster.drain(X).is_empty());
}
