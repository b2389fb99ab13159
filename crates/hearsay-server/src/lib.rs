//! Hearsay relay server.
//!
//! A zero-knowledge relay for small ephemeral group chats: it forwards
//! opaque, already-encrypted payloads between the members of a room and
//! never holds a decryption key. All state is process-memory-resident
//! and lost on restart by design — there is no persistence layer.
//!
//! # Architecture
//!
//! The [`ServerDriver`] is Sans-IO: it consumes [`ServerEvent`]s and
//! returns [`ServerAction`]s, with time and randomness supplied by an
//! [`Environment`](hearsay_core::Environment). This crate's [`Server`]
//! is the production glue that executes those actions over QUIC.
//!
//! # Concurrency
//!
//! The driver (registry + sweeper) sits behind one `tokio::sync::Mutex`.
//! Every action carries its resolved recipient sessions, so membership
//! lookups happen inside the lock and network writes happen strictly
//! after it is released — snapshots are never observed mid-mutation and
//! no I/O ever runs under the lock.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod driver;
mod error;
mod registry;
mod router;
mod sweeper;
mod system_env;
mod transport;

use std::{collections::HashMap, sync::Arc, time::Duration};

use bytes::BytesMut;
pub use driver::{LogLevel, ServerAction, ServerConfig, ServerDriver, ServerEvent};
pub use error::ServerError;
use hearsay_core::Environment;
use hearsay_proto::{Frame, FrameHeader};
pub use registry::{Departure, JoinOutcome, MemberRecord, RoomRegistry};
pub use router::{RouteTargets, broadcast_from, direct_from};
pub use sweeper::{Sweeper, SweeperConfig};
pub use system_env::SystemEnv;
use tokio::sync::{Mutex, RwLock};
pub use transport::{RelayConnection, ServerTransport, TlsSetup};

/// Shared connection state for the action executor.
struct SharedState {
    /// Session id → connection (for closing).
    connections: RwLock<HashMap<u64, RelayConnection>>,
    /// Session id → persistent outbound stream. All frames to a client
    /// go through this single stream, preserving delivery order.
    outbound_streams: RwLock<HashMap<u64, Mutex<quinn::SendStream>>>,
}

/// Configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g. "0.0.0.0:4433").
    pub bind_address: String,
    /// TLS material.
    pub tls: TlsSetup,
    /// Driver configuration (limits, sweeper cadence).
    pub driver: ServerConfig,
    /// How often the runtime ticks the driver (the sweeper rate-limits
    /// itself independently).
    pub tick_interval: Duration,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4433".to_string(),
            tls: TlsSetup::SelfSigned,
            driver: ServerConfig::default(),
            tick_interval: Duration::from_secs(1),
        }
    }
}

/// Production Hearsay relay.
pub struct Server {
    driver: ServerDriver<SystemEnv>,
    transport: ServerTransport,
    env: SystemEnv,
    tick_interval: Duration,
}

impl Server {
    /// Create and bind a relay.
    pub fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let env = SystemEnv::new();
        let driver = ServerDriver::new(env.clone(), config.driver);
        let transport = ServerTransport::bind(&config.bind_address, &config.tls)?;

        Ok(Self { driver, transport, env, tick_interval: config.tick_interval })
    }

    /// Local address the relay is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        self.transport.local_addr()
    }

    /// Run the relay until the process is stopped.
    pub async fn run(self) -> Result<(), ServerError> {
        let Self { driver, transport, env, tick_interval } = self;

        let driver = Arc::new(Mutex::new(driver));
        let shared = Arc::new(SharedState {
            connections: RwLock::new(HashMap::new()),
            outbound_streams: RwLock::new(HashMap::new()),
        });

        // Sweeper heartbeat, independent of message traffic
        {
            let driver = Arc::clone(&driver);
            let shared = Arc::clone(&shared);
            let env = env.clone();
            tokio::spawn(async move {
                loop {
                    env.sleep(tick_interval).await;
                    let actions = driver.lock().await.process_event(ServerEvent::Tick);
                    execute_actions(actions, &shared).await;
                }
            });
        }

        loop {
            match transport.accept().await {
                Ok(conn) => {
                    let driver = Arc::clone(&driver);
                    let shared = Arc::clone(&shared);
                    let env = env.clone();

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, driver, shared, env).await {
                            tracing::debug!("connection ended with error: {e}");
                        }
                    });
                },
                Err(e) => {
                    tracing::error!("accept failed: {e}");
                },
            }
        }
    }
}

/// Serve one QUIC connection for its whole lifetime.
async fn handle_connection(
    conn: RelayConnection,
    driver: Arc<Mutex<ServerDriver<SystemEnv>>>,
    shared: Arc<SharedState>,
    env: SystemEnv,
) -> Result<(), ServerError> {
    let session_id = env.random_u64();
    tracing::debug!("connection {} from {}", session_id, conn.remote_addr());

    let outbound = conn.open_uni().await?;
    shared.connections.write().await.insert(session_id, conn.clone());
    shared.outbound_streams.write().await.insert(session_id, Mutex::new(outbound));

    let actions =
        driver.lock().await.process_event(ServerEvent::ConnectionAccepted { session_id });
    execute_actions(actions, &shared).await;

    loop {
        match conn.accept_bi().await {
            Ok((_send, recv)) => {
                let driver = Arc::clone(&driver);
                let shared = Arc::clone(&shared);

                tokio::spawn(async move {
                    if let Err(e) = handle_stream(session_id, recv, driver, &shared).await {
                        tracing::debug!("stream from {} ended: {}", session_id, e);
                    }
                });
            },
            Err(e) => {
                tracing::debug!("connection {} closed: {}", session_id, e);
                break;
            },
        }
    }

    shared.connections.write().await.remove(&session_id);
    shared.outbound_streams.write().await.remove(&session_id);

    // Disconnect is a departure: same path as an explicit leave
    let actions = driver.lock().await.process_event(ServerEvent::ConnectionClosed {
        session_id,
        reason: "transport closed".to_string(),
    });
    execute_actions(actions, &shared).await;

    Ok(())
}

/// Read frames off one inbound stream and feed them to the driver.
async fn handle_stream(
    session_id: u64,
    mut recv: quinn::RecvStream,
    driver: Arc<Mutex<ServerDriver<SystemEnv>>>,
    shared: &Arc<SharedState>,
) -> Result<(), ServerError> {
    let mut buf = BytesMut::with_capacity(4096);

    loop {
        buf.clear();
        buf.resize(FrameHeader::SIZE, 0);
        if recv.read_exact(&mut buf[..FrameHeader::SIZE]).await.is_err() {
            // Stream finished between frames
            return Ok(());
        }

        let payload_size = match FrameHeader::from_bytes(&buf[..FrameHeader::SIZE]) {
            Ok(header) => header.payload_size() as usize,
            Err(e) => {
                tracing::warn!("invalid header from {}: {}", session_id, e);
                return Ok(());
            },
        };

        if payload_size > 0 {
            buf.resize(FrameHeader::SIZE + payload_size, 0);
            if let Err(e) = recv.read_exact(&mut buf[FrameHeader::SIZE..]).await {
                tracing::debug!("payload read from {} failed: {}", session_id, e);
                return Ok(());
            }
        }

        let frame = match Frame::decode(&buf) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("frame decode from {} failed: {}", session_id, e);
                return Ok(());
            },
        };

        // Resolve under the lock, write after it is released
        let actions =
            driver.lock().await.process_event(ServerEvent::FrameReceived { session_id, frame });
        execute_actions(actions, shared).await;
    }
}

/// Execute driver actions. Needs no driver access: every action already
/// carries its resolved targets.
async fn execute_actions(actions: Vec<ServerAction>, shared: &SharedState) {
    for action in actions {
        match action {
            ServerAction::SendToSession { session_id, frame } => {
                let bytes = match frame.to_vec() {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::error!("outbound frame encode failed: {e}");
                        continue;
                    },
                };

                let streams = shared.outbound_streams.read().await;
                if let Some(stream) = streams.get(&session_id) {
                    let mut stream = stream.lock().await;
                    if let Err(e) = stream.write_all(&bytes).await {
                        tracing::warn!("write to session {} failed: {}", session_id, e);
                    }
                } else {
                    // Recipient vanished between resolution and write;
                    // deliveries are fire-and-forget
                    tracing::debug!("session {} gone before delivery", session_id);
                }
            },

            ServerAction::CloseConnection { session_id, reason } => {
                tracing::info!("closing connection {}: {}", session_id, reason);
                if let Some(conn) = shared.connections.write().await.remove(&session_id) {
                    conn.close(&reason);
                }
                shared.outbound_streams.write().await.remove(&session_id);
            },

            ServerAction::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{message}"),
                LogLevel::Info => tracing::info!("{message}"),
                LogLevel::Warn => tracing::warn!("{message}"),
                LogLevel::Error => tracing::error!("{message}"),
            },
        }
    }
}
