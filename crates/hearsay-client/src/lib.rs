//! Hearsay client.
//!
//! Action-based client state machine for the Hearsay relay protocol.
//! Owns the per-session key pair, derives pairwise session keys with
//! every other room member, and turns application intents into wire
//! frames (and wire frames into application events).
//!
//! # Architecture
//!
//! The client is Sans-IO: it receives events ([`ClientEvent`]),
//! processes them through pure state-machine logic, and returns actions
//! ([`ClientAction`]) for the caller to execute. Time and randomness
//! come from a [`hearsay_core::Environment`], so the whole state machine
//! runs deterministically under test.
//!
//! # Components
//!
//! - [`SessionManager`]: key pair + per-peer session-key cache
//! - [`Client`]: room membership, join handshake, envelope fan-out
//! - [`ClientEvent`] / [`ClientAction`]: the event/action vocabulary
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides
//! [`transport::ConnectedClient`] and [`transport::connect`] for real
//! QUIC connections.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod error;
mod event;
mod session;

#[cfg(feature = "transport")]
pub mod transport;

pub use client::{Client, ClientConfig};
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent, Peer};
pub use hearsay_core::Environment;
pub use session::{SealedEnvelope, SessionError, SessionManager};
