//! Client error types.

use hearsay_proto::ProtocolError;

use crate::session::SessionError;

/// Errors returned to the caller of [`crate::Client::process_event`].
///
/// These indicate caller mistakes or unrecoverable encode failures.
/// Per-message crypto outcomes (an undeliverable message, a failed
/// send) are not errors — they surface as [`crate::ClientAction`]s so
/// the application always learns about them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The intent requires an active room membership.
    #[error("not in a room")]
    NotInRoom,

    /// A join is already active or pending; leave first.
    #[error("already joined or joining a room")]
    AlreadyInRoom,

    /// Wire encoding failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Session-manager failure outside the per-message paths.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}
