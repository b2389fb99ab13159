//! Server runtime error types.
//!
//! Only the runtime layer (transport, configuration) produces errors;
//! the driver is infallible by design — per-connection failures become
//! error frames, never `Err` values that could take the shared loop
//! down with them.

use hearsay_proto::ProtocolError;

/// Errors from the production server runtime.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error (invalid bind address, unreadable TLS
    /// material). Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport/network error. May be transient (peer issues) or fatal
    /// (bind address in use).
    #[error("transport error: {0}")]
    Transport(String),

    /// Wire-format error while encoding an outbound frame.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
