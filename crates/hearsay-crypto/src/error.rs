//! Crypto error types.

/// Errors from primitive operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// The AEAD primitive reported a failure while encrypting.
    ///
    /// Fail-closed: no ciphertext is produced and nothing may be sent
    /// in its place.
    #[error("encryption failed")]
    Encryption,

    /// Ciphertext failed integrity verification.
    ///
    /// Tampering, corruption, or a mismatched key. The message must be
    /// treated as undeliverable; no plaintext is produced.
    #[error("authentication failed")]
    Authentication,

    /// The peer public key produced a non-contributory shared secret
    /// (all-zero Diffie-Hellman output from a low-order point).
    #[error("peer public key is not contributory")]
    WeakPeerKey,
}
