//! X25519 key pairs and pairwise session-key derivation.

use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Size of public keys, secret keys, and derived session keys (32 bytes).
pub const KEY_SIZE: usize = 32;

/// Label for session-key derivation (domain separation).
const SESSION_KEY_LABEL: &[u8] = b"hearsay pairwise session v1";

/// One participant's X25519 key pair for a single chat session.
///
/// Created once per logical session from a caller-supplied random seed
/// and dropped (zeroized) when the session ends. The secret half never
/// leaves this struct.
pub struct KeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl KeyPair {
    /// Build a key pair from 32 random bytes.
    ///
    /// The seed MUST come from a cryptographically secure RNG in
    /// production; taking it as a parameter keeps this crate pure and
    /// tests deterministic.
    #[must_use]
    pub fn from_seed(seed: [u8; KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(seed);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// The shareable public half, as raw bytes.
    #[must_use]
    pub fn public_bytes(&self) -> [u8; KEY_SIZE] {
        self.public.to_bytes()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secret half is intentionally absent
        f.debug_struct("KeyPair").field("public", &self.public_bytes()).finish_non_exhaustive()
    }
}

/// A derived 32-byte symmetric key for one pair of participants.
///
/// Both peers derive the identical key from their respective sides.
/// Zeroized on drop.
#[derive(Clone)]
pub struct SessionKey {
    key: [u8; KEY_SIZE],
}

impl SessionKey {
    /// Raw key bytes for the AEAD.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// Derive the pairwise session key for (own secret, peer public).
///
/// Deterministic, and symmetric across the pair: A deriving with B's
/// public key and B deriving with A's public key produce bit-identical
/// keys. The HKDF info string carries only a fixed label — nothing
/// party-specific — which is what preserves the symmetry.
///
/// # Errors
///
/// - `CryptoError::WeakPeerKey` if the Diffie-Hellman output is
///   non-contributory (peer sent a low-order point)
pub fn derive_session_key(
    own: &KeyPair,
    peer_public: &[u8; KEY_SIZE],
) -> Result<SessionKey, CryptoError> {
    let peer = PublicKey::from(*peer_public);
    let shared = own.secret.diffie_hellman(&peer);

    if !shared.was_contributory() {
        return Err(CryptoError::WeakPeerKey);
    }

    let hkdf = Hkdf::<Sha256>::new(None, shared.as_bytes());
    let mut key = [0u8; KEY_SIZE];
    let Ok(()) = hkdf.expand(SESSION_KEY_LABEL, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    Ok(SessionKey { key })
}
