//! Session manager: one key pair, one cached session key per peer.
//!
//! The manager owns all client-side key material for a single logical
//! chat session. Session keys are derived lazily on first contact with a
//! peer and cached; the cache is bounded by room size and is cleared
//! wholesale when the session ends — nothing survives `clear()`.

use std::collections::{HashMap, hash_map::Entry};

use hearsay_crypto::{
    CryptoError, KEY_SIZE, KeyPair, NONCE_SIZE, SessionKey, derive_session_key, open,
    safety_number, seal,
};

/// Errors from session-manager operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The session was cleared; a new manager must be created before any
    /// further cryptographic operation.
    #[error("session is closed")]
    Closed,

    /// The primitive failed while encrypting. Fail-closed: the message
    /// must not be sent in any form.
    #[error("encryption failed")]
    Encryption,

    /// Ciphertext failed integrity verification. The message is
    /// undeliverable; the session itself remains usable.
    #[error("message authentication failed")]
    Authentication,

    /// The peer's public key is cryptographically unusable.
    #[error("peer public key rejected")]
    WeakPeerKey,
}

impl From<CryptoError> for SessionError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Encryption => Self::Encryption,
            CryptoError::Authentication => Self::Authentication,
            CryptoError::WeakPeerKey => Self::WeakPeerKey,
        }
    }
}

/// Output of a single encryption: ciphertext plus the nonce it was
/// sealed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedEnvelope {
    /// AEAD ciphertext including the authentication tag.
    pub ciphertext: Vec<u8>,
    /// The fresh nonce used for this one encryption.
    pub nonce: [u8; NONCE_SIZE],
}

/// Client-side key material for one logical chat session.
///
/// Methods take `&mut self`; the owning state machine serializes access,
/// which makes the check-then-insert in [`Self::derive_or_fetch`]
/// atomic without interior locking.
pub struct SessionManager {
    /// Our key pair. `None` after [`Self::clear`].
    keys: Option<KeyPair>,
    /// Derived session keys, keyed by peer public key.
    cache: HashMap<[u8; KEY_SIZE], SessionKey>,
}

impl SessionManager {
    /// Create a session with a fresh key pair from 32 random seed bytes.
    ///
    /// Called exactly once per logical chat session; the seed must come
    /// from a cryptographically secure RNG.
    #[must_use]
    pub fn new(seed: [u8; KEY_SIZE]) -> Self {
        Self { keys: Some(KeyPair::from_seed(seed)), cache: HashMap::new() }
    }

    /// Our shareable public key.
    pub fn public_key(&self) -> Result<[u8; KEY_SIZE], SessionError> {
        Ok(self.keys.as_ref().ok_or(SessionError::Closed)?.public_bytes())
    }

    /// Return the cached session key for `peer`, deriving it on first
    /// use.
    ///
    /// Idempotent: repeated calls with the same peer key return
    /// bit-identical key material without recomputation.
    pub fn derive_or_fetch(
        &mut self,
        peer: &[u8; KEY_SIZE],
    ) -> Result<&SessionKey, SessionError> {
        let keys = self.keys.as_ref().ok_or(SessionError::Closed)?;

        match self.cache.entry(*peer) {
            Entry::Occupied(cached) => Ok(cached.into_mut()),
            Entry::Vacant(slot) => {
                let derived = derive_session_key(keys, peer)?;
                Ok(slot.insert(derived))
            },
        }
    }

    /// Encrypt `plaintext` for `peer` under a caller-supplied fresh
    /// nonce.
    ///
    /// The nonce MUST be fresh random bytes for every call — it is
    /// passed in (rather than drawn here) so the crypto path stays pure
    /// and deterministic under test.
    ///
    /// # Errors
    ///
    /// Fail-closed: on any error no output is produced, and callers must
    /// never substitute plaintext.
    pub fn encrypt(
        &mut self,
        peer: &[u8; KEY_SIZE],
        plaintext: &[u8],
        nonce: [u8; NONCE_SIZE],
    ) -> Result<SealedEnvelope, SessionError> {
        let key = self.derive_or_fetch(peer)?;
        let ciphertext = seal(key, &nonce, plaintext)?;
        Ok(SealedEnvelope { ciphertext, nonce })
    }

    /// Verify and decrypt a ciphertext from `peer`.
    ///
    /// # Errors
    ///
    /// - `SessionError::Authentication` on tampering, corruption, or a
    ///   wrong key — the message is undeliverable but the session
    ///   continues
    pub fn decrypt(
        &mut self,
        peer: &[u8; KEY_SIZE],
        nonce: &[u8; NONCE_SIZE],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, SessionError> {
        let key = self.derive_or_fetch(peer)?;
        Ok(open(key, nonce, ciphertext)?)
    }

    /// Safety number for us and `peer` — identical no matter which of
    /// the two parties computes it.
    pub fn safety_number(&self, peer: &[u8; KEY_SIZE]) -> Result<String, SessionError> {
        let own = self.public_key()?;
        Ok(safety_number(&own, peer))
    }

    /// Discard all cached session keys and the key pair.
    ///
    /// This is the forward-secrecy boundary: every subsequent operation
    /// fails with [`SessionError::Closed`] until a new manager is
    /// created. Key material is zeroized on drop.
    pub fn clear(&mut self) {
        self.keys = None;
        self.cache.clear();
    }

    /// Number of peers with a cached session key (diagnostics/tests).
    #[must_use]
    pub fn cached_peers(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (SessionManager, SessionManager) {
        (SessionManager::new([0xA1; 32]), SessionManager::new([0xB2; 32]))
    }

    #[test]
    fn derive_or_fetch_is_idempotent() {
        let (mut a, b) = pair();
        let peer = b.public_key().unwrap();

        let first = a.derive_or_fetch(&peer).unwrap().as_bytes().to_owned();
        let second = a.derive_or_fetch(&peer).unwrap().as_bytes().to_owned();

        assert_eq!(first, second);
        assert_eq!(a.cached_peers(), 1);
    }

    #[test]
    fn cross_session_roundtrip() {
        let (mut a, mut b) = pair();
        let a_pk = a.public_key().unwrap();
        let b_pk = b.public_key().unwrap();

        let envelope = a.encrypt(&b_pk, b"meet at noon", [0x07; NONCE_SIZE]).unwrap();
        let plaintext = b.decrypt(&a_pk, &envelope.nonce, &envelope.ciphertext).unwrap();

        assert_eq!(plaintext, b"meet at noon");
    }

    #[test]
    fn self_roundtrip_via_cache() {
        let (mut a, b) = pair();
        let b_pk = b.public_key().unwrap();

        let envelope = a.encrypt(&b_pk, b"echo", [0x08; NONCE_SIZE]).unwrap();
        let plaintext = a.decrypt(&b_pk, &envelope.nonce, &envelope.ciphertext).unwrap();

        assert_eq!(plaintext, b"echo");
    }

    #[test]
    fn tampering_is_an_explicit_authentication_error() {
        let (mut a, mut b) = pair();
        let a_pk = a.public_key().unwrap();
        let b_pk = b.public_key().unwrap();

        let mut envelope = a.encrypt(&b_pk, b"unaltered", [0x09; NONCE_SIZE]).unwrap();
        envelope.ciphertext[4] ^= 0x10;

        let result = b.decrypt(&a_pk, &envelope.nonce, &envelope.ciphertext);
        assert_eq!(result.unwrap_err(), SessionError::Authentication);

        // The session is not poisoned by one bad message
        let envelope = a.encrypt(&b_pk, b"still works", [0x0A; NONCE_SIZE]).unwrap();
        assert_eq!(
            b.decrypt(&a_pk, &envelope.nonce, &envelope.ciphertext).unwrap(),
            b"still works"
        );
    }

    #[test]
    fn safety_numbers_match_across_the_pair() {
        let (a, b) = pair();
        let a_pk = a.public_key().unwrap();
        let b_pk = b.public_key().unwrap();

        assert_eq!(a.safety_number(&b_pk).unwrap(), b.safety_number(&a_pk).unwrap());
    }

    #[test]
    fn clear_closes_every_operation() {
        let (mut a, b) = pair();
        let peer = b.public_key().unwrap();
        a.derive_or_fetch(&peer).unwrap();

        a.clear();

        assert_eq!(a.cached_peers(), 0);
        assert_eq!(a.public_key().unwrap_err(), SessionError::Closed);
        assert_eq!(a.derive_or_fetch(&peer).unwrap_err(), SessionError::Closed);
        assert_eq!(
            a.encrypt(&peer, b"x", [0; NONCE_SIZE]).unwrap_err(),
            SessionError::Closed
        );
        assert_eq!(a.safety_number(&peer).unwrap_err(), SessionError::Closed);
    }
}
