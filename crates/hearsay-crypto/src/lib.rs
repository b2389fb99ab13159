//! Hearsay Cryptographic Primitives
//!
//! Cryptographic building blocks for Hearsay. Pure functions with
//! deterministic outputs. Callers provide random bytes (key seeds,
//! nonces) for deterministic testing.
//!
//! # Key Lifecycle
//!
//! Each participant generates one X25519 key pair per chat session and
//! publishes the public half through the relay. For every other room
//! member, a pairwise symmetric key is derived once and reused for the
//! life of the session:
//!
//! ```text
//! X25519 key pair (per session)
//!        │
//!        ▼
//! Diffie-Hellman shared secret (per peer, symmetric on both sides)
//!        │
//!        ▼
//! HKDF-SHA256 → Session Key (32 bytes)
//!        │
//!        ▼
//! XChaCha20-Poly1305 AEAD → Ciphertext (fresh random 24-byte nonce)
//! ```
//!
//! # Security
//!
//! Symmetry:
//! - Both peers derive bit-identical session keys from their own secret
//!   key and the other's public key; without it decryption cannot work
//!
//! Authenticity:
//! - XChaCha20-Poly1305 AEAD rejects any tampered ciphertext or nonce
//! - Failed authentication tag -> explicit error, never wrong plaintext
//!
//! Key hygiene:
//! - Secret keys and derived session keys are zeroized on drop
//! - Nothing here persists key material; lifetime is the owning process
//!
//! Verification:
//! - Safety numbers hash both public keys in canonical order, so both
//!   parties render the same digit groups for manual comparison

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod keys;
mod safety;
mod seal;

pub use error::CryptoError;
pub use keys::{KEY_SIZE, KeyPair, SessionKey, derive_session_key};
pub use safety::{SAFETY_NUMBER_GROUPS, safety_number};
pub use seal::{NONCE_SIZE, TAG_SIZE, open, seal};
