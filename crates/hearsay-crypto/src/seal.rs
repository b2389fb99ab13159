//! Authenticated encryption using `XChaCha20-Poly1305`.
//!
//! Pure functions; the nonce is provided by the caller and MUST be
//! fresh random bytes for every call under a given key. The 24-byte
//! XChaCha20 nonce makes random generation collision-safe for any
//! realistic message volume.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};

use crate::{error::CryptoError, keys::SessionKey};

/// Nonce size for `XChaCha20-Poly1305` (24 bytes).
pub const NONCE_SIZE: usize = 24;

/// Poly1305 authentication tag size appended to every ciphertext.
pub const TAG_SIZE: usize = 16;

/// Encrypt and authenticate `plaintext` under `key`.
///
/// Returns the ciphertext with the 16-byte tag appended.
///
/// # Errors
///
/// - `CryptoError::Encryption` if the primitive reports a failure.
///   Fail-closed: no output of any kind is produced on error.
pub fn seal(
    key: &SessionKey,
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    cipher.encrypt(XNonce::from_slice(nonce), plaintext).map_err(|_| CryptoError::Encryption)
}

/// Verify and decrypt `ciphertext` under `key`.
///
/// # Errors
///
/// - `CryptoError::Authentication` if the tag does not verify
///   (tampering, corruption, or wrong key). Never returns incorrect
///   plaintext.
pub fn open(
    key: &SessionKey,
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    cipher.decrypt(XNonce::from_slice(nonce), ciphertext).map_err(|_| CryptoError::Authentication)
}
