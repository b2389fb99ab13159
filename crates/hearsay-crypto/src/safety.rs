//! Safety numbers for mutual key verification.
//!
//! A safety number is a human-comparable digest of two participants'
//! public keys. Both parties render the same digit groups, so reading
//! them aloud over any out-of-band channel detects key substitution by
//! the relay or the network.

use sha2::{Digest, Sha512};

use crate::keys::KEY_SIZE;

/// Number of digit groups in a rendered safety number.
pub const SAFETY_NUMBER_GROUPS: usize = 12;

/// Decimal digits per group.
const GROUP_DIGITS: u64 = 100_000;

/// Bytes of digest consumed per group.
const BYTES_PER_GROUP: usize = 5;

/// Label for safety-number hashing (domain separation).
const SAFETY_LABEL: &[u8] = b"hearsay safety number v1";

/// Compute the safety number for a pair of public keys.
///
/// The two keys are ordered lexicographically by raw bytes before
/// hashing, so the result is identical regardless of which party
/// computes it. Rendered as 12 space-separated groups of 5 decimal
/// digits (60 digits total).
#[must_use]
pub fn safety_number(a: &[u8; KEY_SIZE], b: &[u8; KEY_SIZE]) -> String {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };

    let mut hasher = Sha512::new();
    hasher.update(SAFETY_LABEL);
    hasher.update(first);
    hasher.update(second);
    let digest = hasher.finalize();

    let mut groups = Vec::with_capacity(SAFETY_NUMBER_GROUPS);
    for chunk in digest.chunks_exact(BYTES_PER_GROUP).take(SAFETY_NUMBER_GROUPS) {
        let mut value = 0u64;
        for &byte in chunk {
            value = (value << 8) | u64::from(byte);
        }
        groups.push(format!("{:05}", value % GROUP_DIGITS));
    }

    groups.join(" ")
}
