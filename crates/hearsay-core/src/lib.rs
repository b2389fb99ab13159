//! Hearsay core abstractions.
//!
//! The protocol state machines in `hearsay-client` and `hearsay-server`
//! are Sans-IO: they never touch the system clock, the OS RNG, or a
//! socket directly. Everything they need from the outside world flows in
//! through the [`env::Environment`] trait defined here, which is the
//! seam that makes every state machine deterministic under test.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;

pub use env::Environment;
