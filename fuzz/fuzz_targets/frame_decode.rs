//! Fuzz target for `Frame::decode`.
//!
//! Feeds arbitrary byte sequences to the frame decoder looking for
//! panics, integer overflows in size handling, and buffer over-reads.
//! Invalid input must always come back as an error, never a crash.

#![no_main]

use hearsay_proto::Frame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = Frame::decode(data);
});
