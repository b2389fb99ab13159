//! Fuzz target for `Payload::decode`.
//!
//! Runs arbitrary bytes through the CBOR payload decoder under every
//! opcode, covering malformed CBOR, type confusion between opcodes, and
//! oversized collections. Invalid input must always come back as an
//! error, never a crash.

#![no_main]

use hearsay_proto::{Opcode, Payload};
use libfuzzer_sys::fuzz_target;

const OPCODES: [Opcode; 16] = [
    Opcode::Join,
    Opcode::Leave,
    Opcode::ChatSend,
    Opcode::Typing,
    Opcode::CallStart,
    Opcode::CallSignal,
    Opcode::CallEnd,
    Opcode::Joined,
    Opcode::MemberJoined,
    Opcode::MemberLeft,
    Opcode::ChatDeliver,
    Opcode::TypingUpdate,
    Opcode::CallIncoming,
    Opcode::CallSignalDeliver,
    Opcode::CallEnded,
    Opcode::Error,
];

fuzz_target!(|data: &[u8]| {
    for opcode in OPCODES {
        let _ = Payload::decode(opcode, data);
    }
});
