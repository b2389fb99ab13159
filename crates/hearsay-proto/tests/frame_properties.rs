//! Property-based tests for frame encoding and decoding.

use bytes::Bytes;
use hearsay_proto::{Frame, FrameHeader, Opcode, Payload, payloads::chat::ChatSend};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Property: decoding arbitrary bytes never panics and either
    /// produces a structurally valid frame or a typed error.
    #[test]
    fn prop_decode_arbitrary_bytes_is_total(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        if let Ok(frame) = Frame::decode(&bytes) {
            prop_assert_eq!(frame.payload.len() as u32, frame.header.payload_size());
            // Typed decode may still fail (garbage CBOR); it must not panic
            let _ = Payload::from_frame(&frame);
        }
    }

    /// Property: encode-then-decode is the identity for valid frames.
    #[test]
    fn prop_frame_roundtrip(payload in prop::collection::vec(any::<u8>(), 0..2048)) {
        let frame = Frame::new(FrameHeader::new(Opcode::ChatSend), Bytes::from(payload));
        let bytes = frame.to_vec()?;

        let decoded = Frame::decode(&bytes)?;
        prop_assert_eq!(decoded, frame);
    }

    /// Property: a chat envelope survives the full typed round-trip
    /// with every field intact.
    #[test]
    fn prop_chat_envelope_roundtrip(
        ciphertext in prop::collection::vec(any::<u8>(), 0..1024),
        nonce in any::<[u8; 24]>(),
        message_id in any::<[u8; 16]>(),
        target in any::<Option<u64>>(),
    ) {
        let payload = Payload::ChatSend(ChatSend {
            ciphertext,
            nonce,
            message_id,
            target_member_id: target,
        });

        let frame = payload.clone().into_frame()?;
        let bytes = frame.to_vec()?;
        let decoded = Payload::from_frame(&Frame::decode(&bytes)?)?;

        prop_assert_eq!(decoded, payload);
    }

    /// Property: corrupting the magic number always fails decoding.
    #[test]
    fn prop_bad_magic_rejected(byte_index in 0usize..4, corruption in 1u8..) {
        let frame = Frame::new(FrameHeader::new(Opcode::Typing), Bytes::new());
        let mut bytes = frame.to_vec()?;
        bytes[byte_index] ^= corruption;

        prop_assert!(Frame::decode(&bytes).is_err());
    }
}
