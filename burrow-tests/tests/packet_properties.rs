//! Property-based tests for frame serialization and sequence arithmetic
//!
//! These tests use proptest to generate random frames and verify that
//! serialization/deserialization roundtrips correctly for all valid
//! inputs, and that 16-bit sequence arithmetic holds across wraparound.

use burrow_protocol::{Packet, PacketBody, SeqNumber, SessionOptions};
use bytes::Bytes;
use proptest::prelude::*;

fn options_strategy() -> impl Strategy<Value = SessionOptions> {
    (any::<bool>(), any::<bool>()).prop_map(|(name, command)| SessionOptions { name, command })
}

fn payload_strategy() -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 0..=256).prop_map(Bytes::from)
}

proptest! {
    #[test]
    fn prop_syn_roundtrip(
        session_id in any::<u16>(),
        seq in any::<u16>(),
        options in options_strategy(),
        name in proptest::option::of("[a-zA-Z0-9 _-]{1,24}"),
    ) {
        let packet = Packet::syn(session_id, SeqNumber::new(seq), options, name.as_deref());
        let bytes = packet.to_bytes(SessionOptions::default());
        let decoded = Packet::from_bytes(&bytes, SessionOptions::default()).unwrap();

        prop_assert_eq!(decoded.session_id, session_id);
        match decoded.body {
            PacketBody::Syn(syn) => {
                prop_assert_eq!(syn.seq.as_raw(), seq);
                prop_assert_eq!(syn.options.name, name.is_some());
                prop_assert_eq!(syn.options.command, options.command);
                prop_assert_eq!(syn.name, name);
            }
            _ => prop_assert!(false, "expected SYN"),
        }
    }

    #[test]
    fn prop_msg_roundtrip(
        session_id in any::<u16>(),
        seq in any::<u16>(),
        ack in any::<u16>(),
        payload in payload_strategy(),
    ) {
        let packet = Packet::msg(
            session_id,
            SeqNumber::new(seq),
            SeqNumber::new(ack),
            payload.clone(),
        );
        let bytes = packet.to_bytes(SessionOptions::default());
        prop_assert_eq!(
            bytes.len(),
            Packet::msg_overhead(SessionOptions::default()) + payload.len()
        );

        let decoded = Packet::from_bytes(&bytes, SessionOptions::default()).unwrap();
        prop_assert_eq!(decoded.session_id, session_id);
        match decoded.body {
            PacketBody::Msg(msg) => {
                prop_assert_eq!(msg.seq.as_raw(), seq);
                prop_assert_eq!(msg.ack.as_raw(), ack);
                prop_assert_eq!(msg.data, payload);
            }
            _ => prop_assert!(false, "expected MSG"),
        }
    }

    #[test]
    fn prop_fin_roundtrip(
        session_id in any::<u16>(),
        reason in "[a-zA-Z0-9 .!-]{0,40}",
    ) {
        let packet = Packet::fin(session_id, &reason);
        let bytes = packet.to_bytes(SessionOptions::default());
        let decoded = Packet::from_bytes(&bytes, SessionOptions::default()).unwrap();

        prop_assert_eq!(decoded.session_id, session_id);
        match decoded.body {
            PacketBody::Fin(fin) => prop_assert_eq!(fin.reason, reason),
            _ => prop_assert!(false, "expected FIN"),
        }
    }

    #[test]
    fn prop_packet_id_survives_roundtrip(
        session_id in any::<u16>(),
        seq in any::<u16>(),
        ack in any::<u16>(),
    ) {
        let packet = Packet::msg(session_id, SeqNumber::new(seq), SeqNumber::new(ack), Bytes::new());
        let bytes = packet.to_bytes(SessionOptions::default());
        let decoded = Packet::from_bytes(&bytes, SessionOptions::default()).unwrap();

        prop_assert_eq!(decoded.packet_id, packet.packet_id);
    }

    #[test]
    fn prop_truncated_frames_never_panic(
        bytes in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        // Parsing arbitrary garbage must fail cleanly or succeed; the one
        // thing it may never do is panic.
        let _ = Packet::from_bytes(&bytes, SessionOptions::default());
    }

    #[test]
    fn prop_offset_inverts_advance(
        start in any::<u16>(),
        n in any::<u16>(),
    ) {
        let a = SeqNumber::new(start);
        let mut b = a;
        b.advance(n);
        prop_assert_eq!(a.offset_to(b), n);
    }

    #[test]
    fn prop_advance_is_additive_mod_2_16(
        start in any::<u16>(),
        x in any::<u16>(),
        y in any::<u16>(),
    ) {
        let mut one_shot = SeqNumber::new(start);
        one_shot.advance(x.wrapping_add(y));

        let mut stepped = SeqNumber::new(start);
        stepped.advance(x);
        stepped.advance(y);

        prop_assert_eq!(one_shot, stepped);
    }
}
