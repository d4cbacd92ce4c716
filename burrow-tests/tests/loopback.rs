//! Lossy loopback convergence tests
//!
//! Wires two sessions back to back through channel drivers and a
//! deterministic frame-dropping carrier, and checks that every byte
//! still arrives exactly once, in order, before both sides close.

use burrow::io::{ChannelDriver, ChannelHandle};
use burrow::protocol::{Packet, PacketKind, SessionConfig, SessionOptions};
use burrow::Session;
use bytes::Bytes;
use std::time::Duration;

const MAX_FRAME: usize = 32;

fn session(isn: u16) -> (Session, ChannelHandle) {
    let (driver, handle) = ChannelDriver::pair();
    let config = SessionConfig {
        initial_seq: Some(isn),
        retransmit_delay: Duration::ZERO,
        ..SessionConfig::default()
    };
    (Session::new(Box::new(driver), config), handle)
}

/// Only MSG frames are eligible for simulated loss: SYNs have to cross
/// during the simultaneous open below, and a FIN is only ever sent once.
/// Anything a MSG carries is covered by retransmission.
fn droppable(frame: &Bytes) -> bool {
    matches!(
        Packet::from_bytes(frame, SessionOptions::default()).map(|p| p.kind()),
        Ok(PacketKind::Msg)
    )
}

/// Pump frames between the two sessions until both shut down.
///
/// Both sides open simultaneously (their SYNs cross on the carrier), then
/// frames alternate strictly: each side produces its next frame only
/// after processing the peer's latest, the way a query/response carrier
/// naturally sequences them. `drop_every` drops each Nth eligible frame.
fn pump(a: &mut Session, b: &mut Session, drop_every: usize, max_rounds: usize) -> bool {
    let syn_a = a.poll_outgoing(MAX_FRAME);
    let syn_b = b.poll_outgoing(MAX_FRAME);
    if let Some(frame) = syn_a {
        b.handle_incoming(&frame).unwrap();
    }
    if let Some(frame) = syn_b {
        a.handle_incoming(&frame).unwrap();
    }

    let mut counter = 0usize;

    for _ in 0..max_rounds {
        if let Some(frame) = a.poll_outgoing(MAX_FRAME) {
            counter += 1;
            if !(drop_every > 0 && counter % drop_every == 0 && droppable(&frame)) {
                b.handle_incoming(&frame).unwrap();
            }
        }

        if let Some(frame) = b.poll_outgoing(MAX_FRAME) {
            counter += 1;
            if !(drop_every > 0 && counter % drop_every == 0 && droppable(&frame)) {
                a.handle_incoming(&frame).unwrap();
            }
        }

        if a.is_shutdown() && b.is_shutdown() {
            return true;
        }
    }

    false
}

#[test]
fn test_lossless_loopback_delivers_everything() {
    let (mut a, mut a_handle) = session(100);
    let (mut b, b_handle) = session(0xFF00);

    // The initiator runs out of data and closes; the responder never
    // exhausts locally and shuts down when the FIN reaches it.
    a_handle.send(&b"the quick brown fox jumps over the lazy dog"[..]);
    b_handle.send(&b"a shorter reply"[..]);
    a_handle.finish();

    assert!(pump(&mut a, &mut b, 0, 500), "sessions failed to converge");

    assert_eq!(a_handle.drain_received(), b"a shorter reply");
    assert_eq!(
        b_handle.drain_received(),
        b"the quick brown fox jumps over the lazy dog"
    );
}

#[test]
fn test_lossy_loopback_still_delivers_in_order() {
    let (mut a, mut a_handle) = session(7);
    let (mut b, b_handle) = session(0xABCD);

    let outbound: Vec<u8> = (0..200u16).map(|i| (i % 251) as u8).collect();
    a_handle.send(outbound.clone());
    a_handle.finish();

    // Drop every third eligible frame; retransmission covers the gaps.
    assert!(pump(&mut a, &mut b, 3, 2000), "sessions failed to converge");

    assert_eq!(b_handle.drain_received(), outbound);
    assert!(a_handle.drain_received().is_empty());
}

#[test]
fn test_wraparound_sequence_numbers_carry_data() {
    // Both ISNs sit just below the 16-bit boundary, so the transfer
    // crosses the wrap point in both directions.
    let (mut a, mut a_handle) = session(0xFFF0);
    let (mut b, b_handle) = session(0xFFFC);

    let payload: Vec<u8> = (0..100u8).collect();
    a_handle.send(payload.clone());
    b_handle.send(&b"wrapped"[..]);
    a_handle.finish();

    assert!(pump(&mut a, &mut b, 4, 2000), "sessions failed to converge");

    assert_eq!(b_handle.drain_received(), payload);
    assert_eq!(a_handle.drain_received(), b"wrapped");
}

#[test]
fn test_stats_reflect_loopback_traffic() {
    let (mut a, mut a_handle) = session(1);
    let (mut b, _b_handle) = session(2);

    a_handle.send(&b"count me"[..]);
    a_handle.finish();

    assert!(pump(&mut a, &mut b, 0, 500), "sessions failed to converge");

    let stats = b.stats();
    assert_eq!(stats.bytes_received, 8);
    assert!(stats.frames_received > 0);
    assert_eq!(stats.frames_dropped, 0);
}
