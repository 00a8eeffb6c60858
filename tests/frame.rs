#[macro_use]
extern crate assert_matches;
#[macro_use]
extern crate lazy_static;
extern crate rand;
extern crate rawsock;

mod context;

use rand::Rng;

use rawsock::core::link::Link;
use rawsock::core::netdev::MockSystem;
use rawsock::core::repr::frame::PAYLOAD_OFFSET;
use rawsock::core::repr::{
    eth_types,
    frame_pointers,
    ipv4_flags,
    ipv4_protocols,
    EthernetAddress,
    Ipv4Address,
};
use rawsock::core::validate::{
    inject_ipv4_checksum_error,
    inject_udp_checksum_error,
    validate_checksum,
    ChecksumKind,
};
use rawsock::Error;

use context::Loopback;

/// Validates a received frame the way a receiver does and returns its payload.
fn receive(frame: &mut [u8]) -> Option<Vec<u8>> {
    let (udp_checksum, ipv4_checksum, payload_len) = {
        let pointers = frame_pointers(frame).unwrap();
        (
            pointers.udp.checksum(),
            pointers.ipv4.checksum(),
            pointers.payload_len(),
        )
    };

    if validate_checksum(
        frame,
        udp_checksum,
        Some(ipv4_checksum),
        ChecksumKind::UdpIp,
        Some(payload_len),
    ) {
        Some(frame_pointers(frame).unwrap().udp_payload().to_vec())
    } else {
        None
    }
}

#[test]
fn broadcast_frame_layout() {
    let system = context::system();
    let frame = context::broadcast_frame(&system, 0, 11349, b"Hello, world!");
    let pointers = frame_pointers(&frame).unwrap();

    assert_eq!(EthernetAddress::BROADCAST, pointers.ethernet.dst_addr());
    assert_eq!(MockSystem::ethernet_addr_for(1), pointers.ethernet.src_addr());
    assert_eq!(eth_types::IPV4, pointers.ethernet.payload_type());

    assert_eq!(4, pointers.ipv4.version());
    assert_eq!(5, pointers.ipv4.ihl());
    assert_eq!(41, pointers.ipv4.total_len());
    assert_eq!(11349, pointers.ipv4.id());
    assert_eq!(ipv4_flags::DONT_FRAGMENT, pointers.ipv4.flags());
    assert_eq!(0, pointers.ipv4.frag_offset());
    assert_eq!(64, pointers.ipv4.ttl());
    assert_eq!(ipv4_protocols::UDP, pointers.ipv4.protocol());
    assert_eq!(MockSystem::ipv4_addr_for(1), pointers.ipv4.src_addr());
    assert_eq!(Ipv4Address::BROADCAST, pointers.ipv4.dst_addr());

    assert_eq!(context::SRC_PORT, pointers.udp.src_port());
    assert_eq!(context::DST_PORT, pointers.udp.dst_port());
    assert_eq!(21, pointers.udp.length());
    assert_eq!(b"Hello, world!", pointers.udp_payload());
}

#[test]
fn interface_index_selects_source() {
    let system = context::system();
    let frame = context::broadcast_frame(&system, 1, 0, b"TEST");
    let pointers = frame_pointers(&frame).unwrap();

    assert_eq!(MockSystem::ethernet_addr_for(2), pointers.ethernet.src_addr());
    assert_eq!(MockSystem::ipv4_addr_for(2), pointers.ipv4.src_addr());
}

#[test]
fn send_and_receive_random_payloads() {
    let system = context::system();
    let mut link = Loopback::new();
    let mut payloads = vec![vec![], context::random_payload(context::MAX_PAYLOAD_LEN)];

    for _ in 0 .. 64 {
        payloads.push(context::random_payload(context::random_payload_len()));
    }

    for (id, payload) in payloads.iter().enumerate() {
        let frame = context::broadcast_frame(&system, 0, id as u16, payload);
        link.send(&frame).unwrap();
    }

    let mut buffer = vec![0; 1514];
    for payload in payloads.iter() {
        let frame_len = link.recv(&mut buffer).unwrap();
        assert_eq!(PAYLOAD_OFFSET + payload.len(), frame_len);
        assert_eq!(Some(payload.clone()), receive(&mut buffer[.. frame_len]));
    }

    assert_matches!(link.recv(&mut buffer), Err(Error::Exhausted));
}

#[test]
fn corrupted_payload_is_discarded() {
    let system = context::system();
    let mut rng = rand::thread_rng();

    for _ in 0 .. 64 {
        let payload_len = rng.gen_range(1, context::MAX_PAYLOAD_LEN + 1);
        let mut frame =
            context::broadcast_frame(&system, 0, 0, &context::random_payload(payload_len));
        let original = frame.clone();

        let i = PAYLOAD_OFFSET + rng.gen_range(0, payload_len);
        frame[i] ^= 1 << rng.gen_range(0, 8);
        let corrupted = frame.clone();

        assert_eq!(None, receive(&mut frame));
        assert_eq!(corrupted, frame);

        frame[i] = original[i];
        assert!(receive(&mut frame).is_some());
    }
}

#[test]
fn injected_checksum_errors_are_discarded() {
    let system = context::system();
    let payload = context::random_payload(256);

    let mut frame = context::broadcast_frame(&system, 0, 0, &payload);
    inject_ipv4_checksum_error(&mut frame[14 ..]).unwrap();
    assert_eq!(None, receive(&mut frame));

    let mut frame = context::broadcast_frame(&system, 0, 0, &payload);
    inject_udp_checksum_error(&mut frame[34 ..]).unwrap();
    assert_eq!(None, receive(&mut frame));

    let mut frame = context::broadcast_frame(&system, 0, 0, &payload);
    assert_eq!(Some(payload), receive(&mut frame));
}

#[test]
fn revalidation_is_stable() {
    let system = context::system();
    let mut frame = context::broadcast_frame(&system, 0, 0, b"TEST");
    let original = frame.clone();

    for _ in 0 .. 3 {
        assert_eq!(Some(b"TEST".to_vec()), receive(&mut frame));
        assert_eq!(original, frame);
    }
}
