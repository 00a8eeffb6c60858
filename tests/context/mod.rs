use std::collections::VecDeque;

use rand::Rng;

use rawsock::core::link::Link;
use rawsock::core::netdev::MockSystem;
use rawsock::core::repr::frame::ethernet_ipv4_udp_frame_len;
use rawsock::core::repr::{
    encapsulate_udp_frame,
    eth_types,
    EthernetRepr,
    Ipv4Params,
    Ipv4Repr,
    UdpRepr,
};
use rawsock::core::wlan::{
    discover_wireless_interfaces,
    Query,
};
use rawsock::{
    Error,
    Result,
};

pub const SRC_PORT: u16 = 46772;

pub const DST_PORT: u16 = 4000;

pub const MAX_PAYLOAD_LEN: usize = 1470;

lazy_static! {
    /// Interfaces as enumerated: a wired one, two wireless ones which are up
    /// and a wireless one which is down.
    pub static ref INTERFACES: Vec<(&'static str, bool, bool)> = vec![
        ("eth0", false, true),
        ("wlan0", true, true),
        ("wlan1", true, true),
        ("wlan2", true, false),
    ];
}

/// Builds a system with every interface in INTERFACES.
pub fn system() -> MockSystem {
    INTERFACES
        .iter()
        .fold(MockSystem::new(), |system, &(name, wireless, up)| {
            system.with_interface(name, wireless, up)
        })
}

/// A link which hands back every frame sent across it, in order.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct Loopback {
    frames: VecDeque<Vec<u8>>,
}

impl Loopback {
    pub fn new() -> Loopback {
        Loopback::default()
    }
}

impl Link for Loopback {
    fn send(&mut self, buffer: &[u8]) -> Result<()> {
        self.frames.push_back(buffer.to_vec());
        Ok(())
    }

    fn recv(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let frame = self.frames.pop_front().ok_or(Error::Exhausted)?;
        let frame_len = std::cmp::min(frame.len(), buffer.len());
        buffer[.. frame_len].copy_from_slice(&frame[.. frame_len]);
        Ok(frame_len)
    }
}

/// Returns len random bytes.
#[allow(dead_code)]
pub fn random_payload(len: usize) -> Vec<u8> {
    (0 .. len).map(|_| rand::random::<u8>()).collect()
}

/// Returns a random payload length, up to the largest allowed.
#[allow(dead_code)]
pub fn random_payload_len() -> usize {
    rand::thread_rng().gen_range(0, MAX_PAYLOAD_LEN + 1)
}

/// Builds a broadcast frame carrying payload the way a sender would: selecting
/// the wireless interface, populating each header and encapsulating.
pub fn broadcast_frame(system: &MockSystem, index: usize, id: u16, payload: &[u8]) -> Vec<u8> {
    let interface = discover_wireless_interfaces(system, index, Query::all())
        .unwrap()
        .interface;

    let eth_repr = EthernetRepr::broadcast(interface.hardware_addr.unwrap(), eth_types::IPV4);
    let (mut ipv4_repr, _) =
        Ipv4Repr::populate_broadcast(system, &interface.name, &Ipv4Params::udp()).unwrap();
    let mut udp_repr = UdpRepr::populate(SRC_PORT, DST_PORT);

    ipv4_repr.set_id(id);

    let mut buffer = vec![0; ethernet_ipv4_udp_frame_len(payload.len())];
    let frame_len = encapsulate_udp_frame(
        &mut buffer,
        &eth_repr,
        &mut ipv4_repr,
        &mut udp_repr,
        payload,
    ).unwrap();
    assert_eq!(buffer.len(), frame_len);

    buffer
}
