#[macro_use]
extern crate clap;
extern crate env_logger;
extern crate rawsock;

use std::thread;
use std::time::Duration;

use rawsock::core::link::Link;
use rawsock::core::repr::frame::ethernet_ipv4_udp_frame_len;
use rawsock::core::repr::{
    encapsulate_udp_frame,
    eth_types,
    EthernetAddressKind,
    EthernetRepr,
    Ipv4Params,
    Ipv4Repr,
    UdpRepr,
};
use rawsock::core::wlan::{
    discover_wireless_interfaces,
    Query,
};
use rawsock::linux::link::PacketSocket;
use rawsock::linux::netdev::Linux;

const MAX_PAYLOAD_LEN: usize = 1470;

const SRC_PORT: u16 = 46772;

/// Identification of every datagram sent.
const START_ID: u16 = 11349;

/// Periodically broadcasts a UDP datagram carrying PAYLOAD over a wireless
/// interface.
fn main() {
    env_logger::init();

    let matches = clap_app!(app =>
        (@arg PORT: +takes_value +required "Destination UDP port")
        (@arg PERIOD: +takes_value +required "Seconds between datagrams, fractions allowed")
        (@arg PAYLOAD: +takes_value +required "Text carried by each datagram")
        (@arg INDEX: --index +takes_value "Index of the wireless interface to use")
    ).get_matches();

    let port = matches
        .value_of("PORT")
        .and_then(|port| port.parse::<u16>().ok())
        .expect("Bad UDP port!");

    let period = matches
        .value_of("PERIOD")
        .and_then(|period| period.parse::<f64>().ok())
        .filter(|period| *period > 0.0)
        .expect("Bad period!");
    let period = Duration::new(period.trunc() as u64, (period.fract() * 1e9) as u32);

    let payload = matches.value_of("PAYLOAD").unwrap().as_bytes();
    if payload.len() > MAX_PAYLOAD_LEN {
        panic!(
            "Payload of {} bytes is over the maximum of {}!",
            payload.len(),
            MAX_PAYLOAD_LEN
        );
    }

    let index = matches
        .value_of("INDEX")
        .unwrap_or("0")
        .parse::<usize>()
        .expect("Bad interface index!");

    let system = Linux::new();
    let discovery = discover_wireless_interfaces(&system, index, Query::all())
        .expect("Wireless interface lookup failed!");
    let interface = discovery.interface;

    let src_addr = interface.hardware_addr.expect("No source MAC address!");
    if src_addr.kind() == EthernetAddressKind::Broadcast {
        panic!("Could not retrieve source MAC address!");
    }

    let mut socket = PacketSocket::bind(interface.index.expect("No interface index!"))
        .expect("Binding packet socket failed!");
    socket
        .set_broadcast(true)
        .expect("Setting SO_BROADCAST failed!");

    let eth_repr = EthernetRepr::broadcast(src_addr, eth_types::IPV4);
    let (mut ipv4_repr, _) = Ipv4Repr::populate_broadcast(&system, &interface.name, &Ipv4Params::udp())
        .expect("Populating IPv4 header failed!");
    let mut udp_repr = UdpRepr::populate(SRC_PORT, port);

    let mut buffer = vec![0; ethernet_ipv4_udp_frame_len(payload.len())];

    println!(
        "Broadcasting to port {} over {} every {:?}.",
        port, interface.name, period
    );

    loop {
        thread::sleep(period);

        ipv4_repr.set_id(START_ID);
        let frame_len = encapsulate_udp_frame(
            &mut buffer,
            &eth_repr,
            &mut ipv4_repr,
            &mut udp_repr,
            payload,
        ).expect("Encapsulation failed!");

        if let Err(err) = socket.send(&buffer[.. frame_len]) {
            eprintln!("Sending broadcast datagram failed: {}.", err);
            break;
        }
    }
}
