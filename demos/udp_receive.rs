#[macro_use]
extern crate clap;
extern crate env_logger;
extern crate rawsock;

use rawsock::core::link::Link;
use rawsock::core::repr::{
    eth_types,
    frame_pointers,
    ipv4_protocols,
};
use rawsock::core::validate::{
    validate_checksum,
    ChecksumKind,
};
use rawsock::core::wlan::{
    discover_wireless_interfaces,
    Query,
};
use rawsock::linux::link::PacketSocket;
use rawsock::linux::netdev::Linux;

const ETHERNET_MTU: usize = 1500;

/// Receives UDP datagrams on a wireless interface, discarding any with a bad
/// UDP or IPv4 checksum, and prints their payload.
fn main() {
    env_logger::init();

    let matches = clap_app!(app =>
        (@arg PORT: --port +takes_value "Only print datagrams sent to this UDP port")
        (@arg INDEX: --index +takes_value "Index of the wireless interface to use")
    ).get_matches();

    let port = matches
        .value_of("PORT")
        .map(|port| port.parse::<u16>().expect("Bad UDP port!"));

    let index = matches
        .value_of("INDEX")
        .unwrap_or("0")
        .parse::<usize>()
        .expect("Bad interface index!");

    let discovery = discover_wireless_interfaces(&Linux::new(), index, Query::all())
        .expect("Wireless interface lookup failed!");
    let interface = discovery.interface;
    let ifindex = interface.index.expect("No interface index!");

    let mut socket = PacketSocket::bind(ifindex).expect("Binding packet socket failed!");

    println!(
        "Using interface: {} - index: {:#04x} - number of interfaces: {}",
        interface.name, ifindex, discovery.count
    );
    println!("Ready to receive datagrams.");

    let mut buffer = vec![0; ETHERNET_MTU + 14];

    loop {
        let frame_len = match socket.recv(&mut buffer) {
            Ok(frame_len) => frame_len,
            Err(err) => {
                eprintln!("Receiving failed: {}.", err);
                break;
            }
        };

        let (udp_checksum, ipv4_checksum, payload_len) = {
            let pointers = match frame_pointers(&buffer[.. frame_len]) {
                Ok(pointers) => pointers,
                Err(_) => continue,
            };

            if pointers.ethernet.payload_type() != eth_types::IPV4
                || pointers.ipv4.protocol() != ipv4_protocols::UDP
                || port.map_or(false, |port| pointers.udp.dst_port() != port)
            {
                continue;
            }

            (
                pointers.udp.checksum(),
                pointers.ipv4.checksum(),
                pointers.payload_len(),
            )
        };

        if !validate_checksum(
            &mut buffer[.. frame_len],
            udp_checksum,
            Some(ipv4_checksum),
            ChecksumKind::UdpIp,
            Some(payload_len),
        ) {
            eprintln!("Wrong checksum! Packet will be discarded.");
            continue;
        }

        if let Ok(pointers) = frame_pointers(&buffer[.. frame_len]) {
            println!("Received a new packet from {}", pointers.ipv4.src_addr());
            println!("Payload: {}", String::from_utf8_lossy(pointers.udp_payload()));
        }
    }
}
