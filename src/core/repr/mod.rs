//! Serialization and deserialization of network packets.
//!
//! The `repr` module provides header representations for the Ethernet, IPv4,
//! UDP and LaMP layers, views over byte buffers for each of them and the
//! encapsulation of a header with its payload into a destination buffer.

pub mod ethernet;
pub mod frame;
pub mod ipv4;
pub mod lamp;
pub mod udp;

pub use self::ethernet::{
    eth_types,
    Address as EthernetAddress,
    AddressKind as EthernetAddressKind,
    Frame as EthernetFrame,
    Repr as EthernetRepr,
};
pub use self::frame::{
    encapsulate_udp_frame,
    frame_pointers,
    FramePointers,
};
pub use self::ipv4::{
    flags as ipv4_flags,
    protocols as ipv4_protocols,
    Address as Ipv4Address,
    AddressPair as Ipv4AddressPair,
    Packet as Ipv4Packet,
    Params as Ipv4Params,
    Repr as Ipv4Repr,
};
pub use self::lamp::{
    packet_pointers as lamp_packet_pointers,
    Packet as LampPacket,
    Repr as LampRepr,
};
pub use self::udp::{
    Packet as UdpPacket,
    Repr as UdpRepr,
};
