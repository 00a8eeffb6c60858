//! Fixed layout of a frame: Ethernet, IPv4 and UDP headers followed by the
//! payload.

use crate::core::repr::{
    EthernetFrame,
    EthernetRepr,
    Ipv4Packet,
    Ipv4Repr,
    UdpPacket,
    UdpRepr,
};
use crate::{
    Error,
    Result,
};

pub const ETHERNET_HEADER_LEN: usize = 14;

pub const IPV4_HEADER_LEN: usize = 20;

pub const UDP_HEADER_LEN: usize = 8;

/// Offset of the IPv4 header within a frame.
pub const IPV4_OFFSET: usize = ETHERNET_HEADER_LEN;

/// Offset of the UDP header within a frame.
pub const UDP_OFFSET: usize = IPV4_OFFSET + IPV4_HEADER_LEN;

/// Offset of the UDP payload within a frame.
pub const PAYLOAD_OFFSET: usize = UDP_OFFSET + UDP_HEADER_LEN;

/// Size of a UDP packet carrying payload_len bytes.
pub fn udp_packet_len(payload_len: usize) -> usize {
    UDP_HEADER_LEN + payload_len
}

/// Size of an IPv4 packet carrying a UDP packet with payload_len bytes.
pub fn ipv4_udp_packet_len(payload_len: usize) -> usize {
    IPV4_HEADER_LEN + udp_packet_len(payload_len)
}

/// Size of a full frame carrying payload_len bytes of UDP payload.
pub fn ethernet_ipv4_udp_frame_len(payload_len: usize) -> usize {
    ETHERNET_HEADER_LEN + ipv4_udp_packet_len(payload_len)
}

/// Typed views onto each header of an assembled frame, plus the bytes
/// following the UDP header.
#[derive(Debug)]
pub struct FramePointers<'a> {
    pub ethernet: EthernetFrame<&'a [u8]>,
    pub ipv4: Ipv4Packet<&'a [u8]>,
    pub udp: UdpPacket<&'a [u8]>,
    pub payload: &'a [u8],
}

impl<'a> FramePointers<'a> {
    /// Returns the payload size announced by the UDP length field.
    pub fn payload_len(&self) -> usize {
        self.udp.payload_len()
    }

    /// Returns the payload trimmed to the UDP length field, ignoring any
    /// link layer padding.
    pub fn udp_payload(&self) -> &'a [u8] {
        let payload_len = std::cmp::min(self.payload_len(), self.payload.len());
        &self.payload[.. payload_len]
    }
}

/// Splits an assembled frame into views onto each header and the payload.
pub fn frame_pointers(buffer: &[u8]) -> Result<FramePointers> {
    if buffer.len() < PAYLOAD_OFFSET {
        return Err(Error::Exhausted);
    }

    Ok(FramePointers {
        ethernet: EthernetFrame::try_new(buffer)?,
        ipv4: Ipv4Packet::try_new(&buffer[IPV4_OFFSET ..])?,
        udp: UdpPacket::try_new(&buffer[UDP_OFFSET ..])?,
        payload: &buffer[PAYLOAD_OFFSET ..],
    })
}

/// Encapsulates a payload into UDP, IPv4 and Ethernet in turn, writing the
/// finished frame into the buffer and returning its size.
///
/// The UDP checksum uses the addresses of the IPv4 header, so the IPv4 header
/// must already be populated.
pub fn encapsulate_udp_frame(
    buffer: &mut [u8],
    ethernet_repr: &EthernetRepr,
    ipv4_repr: &mut Ipv4Repr,
    udp_repr: &mut UdpRepr,
    payload: &[u8],
) -> Result<usize> {
    let frame_len = ethernet_ipv4_udp_frame_len(payload.len());
    if ipv4_udp_packet_len(payload.len()) > Ipv4Packet::<&[u8]>::MAX_PACKET_LEN
        || buffer.len() < frame_len
    {
        return Err(Error::Exhausted);
    }

    let udp_len = udp_repr.encapsulate(&mut buffer[UDP_OFFSET ..], payload, &ipv4_repr.addrs())?;
    let ipv4_len = ipv4_repr.emit_header(&mut buffer[IPV4_OFFSET ..], udp_len)?;
    ethernet_repr.emit_header(buffer, ipv4_len)
}

#[cfg(test)]
mod tests {
    use crate::core::repr::{
        eth_types,
        ipv4_protocols,
        EthernetAddress,
        Ipv4Address,
        Ipv4Params,
    };

    use super::*;

    fn frame(payload: &[u8]) -> Vec<u8> {
        let eth_repr = EthernetRepr::broadcast(
            EthernetAddress::new([0x06, 0x11, 0x22, 0x33, 0x44, 0x55]),
            eth_types::IPV4,
        );
        let mut ipv4_repr = Ipv4Repr::new(
            &Ipv4Params::udp(),
            Ipv4Address::new([10, 0, 0, 1]),
            Ipv4Address::BROADCAST,
        );
        let mut udp_repr = UdpRepr::populate(46772, 4000);

        let mut buffer = vec![0; 1500];
        let frame_len = encapsulate_udp_frame(
            &mut buffer,
            &eth_repr,
            &mut ipv4_repr,
            &mut udp_repr,
            payload,
        ).unwrap();
        buffer.truncate(frame_len);
        buffer
    }

    #[test]
    fn test_frame_lengths() {
        assert_eq!(12, udp_packet_len(4));
        assert_eq!(32, ipv4_udp_packet_len(4));
        assert_eq!(46, ethernet_ipv4_udp_frame_len(4));
    }

    #[test]
    fn test_frame_pointers() {
        let buffer = frame(b"TEST");
        assert_eq!(ethernet_ipv4_udp_frame_len(4), buffer.len());

        let pointers = frame_pointers(&buffer).unwrap();
        assert_eq!(eth_types::IPV4, pointers.ethernet.payload_type());
        assert_eq!(EthernetAddress::BROADCAST, pointers.ethernet.dst_addr());
        assert_eq!(ipv4_protocols::UDP, pointers.ipv4.protocol());
        assert_eq!(32, pointers.ipv4.total_len());
        assert_eq!(Ipv4Address::BROADCAST, pointers.ipv4.dst_addr());
        assert_eq!(46772, pointers.udp.src_port());
        assert_eq!(4000, pointers.udp.dst_port());
        assert_eq!(4, pointers.payload_len());
        assert_eq!(b"TEST", pointers.payload);
    }

    #[test]
    fn test_frame_pointers_ignore_padding() {
        let mut buffer = frame(b"TEST");
        buffer.extend_from_slice(&[0; 14]);

        let pointers = frame_pointers(&buffer).unwrap();
        assert_eq!(18, pointers.payload.len());
        assert_eq!(b"TEST", pointers.udp_payload());
    }

    #[test]
    fn test_frame_matches_layered_encapsulation() {
        let eth_repr = EthernetRepr::broadcast(
            EthernetAddress::new([0x06, 0x11, 0x22, 0x33, 0x44, 0x55]),
            eth_types::IPV4,
        );
        let mut ipv4_repr = Ipv4Repr::new(
            &Ipv4Params::udp(),
            Ipv4Address::new([10, 0, 0, 1]),
            Ipv4Address::BROADCAST,
        );
        let mut udp_repr = UdpRepr::populate(46772, 4000);

        let mut udp_buffer = [0; 12];
        udp_repr.encapsulate(&mut udp_buffer, b"TEST", &ipv4_repr.addrs()).unwrap();
        let mut ipv4_buffer = [0; 32];
        ipv4_repr.encapsulate(&mut ipv4_buffer, &udp_buffer).unwrap();
        let mut expected = [0; 46];
        eth_repr.encapsulate(&mut expected, &ipv4_buffer).unwrap();

        assert_eq!(&expected[..], &frame(b"TEST")[..]);
    }

    #[test]
    fn test_encapsulate_with_small_buffer() {
        let eth_repr = EthernetRepr::broadcast(EthernetAddress::new([0x06; 6]), eth_types::IPV4);
        let mut ipv4_repr = Ipv4Repr::new(
            &Ipv4Params::udp(),
            Ipv4Address::new([10, 0, 0, 1]),
            Ipv4Address::BROADCAST,
        );
        let mut udp_repr = UdpRepr::populate(46772, 4000);

        let mut buffer = [0xAA; 45];
        assert_matches!(
            encapsulate_udp_frame(&mut buffer, &eth_repr, &mut ipv4_repr, &mut udp_repr, b"TEST"),
            Err(Error::Exhausted)
        );
        assert!(buffer.iter().all(|byte| *byte == 0xAA));
    }

    #[test]
    fn test_frame_pointers_with_short_buffer() {
        let buffer = [0; PAYLOAD_OFFSET - 1];
        assert_matches!(frame_pointers(&buffer), Err(Error::Exhausted));
    }
}
