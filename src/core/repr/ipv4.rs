use std::fmt::{
    Display,
    Formatter,
    Result as FmtResult,
};
use std::io::Write;
use std::result::Result as StdResult;
use std::str::FromStr;

use byteorder::{
    NetworkEndian,
    ReadBytesExt,
    WriteBytesExt,
};

use crate::core::check::ip_header_checksum;
use crate::core::netdev::{
    interface_ipv4_addr,
    System,
};
use crate::{
    Error,
    Result,
};

/// IP version carried in every header.
pub const VERSION: u8 = 4;

/// Header length in 32-bit words of a header without options.
pub const BASIC_IHL: u8 = 5;

/// Time to live commonly used for UDP datagrams.
pub const DEFAULT_UDP_TTL: u8 = 64;

/// [IPv4 address](https://en.wikipedia.org/wiki/IPv4) in network byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address([u8; 4]);

impl Address {
    /// The limited broadcast address, 255.255.255.255.
    pub const BROADCAST: Address = Address([0xFF; 4]);

    /// Creates an IPv4 address from a network byte order buffer.
    pub fn new(addr: [u8; 4]) -> Address {
        Address(addr)
    }

    /// Tries to create an IPv4 address from a network byte order slice.
    pub fn try_new(addr: &[u8]) -> Result<Address> {
        if addr.len() != 4 {
            return Err(Error::Exhausted);
        }

        let mut _addr: [u8; 4] = [0; 4];
        _addr.clone_from_slice(addr);
        Ok(Address(_addr))
    }

    /// Returns a reference to the network byte order representation of the address.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl FromStr for Address {
    type Err = Error;

    /// Parses an Ipv4 address from an A.B.C.D style string.
    fn from_str(addr: &str) -> StdResult<Address, Self::Err> {
        let bytes = addr
            .split('.')
            .map(|token| token.parse::<u8>())
            .collect::<StdResult<Vec<_>, _>>()
            .map_err(|_| Error::Address)?;

        if bytes.len() != 4 {
            return Err(Error::Address);
        }

        let mut ipv4: [u8; 4] = [0; 4];
        ipv4.clone_from_slice(&bytes);

        Ok(Address::new(ipv4))
    }
}

/// Source and destination of a populated header, needed later for the UDP
/// pseudo header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressPair {
    pub src_addr: Address,
    pub dst_addr: Address,
}

/// Flag bits of the flags + fragment offset field.
pub mod flags {
    pub const RESERVED: u16 = 0x8000;

    pub const DONT_FRAGMENT: u16 = 0x4000;

    pub const MORE_FRAGMENTS: u16 = 0x2000;

    pub const MASK: u16 = 0xE000;
}

/// [https://en.wikipedia.org/wiki/List_of_IP_protocol_numbers](https://en.wikipedia.org/wiki/List_of_IP_protocol_numbers)
pub mod protocols {
    pub const ICMP: u8 = 1;

    pub const TCP: u8 = 6;

    pub const UDP: u8 = 17;
}

const FRAGMENT_OFFSET_MASK: u16 = 0x1FFF;

pub(crate) mod fields {
    use std::ops::Range;

    pub const VERSION_IHL: usize = 0;

    pub const TOS: usize = 1;

    pub const TOTAL_LEN: Range<usize> = 2 .. 4;

    pub const ID: Range<usize> = 4 .. 6;

    pub const FLAGS_FRAG_OFFSET: Range<usize> = 6 .. 8;

    pub const TTL: usize = 8;

    pub const PROTOCOL: usize = 9;

    pub const CHECKSUM: Range<usize> = 10 .. 12;

    pub const SRC_ADDR: Range<usize> = 12 .. 16;

    pub const DST_ADDR: Range<usize> = 16 .. 20;
}

/// View of a byte buffer as an IPv4 packet without options.
#[derive(Debug)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> AsRef<[u8]> for Packet<T> {
    fn as_ref(&self) -> &[u8] {
        self.buffer.as_ref()
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> AsMut<[u8]> for Packet<T> {
    fn as_mut(&mut self) -> &mut [u8] {
        self.buffer.as_mut()
    }
}

impl<T: AsRef<[u8]>> Packet<T> {
    pub const HEADER_LEN: usize = 20;

    pub const MAX_PACKET_LEN: usize = 65535;

    /// Tries to create an IPv4 packet view over a byte buffer.
    pub fn try_new(buffer: T) -> Result<Packet<T>> {
        if buffer.as_ref().len() < Self::HEADER_LEN {
            Err(Error::Exhausted)
        } else {
            Ok(Packet { buffer })
        }
    }

    /// Returns the length of an IPv4 packet with the specified payload size.
    pub fn buffer_len(payload_len: usize) -> usize {
        Self::HEADER_LEN + payload_len
    }

    pub fn version(&self) -> u8 {
        self.buffer.as_ref()[fields::VERSION_IHL] >> 4
    }

    /// Header length in 32-bit words.
    pub fn ihl(&self) -> u8 {
        self.buffer.as_ref()[fields::VERSION_IHL] & 0x0F
    }

    pub fn tos(&self) -> u8 {
        self.buffer.as_ref()[fields::TOS]
    }

    pub fn total_len(&self) -> u16 {
        (&self.buffer.as_ref()[fields::TOTAL_LEN])
            .read_u16::<NetworkEndian>()
            .unwrap()
    }

    pub fn id(&self) -> u16 {
        (&self.buffer.as_ref()[fields::ID])
            .read_u16::<NetworkEndian>()
            .unwrap()
    }

    fn flags_frag_offset(&self) -> u16 {
        (&self.buffer.as_ref()[fields::FLAGS_FRAG_OFFSET])
            .read_u16::<NetworkEndian>()
            .unwrap()
    }

    pub fn flags(&self) -> u16 {
        self.flags_frag_offset() & flags::MASK
    }

    pub fn frag_offset(&self) -> u16 {
        self.flags_frag_offset() & FRAGMENT_OFFSET_MASK
    }

    pub fn ttl(&self) -> u8 {
        self.buffer.as_ref()[fields::TTL]
    }

    pub fn protocol(&self) -> u8 {
        self.buffer.as_ref()[fields::PROTOCOL]
    }

    pub fn checksum(&self) -> u16 {
        (&self.buffer.as_ref()[fields::CHECKSUM])
            .read_u16::<NetworkEndian>()
            .unwrap()
    }

    pub fn src_addr(&self) -> Address {
        Address::try_new(&self.buffer.as_ref()[fields::SRC_ADDR]).unwrap()
    }

    pub fn dst_addr(&self) -> Address {
        Address::try_new(&self.buffer.as_ref()[fields::DST_ADDR]).unwrap()
    }

    pub fn header(&self) -> &[u8] {
        &self.buffer.as_ref()[.. Self::HEADER_LEN]
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[Self::HEADER_LEN ..]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    pub fn set_version_ihl(&mut self, version: u8, ihl: u8) {
        self.buffer.as_mut()[fields::VERSION_IHL] = (version << 4) | (ihl & 0x0F);
    }

    pub fn set_tos(&mut self, tos: u8) {
        self.buffer.as_mut()[fields::TOS] = tos;
    }

    pub fn set_total_len(&mut self, total_len: u16) {
        (&mut self.buffer.as_mut()[fields::TOTAL_LEN])
            .write_u16::<NetworkEndian>(total_len)
            .unwrap()
    }

    pub fn set_id(&mut self, id: u16) {
        (&mut self.buffer.as_mut()[fields::ID])
            .write_u16::<NetworkEndian>(id)
            .unwrap()
    }

    pub fn set_flags_frag_offset(&mut self, flags: u16, frag_offset: u16) {
        (&mut self.buffer.as_mut()[fields::FLAGS_FRAG_OFFSET])
            .write_u16::<NetworkEndian>((flags & flags::MASK) | (frag_offset & FRAGMENT_OFFSET_MASK))
            .unwrap()
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.buffer.as_mut()[fields::TTL] = ttl;
    }

    pub fn set_protocol(&mut self, protocol: u8) {
        self.buffer.as_mut()[fields::PROTOCOL] = protocol;
    }

    pub fn set_checksum(&mut self, checksum: u16) {
        (&mut self.buffer.as_mut()[fields::CHECKSUM])
            .write_u16::<NetworkEndian>(checksum)
            .unwrap()
    }

    pub fn set_src_addr(&mut self, addr: Address) {
        (&mut self.buffer.as_mut()[fields::SRC_ADDR])
            .write(addr.as_bytes())
            .unwrap();
    }

    pub fn set_dst_addr(&mut self, addr: Address) {
        (&mut self.buffer.as_mut()[fields::DST_ADDR])
            .write(addr.as_bytes())
            .unwrap();
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[Self::HEADER_LEN ..]
    }
}

/// Header fields chosen by the caller for every datagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Params {
    pub tos: u8,
    pub frag_offset: u16,
    /// Any combination of the `flags` constants.
    pub flags: u16,
    pub ttl: u8,
    pub protocol: u8,
}

impl Params {
    /// Unfragmented UDP with the usual TTL and no type of service.
    pub fn udp() -> Params {
        Params {
            tos: 0,
            frag_offset: 0,
            flags: flags::DONT_FRAGMENT,
            ttl: DEFAULT_UDP_TTL,
            protocol: protocols::UDP,
        }
    }
}

/// Populated IPv4 header with no options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Repr {
    pub tos: u8,
    pub total_len: u16,
    pub id: u16,
    pub flags: u16,
    pub frag_offset: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub src_addr: Address,
    pub dst_addr: Address,
}

impl Repr {
    /// Creates a header from explicit addresses. The total length and
    /// checksum are left at zero until encapsulation.
    pub fn new(params: &Params, src_addr: Address, dst_addr: Address) -> Repr {
        Repr {
            tos: params.tos,
            total_len: 0,
            id: 0,
            flags: params.flags & flags::MASK,
            frag_offset: params.frag_offset & FRAGMENT_OFFSET_MASK,
            ttl: params.ttl,
            protocol: params.protocol,
            checksum: 0,
            src_addr,
            dst_addr,
        }
    }

    /// Populates a point to point header towards a dotted quad destination,
    /// using the address currently assigned to the interface as the source.
    pub fn populate<S: System>(
        system: &S,
        ifname: &str,
        dst_addr: &str,
        params: &Params,
    ) -> Result<(Repr, AddressPair)> {
        let dst_addr = dst_addr.parse::<Address>()?;
        Self::populate_to(system, ifname, dst_addr, params)
    }

    /// Populates a header towards the limited broadcast address, using the
    /// address currently assigned to the interface as the source.
    pub fn populate_broadcast<S: System>(
        system: &S,
        ifname: &str,
        params: &Params,
    ) -> Result<(Repr, AddressPair)> {
        Self::populate_to(system, ifname, Address::BROADCAST, params)
    }

    fn populate_to<S: System>(
        system: &S,
        ifname: &str,
        dst_addr: Address,
        params: &Params,
    ) -> Result<(Repr, AddressPair)> {
        let src_addr = interface_ipv4_addr(system, ifname)?;
        let repr = Repr::new(params, src_addr, dst_addr);

        trace!("Populated IPv4 header {:?} for {}.", repr, ifname);

        Ok((repr, repr.addrs()))
    }

    /// Returns the address pair needed for the UDP pseudo header.
    pub fn addrs(&self) -> AddressPair {
        AddressPair {
            src_addr: self.src_addr,
            dst_addr: self.dst_addr,
        }
    }

    pub fn set_id(&mut self, id: u16) {
        self.id = id;
    }

    /// Sets the total length written by `serialize`. Encapsulation always
    /// replaces it with the size of the packet it assembles.
    pub fn set_total_len(&mut self, total_len: u16) {
        self.total_len = total_len;
    }

    /// Returns the packet size needed to carry a payload of sdu_len bytes.
    pub fn buffer_len(&self, sdu_len: usize) -> usize {
        Packet::<&[u8]>::buffer_len(sdu_len)
    }

    /// Deserializes the header of a packet.
    pub fn deserialize<T>(packet: &Packet<T>) -> Repr
    where
        T: AsRef<[u8]>,
    {
        Repr {
            tos: packet.tos(),
            total_len: packet.total_len(),
            id: packet.id(),
            flags: packet.flags(),
            frag_offset: packet.frag_offset(),
            ttl: packet.ttl(),
            protocol: packet.protocol(),
            checksum: packet.checksum(),
            src_addr: packet.src_addr(),
            dst_addr: packet.dst_addr(),
        }
    }

    /// Serializes every header field, including the checksum as it currently
    /// stands, into a packet.
    pub fn serialize<T>(&self, packet: &mut Packet<T>)
    where
        T: AsRef<[u8]> + AsMut<[u8]>,
    {
        packet.set_version_ihl(VERSION, BASIC_IHL);
        packet.set_tos(self.tos);
        packet.set_total_len(self.total_len);
        packet.set_id(self.id);
        packet.set_flags_frag_offset(self.flags, self.frag_offset);
        packet.set_ttl(self.ttl);
        packet.set_protocol(self.protocol);
        packet.set_checksum(self.checksum);
        packet.set_src_addr(self.src_addr);
        packet.set_dst_addr(self.dst_addr);
    }

    /// Writes the header for an sdu of sdu_len bytes to the front of the
    /// buffer and returns the packet size. The bytes after the header are
    /// left untouched.
    ///
    /// The total length and checksum are recomputed and stored both in the
    /// buffer and in this header.
    pub fn emit_header(&mut self, buffer: &mut [u8], sdu_len: usize) -> Result<usize> {
        let packet_len = self.buffer_len(sdu_len);
        if packet_len > Packet::<&[u8]>::MAX_PACKET_LEN || buffer.len() < packet_len {
            return Err(Error::Exhausted);
        }

        self.total_len = packet_len as u16;
        self.checksum = 0;

        let mut packet = Packet::try_new(&mut buffer[.. packet_len])?;
        self.serialize(&mut packet);

        self.checksum = ip_header_checksum(packet.header(), BASIC_IHL as usize);
        packet.set_checksum(self.checksum);

        Ok(packet_len)
    }

    /// Writes the header followed by the sdu into the buffer and returns the
    /// number of bytes written.
    ///
    /// The total length and checksum are recomputed for the sdu and stored
    /// both in the buffer and in this header.
    pub fn encapsulate(&mut self, buffer: &mut [u8], sdu: &[u8]) -> Result<usize> {
        let packet_len = self.emit_header(buffer, sdu.len())?;
        buffer[Packet::<&[u8]>::HEADER_LEN .. packet_len].copy_from_slice(sdu);
        Ok(packet_len)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::netdev::MockSystem;

    use super::*;

    fn params() -> Params {
        Params {
            tos: 0,
            frag_offset: 0,
            flags: flags::DONT_FRAGMENT,
            ttl: 64,
            protocol: protocols::UDP,
        }
    }

    #[test]
    fn test_address_from_str() {
        assert_eq!(
            Address::new([192, 168, 0, 199]),
            "192.168.0.199".parse::<Address>().unwrap()
        );
        assert_matches!("192.168.0".parse::<Address>(), Err(Error::Address));
        assert_matches!("192.168.0.256".parse::<Address>(), Err(Error::Address));
    }

    #[test]
    fn test_packet_with_buffer_less_than_header() {
        let buffer: [u8; 19] = [0; 19];
        assert_matches!(Packet::try_new(&buffer[..]), Err(Error::Exhausted));
    }

    #[test]
    fn test_packet_getters() {
        let buffer: [u8; 24] = [
            0x45, 0x10, 0x00, 0x18, 0xFF, 0xFF, 0x41, 0x01, 0x02, 0x11, 0xAB, 0xCD, 0x01, 0x02,
            0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x01, 0x00, 0x00, 0x00,
        ];

        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_eq!(4, packet.version());
        assert_eq!(5, packet.ihl());
        assert_eq!(0x10, packet.tos());
        assert_eq!(24, packet.total_len());
        assert_eq!(65535, packet.id());
        assert_eq!(flags::DONT_FRAGMENT, packet.flags());
        assert_eq!(0x101, packet.frag_offset());
        assert_eq!(2, packet.ttl());
        assert_eq!(protocols::UDP, packet.protocol());
        assert_eq!(0xABCD, packet.checksum());
        assert_eq!(Address::new([1, 2, 3, 4]), packet.src_addr());
        assert_eq!(Address::new([5, 6, 7, 8]), packet.dst_addr());
        assert_eq!(4, packet.payload().len());
    }

    #[test]
    fn test_flags_and_offset_share_a_field() {
        let mut buffer = [0; 20];
        let mut packet = Packet::try_new(&mut buffer[..]).unwrap();
        packet.set_flags_frag_offset(flags::RESERVED | flags::MORE_FRAGMENTS, 0xFFFF);
        assert_eq!(flags::RESERVED | flags::MORE_FRAGMENTS, packet.flags());
        assert_eq!(0x1FFF, packet.frag_offset());
        assert_eq!(&buffer[6 .. 8], &[0xBF, 0xFF][..]);
    }

    #[test]
    fn test_encapsulate() {
        let mut repr = Repr::new(
            &params(),
            Address::new([192, 168, 0, 1]),
            Address::new([192, 168, 0, 199]),
        );
        let mut buffer = [0; 128];

        let packet_len = repr.encapsulate(&mut buffer, &[0; 95]).unwrap();
        assert_eq!(115, packet_len);
        assert_eq!(115, repr.total_len);
        assert_eq!(0xB861, repr.checksum);
        assert_eq!(
            &buffer[.. 20],
            &[
                0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0xB8, 0x61, 0xc0,
                0xa8, 0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
            ][..]
        );

        // A second pass starts over from a zero checksum.
        assert_eq!(115, repr.encapsulate(&mut buffer, &[0; 95]).unwrap());
        assert_eq!(0xB861, repr.checksum);

        let packet = Packet::try_new(&buffer[.. packet_len]).unwrap();
        assert_eq!(repr, Repr::deserialize(&packet));
    }

    #[test]
    fn test_total_len_is_replaced_by_encapsulate() {
        let mut repr = Repr::new(&params(), Address::new([10, 0, 0, 1]), Address::BROADCAST);
        repr.set_total_len(1000);

        let mut buffer = [0; 24];
        {
            let mut packet = Packet::try_new(&mut buffer[..]).unwrap();
            repr.serialize(&mut packet);
            assert_eq!(1000, packet.total_len());
        }

        assert_eq!(24, repr.encapsulate(&mut buffer, b"TEST").unwrap());
        assert_eq!(24, repr.total_len);
        assert_eq!(24, Packet::try_new(&buffer[..]).unwrap().total_len());
    }

    #[test]
    fn test_emit_header_keeps_sdu() {
        let mut repr = Repr::new(&params(), Address::new([10, 0, 0, 1]), Address::BROADCAST);
        let mut expected = [0; 24];
        repr.encapsulate(&mut expected, b"TEST").unwrap();

        let mut buffer = [0; 24];
        buffer[20 ..].copy_from_slice(b"TEST");
        assert_eq!(24, repr.emit_header(&mut buffer, 4).unwrap());
        assert_eq!(&expected[..], &buffer[..]);
    }

    #[test]
    fn test_encapsulate_with_small_buffer() {
        let mut repr = Repr::new(&params(), Address::new([0; 4]), Address::BROADCAST);
        let mut buffer = [0; 20];
        assert_matches!(repr.encapsulate(&mut buffer, &[0; 1]), Err(Error::Exhausted));
    }

    #[test]
    fn test_populate() {
        let system = MockSystem::new().with_wireless("wlan0", true);

        let (repr, addrs) = Repr::populate(&system, "wlan0", "10.0.0.2", &params()).unwrap();
        assert_eq!(MockSystem::ipv4_addr_for(0), repr.src_addr);
        assert_eq!(Address::new([10, 0, 0, 2]), repr.dst_addr);
        assert_eq!(repr.addrs(), addrs);
        assert_eq!(0, repr.checksum);

        let (repr, addrs) = Repr::populate_broadcast(&system, "wlan0", &params()).unwrap();
        assert_eq!(Address::BROADCAST, repr.dst_addr);
        assert_eq!(Address::BROADCAST, addrs.dst_addr);
    }

    #[test]
    fn test_populate_errors() {
        let system = MockSystem::new().with_wireless("wlan0", true);
        assert_matches!(
            Repr::populate(&system, "wlan0", "10.0.0", &params()),
            Err(Error::Address)
        );
        assert_matches!(
            Repr::populate_broadcast(&system, "wlan1", &params()),
            Err(Error::NoSourceAddress)
        );

        let system = system.with_socket_failure();
        assert_matches!(
            Repr::populate_broadcast(&system, "wlan0", &params()),
            Err(Error::HeaderSocket(_))
        );
    }
}
