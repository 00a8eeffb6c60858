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

use crate::{
    Error,
    Result,
};

/// [MAC address](https://en.wikipedia.org/wiki/MAC_address) in network byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address([u8; 6]);

/// Classification of an optional MAC address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressKind {
    /// No address at all.
    Null,
    Broadcast,
    Unicast,
    Multicast,
}

impl Address {
    pub const BROADCAST: Address = Address([0xFF; 6]);

    /// First byte tagging a multicast group address.
    pub const MULTICAST_TAG: u8 = 0x01;

    /// Creates a MAC address from a network byte order buffer.
    pub fn new(addr: [u8; 6]) -> Address {
        Address(addr)
    }

    /// Creates an address to be filled in by an interface lookup.
    ///
    /// The address starts out as the broadcast address, so a lookup that
    /// could not resolve it leaves a value classified as broadcast.
    pub fn unresolved() -> Address {
        Address::BROADCAST
    }

    /// Tries to creates a MAC address from a network byte order slice.
    pub fn try_new(addr: &[u8]) -> Result<Address> {
        if addr.len() != 6 {
            return Err(Error::Exhausted);
        }

        let mut _addr: [u8; 6] = [0; 6];
        _addr.clone_from_slice(addr);
        Ok(Address(_addr))
    }

    /// Returns a reference to the network byte order representation of the
    /// address.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Classifies the address by its multicast tag and the broadcast pattern.
    pub fn kind(&self) -> AddressKind {
        if self.0[0] == Self::MULTICAST_TAG {
            AddressKind::Multicast
        } else if self.is_broadcast() {
            AddressKind::Broadcast
        } else {
            AddressKind::Unicast
        }
    }

    /// Classifies an address which may be absent.
    pub fn kind_of(addr: Option<&Address>) -> AddressKind {
        match addr {
            Some(addr) => addr.kind(),
            None => AddressKind::Null,
        }
    }

    // Checks if this is a unicast address.
    pub fn is_unicast(&self) -> bool {
        self.kind() == AddressKind::Unicast
    }

    // Checks if this is a multicast address.
    pub fn is_multicast(&self) -> bool {
        self.kind() == AddressKind::Multicast
    }

    /// Checks if this is a broadcast address.
    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xFF; 6]
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5],
        )
    }
}

impl FromStr for Address {
    type Err = Error;

    /// Parses a MAC address from an A:B:C:D:E:F style string.
    fn from_str(addr: &str) -> StdResult<Address, Self::Err> {
        let bytes = addr
            .split(':')
            .map(|token| u8::from_str_radix(token, 16))
            .collect::<StdResult<Vec<_>, _>>()
            .map_err(|_| Error::Address)?;

        if bytes.len() != 6 {
            return Err(Error::Address);
        }

        let mut mac: [u8; 6] = [0; 6];
        mac.clone_from_slice(&bytes);

        Ok(Address::new(mac))
    }
}

/// [https://en.wikipedia.org/wiki/EtherType](https://en.wikipedia.org/wiki/EtherType)
pub mod eth_types {
    pub const IPV4: u16 = 0x0800;

    pub const ARP: u16 = 0x0806;

    /// ETSI GeoNetworking.
    pub const GEONET: u16 = 0x8947;

    /// IEEE 1609.3 WAVE Short Message Protocol.
    pub const WSMP: u16 = 0x88DC;

    /// Local experimental ethertype, used for LaMP carried directly over
    /// Ethernet.
    pub const LAMP: u16 = 0x88B5;
}

mod fields {
    use std::ops::{
        Range,
        RangeFrom,
    };

    pub const DST_ADDR: Range<usize> = 0 .. 6;

    pub const SRC_ADDR: Range<usize> = 6 .. 12;

    pub const PAYLOAD_TYPE: Range<usize> = 12 .. 14;

    pub const PAYLOAD: RangeFrom<usize> = 14 ..;
}

/// View of a byte buffer as an Ethernet frame.
#[derive(Debug)]
pub struct Frame<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> AsRef<[u8]> for Frame<T> {
    fn as_ref(&self) -> &[u8] {
        self.buffer.as_ref()
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> AsMut<[u8]> for Frame<T> {
    fn as_mut(&mut self) -> &mut [u8] {
        self.buffer.as_mut()
    }
}

impl<T: AsRef<[u8]>> Frame<T> {
    pub const HEADER_LEN: usize = 14;

    /// Tries to create an Ethernet frame view over a byte buffer.
    pub fn try_new(buffer: T) -> Result<Frame<T>> {
        if buffer.as_ref().len() < Self::HEADER_LEN {
            Err(Error::Exhausted)
        } else {
            Ok(Frame { buffer })
        }
    }

    /// Returns the length of an Ethernet frame with the specified payload size.
    pub fn buffer_len(payload_len: usize) -> usize {
        Self::HEADER_LEN + payload_len
    }

    pub fn dst_addr(&self) -> Address {
        Address::try_new(&self.buffer.as_ref()[fields::DST_ADDR]).unwrap()
    }

    pub fn src_addr(&self) -> Address {
        Address::try_new(&self.buffer.as_ref()[fields::SRC_ADDR]).unwrap()
    }

    pub fn payload_type(&self) -> u16 {
        (&self.buffer.as_ref()[fields::PAYLOAD_TYPE])
            .read_u16::<NetworkEndian>()
            .unwrap()
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[fields::PAYLOAD]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Frame<T> {
    pub fn set_dst_addr(&mut self, addr: Address) {
        (&mut self.buffer.as_mut()[fields::DST_ADDR])
            .write(addr.as_bytes())
            .unwrap();
    }

    pub fn set_src_addr(&mut self, addr: Address) {
        (&mut self.buffer.as_mut()[fields::SRC_ADDR])
            .write(addr.as_bytes())
            .unwrap();
    }

    pub fn set_payload_type(&mut self, payload_type: u16) {
        (&mut self.buffer.as_mut()[fields::PAYLOAD_TYPE])
            .write_u16::<NetworkEndian>(payload_type)
            .unwrap();
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[fields::PAYLOAD]
    }
}

/// Populated Ethernet header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Repr {
    pub dst_addr: Address,
    pub src_addr: Address,
    pub ethertype: u16,
}

impl Repr {
    /// Populates a header addressed to a specific station.
    pub fn new(src_addr: Address, dst_addr: Address, ethertype: u16) -> Repr {
        Repr {
            dst_addr,
            src_addr,
            ethertype,
        }
    }

    /// Populates a header addressed to every station on the link.
    pub fn broadcast(src_addr: Address, ethertype: u16) -> Repr {
        Repr::new(src_addr, Address::BROADCAST, ethertype)
    }

    /// Returns the frame size needed to carry a payload of sdu_len bytes.
    pub fn buffer_len(&self, sdu_len: usize) -> usize {
        Frame::<&[u8]>::buffer_len(sdu_len)
    }

    /// Tries to deserialize a frame into an Ethernet header.
    pub fn deserialize<T>(frame: &Frame<T>) -> Repr
    where
        T: AsRef<[u8]>,
    {
        Repr {
            dst_addr: frame.dst_addr(),
            src_addr: frame.src_addr(),
            ethertype: frame.payload_type(),
        }
    }

    /// Serializes the Ethernet header into a frame.
    pub fn serialize<T>(&self, frame: &mut Frame<T>)
    where
        T: AsRef<[u8]> + AsMut<[u8]>,
    {
        frame.set_dst_addr(self.dst_addr);
        frame.set_src_addr(self.src_addr);
        frame.set_payload_type(self.ethertype);
    }

    /// Writes the header for an sdu of sdu_len bytes to the front of the
    /// buffer and returns the frame size. The bytes after the header are
    /// left untouched.
    pub fn emit_header(&self, buffer: &mut [u8], sdu_len: usize) -> Result<usize> {
        let frame_len = self.buffer_len(sdu_len);
        if buffer.len() < frame_len {
            return Err(Error::Exhausted);
        }

        let mut frame = Frame::try_new(&mut buffer[.. frame_len])?;
        self.serialize(&mut frame);

        Ok(frame_len)
    }

    /// Writes the header followed by the sdu into the buffer and returns the
    /// number of bytes written.
    pub fn encapsulate(&self, buffer: &mut [u8], sdu: &[u8]) -> Result<usize> {
        let frame_len = self.emit_header(buffer, sdu.len())?;
        buffer[Frame::<&[u8]>::HEADER_LEN .. frame_len].copy_from_slice(sdu);
        Ok(frame_len)
    }
}
