use byteorder::{
    NetworkEndian,
    ReadBytesExt,
    WriteBytesExt,
};

use crate::core::check::udp_checksum;
use crate::core::repr::Ipv4AddressPair;
use crate::{
    Error,
    Result,
};

/// [https://en.wikipedia.org/wiki/User_Datagram_Protocol](https://en.wikipedia.org/wiki/User_Datagram_Protocol)
pub(crate) mod fields {
    use std::ops::Range;

    pub const SRC_PORT: Range<usize> = 0 .. 2;

    pub const DST_PORT: Range<usize> = 2 .. 4;

    pub const LENGTH: Range<usize> = 4 .. 6;

    pub const CHECKSUM: Range<usize> = 6 .. 8;
}

/// View of a byte buffer as a UDP packet.
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
    pub const HEADER_LEN: usize = 8;

    pub const MAX_PACKET_LEN: usize = 65535;

    /// Tries to create a UDP packet view over a byte buffer.
    pub fn try_new(buffer: T) -> Result<Packet<T>> {
        if buffer.as_ref().len() < Self::HEADER_LEN {
            Err(Error::Exhausted)
        } else {
            Ok(Packet { buffer })
        }
    }

    /// Returns the length of a UDP packet with the specified payload size.
    pub fn buffer_len(payload_len: usize) -> usize {
        Self::HEADER_LEN + payload_len
    }

    pub fn src_port(&self) -> u16 {
        (&self.buffer.as_ref()[fields::SRC_PORT])
            .read_u16::<NetworkEndian>()
            .unwrap()
    }

    pub fn dst_port(&self) -> u16 {
        (&self.buffer.as_ref()[fields::DST_PORT])
            .read_u16::<NetworkEndian>()
            .unwrap()
    }

    pub fn length(&self) -> u16 {
        (&self.buffer.as_ref()[fields::LENGTH])
            .read_u16::<NetworkEndian>()
            .unwrap()
    }

    pub fn checksum(&self) -> u16 {
        (&self.buffer.as_ref()[fields::CHECKSUM])
            .read_u16::<NetworkEndian>()
            .unwrap()
    }

    /// Returns the payload size announced by the length field.
    pub fn payload_len(&self) -> usize {
        (self.length() as usize).saturating_sub(Self::HEADER_LEN)
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[Self::HEADER_LEN ..]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    pub fn set_src_port(&mut self, port: u16) {
        (&mut self.buffer.as_mut()[fields::SRC_PORT])
            .write_u16::<NetworkEndian>(port)
            .unwrap()
    }

    pub fn set_dst_port(&mut self, port: u16) {
        (&mut self.buffer.as_mut()[fields::DST_PORT])
            .write_u16::<NetworkEndian>(port)
            .unwrap()
    }

    pub fn set_length(&mut self, length: u16) {
        (&mut self.buffer.as_mut()[fields::LENGTH])
            .write_u16::<NetworkEndian>(length)
            .unwrap()
    }

    pub fn set_checksum(&mut self, checksum: u16) {
        (&mut self.buffer.as_mut()[fields::CHECKSUM])
            .write_u16::<NetworkEndian>(checksum)
            .unwrap()
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[Self::HEADER_LEN ..]
    }
}

/// Populated UDP header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Repr {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16,
    pub checksum: u16,
}

impl Repr {
    /// Populates a header between two ports. The length and checksum are left
    /// at zero until encapsulation.
    pub fn populate(src_port: u16, dst_port: u16) -> Repr {
        Repr {
            src_port,
            dst_port,
            length: 0,
            checksum: 0,
        }
    }

    /// Returns the packet size needed to carry a payload of payload_len bytes.
    pub fn buffer_len(&self, payload_len: usize) -> usize {
        Packet::<&[u8]>::buffer_len(payload_len)
    }

    /// Deserializes the header of a packet.
    pub fn deserialize<T>(packet: &Packet<T>) -> Repr
    where
        T: AsRef<[u8]>,
    {
        Repr {
            src_port: packet.src_port(),
            dst_port: packet.dst_port(),
            length: packet.length(),
            checksum: packet.checksum(),
        }
    }

    /// Serializes the header, including the checksum as it currently stands,
    /// into a packet.
    pub fn serialize<T>(&self, packet: &mut Packet<T>)
    where
        T: AsRef<[u8]> + AsMut<[u8]>,
    {
        packet.set_src_port(self.src_port);
        packet.set_dst_port(self.dst_port);
        packet.set_length(self.length);
        packet.set_checksum(self.checksum);
    }

    /// Writes the header followed by the payload into the buffer and returns
    /// the number of bytes written.
    ///
    /// The length and the checksum (over the assembled packet and the pseudo
    /// header built from addrs) are recomputed and stored both in the buffer
    /// and in this header.
    pub fn encapsulate(
        &mut self,
        buffer: &mut [u8],
        payload: &[u8],
        addrs: &Ipv4AddressPair,
    ) -> Result<usize> {
        let packet_len = self.buffer_len(payload.len());
        if packet_len > Packet::<&[u8]>::MAX_PACKET_LEN || buffer.len() < packet_len {
            return Err(Error::Exhausted);
        }

        self.length = packet_len as u16;
        self.checksum = 0;

        let mut packet = Packet::try_new(&mut buffer[.. packet_len])?;
        self.serialize(&mut packet);
        packet.payload_mut().copy_from_slice(payload);

        // NOTE: The checksum covers the payload, so it must be computed after
        // the payload is in place.
        self.checksum = udp_checksum(packet.as_ref(), addrs.src_addr, addrs.dst_addr);
        packet.set_checksum(self.checksum);

        Ok(packet_len)
    }
}
