//! Verification of the checksums carried by an assembled frame: Ethernet,
//! IPv4 and UDP headers followed by the payload.

use std::ops::{
    Deref,
    Range,
};

use crate::core::check::{
    ip_header_checksum,
    udp_checksum,
};
use crate::core::repr::frame::{
    udp_packet_len,
    IPV4_HEADER_LEN,
    IPV4_OFFSET,
    UDP_OFFSET,
};
use crate::core::repr::{
    ipv4,
    udp,
    Ipv4Packet,
    UdpPacket,
};
use crate::Result;

/// Selects the checksums verified by `validate_checksum`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChecksumKind {
    /// The IPv4 header checksum.
    Ip = 0x00,
    /// The UDP checksum, pseudo header included.
    Udp = 0x01,
    /// The UDP checksum followed by the IPv4 header checksum.
    UdpIp = 0x80,
}

impl ChecksumKind {
    /// Bit set in the code of every kind checking two checksums.
    pub const COMBINED: u8 = 0x80;

    pub fn from_code(code: u8) -> Option<ChecksumKind> {
        match code {
            0x00 => Some(ChecksumKind::Ip),
            0x01 => Some(ChecksumKind::Udp),
            0x80 => Some(ChecksumKind::UdpIp),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Checks if the kind requires a second checksum.
    pub fn is_combined(&self) -> bool {
        self.code() & Self::COMBINED != 0
    }
}

/// A two byte field zeroed for as long as the guard lives and restored to
/// its saved value when dropped.
struct ZeroedField<'a> {
    buffer: &'a mut [u8],
    field: Range<usize>,
    saved: [u8; 2],
}

impl<'a> ZeroedField<'a> {
    fn new(buffer: &'a mut [u8], field: Range<usize>) -> ZeroedField<'a> {
        let mut saved = [0; 2];
        saved.copy_from_slice(&buffer[field.clone()]);

        for byte in &mut buffer[field.clone()] {
            *byte = 0;
        }

        ZeroedField {
            buffer,
            field,
            saved,
        }
    }
}

impl<'a> Deref for ZeroedField<'a> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buffer
    }
}

impl<'a> Drop for ZeroedField<'a> {
    fn drop(&mut self) {
        self.buffer[self.field.clone()].copy_from_slice(&self.saved);
    }
}

/// Verifies one or two checksums of an assembled Ethernet frame.
///
/// The checksum field under test is zeroed while the checksum is recomputed
/// and always restored afterwards, so the frame is left exactly as it was
/// found. Every kind involving UDP needs the payload length and the combined
/// kind needs the second (IPv4) checksum. Missing arguments, as well as a
/// frame too short for the headers, fail the verification.
pub fn validate_checksum(
    frame: &mut [u8],
    checksum: u16,
    second_checksum: Option<u16>,
    kind: ChecksumKind,
    payload_len: Option<usize>,
) -> bool {
    if kind.is_combined() && second_checksum.is_none() {
        debug!("Missing second checksum for {:?}.", kind);
        return false;
    }

    match kind {
        ChecksumKind::Ip => ipv4_checksum_matches(frame, checksum),
        ChecksumKind::Udp | ChecksumKind::UdpIp => {
            let payload_len = match payload_len {
                Some(payload_len) => payload_len,
                None => {
                    debug!("Missing payload length for {:?}.", kind);
                    return false;
                }
            };

            let udp_valid = udp_checksum_matches(frame, checksum, payload_len);

            match second_checksum {
                Some(ipv4_checksum) if kind == ChecksumKind::UdpIp => {
                    let ipv4_valid = ipv4_checksum_matches(frame, ipv4_checksum);
                    udp_valid && ipv4_valid
                }
                _ => udp_valid,
            }
        }
    }
}

fn ipv4_checksum_matches(frame: &mut [u8], expected: u16) -> bool {
    if frame.len() < IPV4_OFFSET + IPV4_HEADER_LEN {
        debug!("Frame of {} bytes is too short for an IPv4 header.", frame.len());
        return false;
    }

    let header = &mut frame[IPV4_OFFSET ..];
    let header_words = (header[ipv4::fields::VERSION_IHL] & 0x0F) as usize;
    if header.len() < header_words * 4 {
        debug!("IPv4 header of {} words overruns the frame.", header_words);
        return false;
    }

    let computed = {
        let zeroed = ZeroedField::new(header, ipv4::fields::CHECKSUM);
        ip_header_checksum(&zeroed, header_words)
    };

    if computed != expected {
        debug!(
            "IPv4 checksum mismatch, expected {:#06x} but computed {:#06x}.",
            expected, computed
        );
    }

    computed == expected
}

fn udp_checksum_matches(frame: &mut [u8], expected: u16, payload_len: usize) -> bool {
    let packet_end = UDP_OFFSET + udp_packet_len(payload_len);
    if frame.len() < packet_end {
        debug!(
            "Frame of {} bytes is too short for {} bytes of UDP payload.",
            frame.len(),
            payload_len
        );
        return false;
    }

    let addrs = match Ipv4Packet::try_new(&frame[IPV4_OFFSET ..]) {
        Ok(packet) => (packet.src_addr(), packet.dst_addr()),
        Err(_) => return false,
    };

    let computed = {
        let zeroed = ZeroedField::new(&mut frame[UDP_OFFSET .. packet_end], udp::fields::CHECKSUM);
        udp_checksum(&zeroed, addrs.0, addrs.1)
    };

    if computed != expected {
        debug!(
            "UDP checksum mismatch, expected {:#06x} but computed {:#06x}.",
            expected, computed
        );
    }

    computed == expected
}

/// Corrupts the checksum stored in an IPv4 packet by incrementing it,
/// wrapping to zero.
pub fn inject_ipv4_checksum_error(ip_packet: &mut [u8]) -> Result<()> {
    let mut packet = Ipv4Packet::try_new(ip_packet)?;
    let checksum = packet.checksum().wrapping_add(1);
    packet.set_checksum(checksum);
    Ok(())
}

/// Corrupts the checksum stored in a UDP packet by incrementing it,
/// wrapping to zero.
pub fn inject_udp_checksum_error(udp_packet: &mut [u8]) -> Result<()> {
    let mut packet = UdpPacket::try_new(udp_packet)?;
    let checksum = packet.checksum().wrapping_add(1);
    packet.set_checksum(checksum);
    Ok(())
}
