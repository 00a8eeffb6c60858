use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use crate::core::repr::{
    ipv4_protocols,
    Ipv4Address,
};

/// Calculates the folded ones' complement sum of a buffer from
/// [RFC1071](https://tools.ietf.org/html/rfc1071), without the final complement.
///
/// The buffer is accumulated in 64-bit words. Leading bytes are consumed until
/// the word reads are aligned and a trailing remainder shorter than a word is
/// added 32, 16 and 8 bits at a time. The result is in network byte order
/// regardless of the alignment of the buffer.
pub fn internet_checksum(buffer: &[u8]) -> u16 {
    if buffer.is_empty() {
        return 0;
    }

    let mut buffer = buffer;
    let mut result: u64 = 0;

    // An odd start puts every byte in the opposite lane, which is undone by
    // swapping the folded result.
    let odd = (buffer.as_ptr() as usize) & 1 == 1;
    if odd {
        result = buffer[0] as u64;
        buffer = &buffer[1 ..];
    }

    if (buffer.as_ptr() as usize) & 2 != 0 && buffer.len() >= 2 {
        result += NetworkEndian::read_u16(buffer) as u64;
        buffer = &buffer[2 ..];
    }

    if (buffer.as_ptr() as usize) & 4 != 0 && buffer.len() >= 4 {
        result += NetworkEndian::read_u32(buffer) as u64;
        buffer = &buffer[4 ..];
    }

    let words = buffer.len() / 8;
    if words > 0 {
        let mut carry: u64 = 0;
        for chunk in buffer[.. words * 8].chunks(8) {
            let word = NetworkEndian::read_u64(chunk);
            result = result.wrapping_add(carry);
            result = result.wrapping_add(word);
            carry = (word > result) as u64;
        }
        result = result.wrapping_add(carry);
        result = (result & 0xFFFF_FFFF) + (result >> 32);
        buffer = &buffer[words * 8 ..];
    }

    if buffer.len() & 4 != 0 {
        result += NetworkEndian::read_u32(buffer) as u64;
        buffer = &buffer[4 ..];
    }

    if buffer.len() & 2 != 0 {
        result += NetworkEndian::read_u16(buffer) as u64;
        buffer = &buffer[2 ..];
    }

    if buffer.len() & 1 != 0 {
        result += (buffer[0] as u64) << 8;
    }

    let folded = fold(result);

    if odd {
        folded.swap_bytes()
    } else {
        folded
    }
}

/// Calculates the IPv4 header checksum over header_words 32-bit words.
///
/// The checksum field inside the header must be zero when this is called.
///
/// # Panics
///
/// Causes a panic if the header is shorter than header_words * 4 bytes.
pub fn ip_header_checksum(header: &[u8], header_words: usize) -> u16 {
    !internet_checksum(&header[.. header_words * 4])
}

/// Calculates the checksum of a UDP packet (header and payload) including the
/// IPv4 pseudo header formed by the address pair, the protocol and the packet
/// length.
///
/// The checksum field inside the UDP header must be zero when this is called.
pub fn udp_checksum(buffer: &[u8], src_addr: Ipv4Address, dst_addr: Ipv4Address) -> u16 {
    let mut sum: u32 = 0;

    for word in buffer.chunks(2) {
        if word.len() == 2 {
            sum += NetworkEndian::read_u16(word) as u32;
        } else {
            sum += (word[0] as u32) << 8;
        }

        if sum & 0x8000_0000 != 0 {
            sum = (sum & 0xFFFF) + (sum >> 16);
        }
    }

    for addr in &[src_addr, dst_addr] {
        let bytes = addr.as_bytes();
        sum += NetworkEndian::read_u16(&bytes[0 .. 2]) as u32;
        sum += NetworkEndian::read_u16(&bytes[2 .. 4]) as u32;
    }

    sum += ipv4_protocols::UDP as u32;
    sum += buffer.len() as u16 as u32;

    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}

/// Folds a 64-bit ones' complement accumulator into 32 and then 16 bits.
fn fold(mut sum: u64) -> u16 {
    while sum >> 32 != 0 {
        sum = (sum & 0xFFFF_FFFF) + (sum >> 32);
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    sum as u16
}
