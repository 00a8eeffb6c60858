//! LaMP, the latency measurement protocol, carried over UDP or directly
//! inside an Ethernet frame.
//!
//! Every packet starts with a 24 byte header: a reserved byte always equal to
//! `RESERVED`, a control byte whose upper nibble is always `0xA`, the session
//! ID, a sequence number, a "length or type" field and a timestamp split into
//! 64-bit seconds and microseconds.

use std::time::{
    SystemTime,
    UNIX_EPOCH,
};

use byteorder::{
    NetworkEndian,
    ReadBytesExt,
    WriteBytesExt,
};

use crate::core::check::udp_checksum;
use crate::core::repr::frame::{
    IPV4_HEADER_LEN,
    UDP_HEADER_LEN,
};
use crate::core::repr::{
    Ipv4Packet,
    UdpPacket,
};
use crate::{
    Error,
    Result,
};

/// Value of the reserved field in every LaMP header.
pub const RESERVED: u8 = 0xAA;

/// Largest payload a LaMP packet can carry.
pub const MAX_PAYLOAD_LEN: usize = 65535;

/// Full control field values.
pub mod ctrl {
    /// Upper nibble shared by every control value.
    pub const MASK: u8 = 0xA0;

    pub const PINGLIKE_REQ: u8 = 0xA0;

    pub const PINGLIKE_REPLY: u8 = 0xA1;

    pub const PINGLIKE_ENDREQ: u8 = 0xA2;

    pub const PINGLIKE_ENDREPLY: u8 = 0xA3;

    /// More unidirectional packets follow in the session.
    pub const UNIDIR_CONTINUE: u8 = 0xA4;

    /// Last unidirectional packet of the session.
    pub const UNIDIR_STOP: u8 = 0xA5;

    /// Carries user defined latency statistics.
    pub const UNIDIR_REPORT: u8 = 0xA6;

    pub const ACK: u8 = 0xA7;

    /// Initial handshake; the length field holds one of `init_types`.
    pub const CONN_INIT: u8 = 0xA8;

    pub const PINGLIKE_REQ_TLESS: u8 = 0xA9;

    pub const PINGLIKE_REPLY_TLESS: u8 = 0xAA;

    pub const PINGLIKE_ENDREQ_TLESS: u8 = 0xAB;

    pub const PINGLIKE_ENDREPLY_TLESS: u8 = 0xAC;

    /// Follow-up request, deny or accept; the length field holds one of
    /// `followup` types.
    pub const FOLLOWUP_CTRL: u8 = 0xAD;

    /// Follow-up time delta.
    pub const FOLLOWUP_DATA: u8 = 0xAE;

    pub fn is_pinglike_req(ctrl: u8) -> bool {
        ctrl == PINGLIKE_REQ || ctrl == PINGLIKE_REQ_TLESS
    }

    pub fn is_pinglike_reply(ctrl: u8) -> bool {
        ctrl == PINGLIKE_REPLY || ctrl == PINGLIKE_REPLY_TLESS
    }

    pub fn is_pinglike_endreq(ctrl: u8) -> bool {
        ctrl == PINGLIKE_ENDREQ || ctrl == PINGLIKE_ENDREQ_TLESS
    }

    pub fn is_pinglike_endreply(ctrl: u8) -> bool {
        ctrl == PINGLIKE_ENDREPLY || ctrl == PINGLIKE_ENDREPLY_TLESS
    }

    /// Checks for any of the ping-like (bidirectional) packets.
    pub fn is_pinglike(ctrl: u8) -> bool {
        is_pinglike_req(ctrl)
            || is_pinglike_reply(ctrl)
            || is_pinglike_endreq(ctrl)
            || is_pinglike_endreply(ctrl)
    }

    pub fn is_unidir(ctrl: u8) -> bool {
        ctrl == UNIDIR_CONTINUE || ctrl == UNIDIR_STOP
    }

    /// Checks for the ping-like packets which never carry a timestamp.
    pub fn is_timestampless(ctrl: u8) -> bool {
        ctrl == PINGLIKE_REQ_TLESS
            || ctrl == PINGLIKE_REPLY_TLESS
            || ctrl == PINGLIKE_ENDREQ_TLESS
            || ctrl == PINGLIKE_ENDREPLY_TLESS
    }

    pub fn is_init(ctrl: u8) -> bool {
        ctrl == CONN_INIT
    }

    pub fn is_followup_ctrl(ctrl: u8) -> bool {
        ctrl == FOLLOWUP_CTRL
    }
}

/// Connection types carried by an INIT packet.
pub mod init_types {
    pub const PINGLIKE: u16 = 0x0001;

    pub const UNIDIR: u16 = 0x0002;

    pub fn is_valid(init_type: u16) -> bool {
        init_type == PINGLIKE || init_type == UNIDIR
    }
}

/// Types carried by a follow-up control packet.
pub mod followup {
    pub const REQUEST: u16 = 0x0000;

    pub const DENY: u16 = 0x0100;

    pub const ACCEPT: u16 = 0x0200;

    pub const UNKNOWN: u16 = 0xFFFF;

    /// Application level timestamps.
    pub const REQUEST_T_APP: u16 = 0x0000;

    pub const REQUEST_T_KRN_RX: u16 = 0x0001;

    pub const REQUEST_T_KRN: u16 = 0x0002;

    pub const REQUEST_T_HW: u16 = 0x0003;

    /// Checks if a follow-up type is a request, whatever its timestamp type.
    pub fn is_request(followup_type: u16) -> bool {
        followup_type & 0xFF00 == 0x0000
    }

    /// Checks for a known request type. 0x00F0 to 0x00FF are left to users.
    pub fn is_request_type_valid(request_type: u16) -> bool {
        match request_type {
            REQUEST_T_APP | REQUEST_T_KRN_RX | REQUEST_T_KRN | REQUEST_T_HW => true,
            0x00F0 ..= 0x00FF => true,
            _ => false,
        }
    }

    pub fn is_type_valid(followup_type: u16) -> bool {
        followup_type == DENY || followup_type == ACCEPT || is_request_type_valid(followup_type)
    }
}

/// Checks if a reserved and control field pair belongs to a LaMP packet.
pub fn is_lamp(reserved: u8, ctrl: u8) -> bool {
    reserved == RESERVED && ctrl & ctrl::MASK == ctrl::MASK
}

/// Packet type encoded in the lower nibble of the control field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Type {
    PinglikeReq = 0,
    PinglikeReply = 1,
    PinglikeEndreq = 2,
    PinglikeEndreply = 3,
    UnidirContinue = 4,
    UnidirStop = 5,
    Report = 6,
    Ack = 7,
    Init = 8,
    PinglikeReqTless = 9,
    PinglikeReplyTless = 10,
    PinglikeEndreqTless = 11,
    PinglikeEndreplyTless = 12,
    FollowupCtrl = 13,
    FollowupData = 14,
}

impl Type {
    /// Extracts the type from a full control field value.
    pub fn from_ctrl(ctrl: u8) -> Option<Type> {
        match ctrl & 0x0F {
            0 => Some(Type::PinglikeReq),
            1 => Some(Type::PinglikeReply),
            2 => Some(Type::PinglikeEndreq),
            3 => Some(Type::PinglikeEndreply),
            4 => Some(Type::UnidirContinue),
            5 => Some(Type::UnidirStop),
            6 => Some(Type::Report),
            7 => Some(Type::Ack),
            8 => Some(Type::Init),
            9 => Some(Type::PinglikeReqTless),
            10 => Some(Type::PinglikeReplyTless),
            11 => Some(Type::PinglikeEndreqTless),
            12 => Some(Type::PinglikeEndreplyTless),
            13 => Some(Type::FollowupCtrl),
            14 => Some(Type::FollowupData),
            _ => None,
        }
    }

    /// Returns the full control field value.
    pub fn ctrl(&self) -> u8 {
        *self as u8 | ctrl::MASK
    }
}

/// Whether a packet handed to `Link::send_lamp` ends its session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndFlag {
    /// More packets follow; the control field is kept.
    Continue,
    /// Last packet; requests and unidirectional packets become their end
    /// variant.
    Stop,
    /// Not meaningful for the packet, such as an ACK or an INIT.
    Unset,
}

/// Layer carrying a LaMP packet inside a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Carrier {
    /// IPv4 and UDP, with no IP options. The UDP checksum is refreshed before
    /// sending.
    Udp,
    /// Any carrier without a checksum covering the LaMP packet.
    Raw,
}

/// Wall clock time stored in a LaMP header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timestamp {
    pub secs: u64,
    pub usecs: u64,
}

impl Timestamp {
    /// Reads the realtime clock.
    pub fn now() -> Timestamp {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        Timestamp {
            secs: elapsed.as_secs(),
            usecs: elapsed.subsec_micros() as u64,
        }
    }
}

mod fields {
    use std::ops::Range;

    pub const RESERVED: usize = 0;

    pub const CTRL: usize = 1;

    pub const ID: Range<usize> = 2 .. 4;

    pub const SEQ: Range<usize> = 4 .. 6;

    pub const LEN: Range<usize> = 6 .. 8;

    pub const SECS: Range<usize> = 8 .. 16;

    pub const USECS: Range<usize> = 16 .. 24;
}

/// View of a byte buffer as a LaMP packet.
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
    pub const HEADER_LEN: usize = 24;

    /// Tries to create a LaMP packet view over a byte buffer.
    pub fn try_new(buffer: T) -> Result<Packet<T>> {
        if buffer.as_ref().len() < Self::HEADER_LEN {
            Err(Error::Exhausted)
        } else {
            Ok(Packet { buffer })
        }
    }

    /// Returns the length of a LaMP packet with the specified payload size.
    pub fn buffer_len(payload_len: usize) -> usize {
        Self::HEADER_LEN + payload_len
    }

    pub fn reserved(&self) -> u8 {
        self.buffer.as_ref()[fields::RESERVED]
    }

    pub fn ctrl(&self) -> u8 {
        self.buffer.as_ref()[fields::CTRL]
    }

    pub fn id(&self) -> u16 {
        (&self.buffer.as_ref()[fields::ID])
            .read_u16::<NetworkEndian>()
            .unwrap()
    }

    pub fn seq(&self) -> u16 {
        (&self.buffer.as_ref()[fields::SEQ])
            .read_u16::<NetworkEndian>()
            .unwrap()
    }

    /// Returns the "length or type" field.
    pub fn len(&self) -> u16 {
        (&self.buffer.as_ref()[fields::LEN])
            .read_u16::<NetworkEndian>()
            .unwrap()
    }

    pub fn timestamp(&self) -> Timestamp {
        Timestamp {
            secs: (&self.buffer.as_ref()[fields::SECS])
                .read_u64::<NetworkEndian>()
                .unwrap(),
            usecs: (&self.buffer.as_ref()[fields::USECS])
                .read_u64::<NetworkEndian>()
                .unwrap(),
        }
    }

    pub fn lamp_type(&self) -> Option<Type> {
        Type::from_ctrl(self.ctrl())
    }

    /// Checks the reserved and control fields.
    pub fn is_lamp(&self) -> bool {
        is_lamp(self.reserved(), self.ctrl())
    }

    /// Returns the payload size announced by the header. INIT and follow-up
    /// control packets use the length field for their type and carry none.
    pub fn payload_len(&self) -> usize {
        payload_len(self.ctrl(), self.len())
    }

    /// Returns the payload, trimmed to the announced size.
    pub fn payload(&self) -> &[u8] {
        let payload = &self.buffer.as_ref()[Self::HEADER_LEN ..];
        let payload_len = std::cmp::min(self.payload_len(), payload.len());
        &payload[.. payload_len]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    pub fn set_reserved(&mut self, reserved: u8) {
        self.buffer.as_mut()[fields::RESERVED] = reserved;
    }

    pub fn set_ctrl(&mut self, ctrl: u8) {
        self.buffer.as_mut()[fields::CTRL] = ctrl;
    }

    pub fn set_id(&mut self, id: u16) {
        (&mut self.buffer.as_mut()[fields::ID])
            .write_u16::<NetworkEndian>(id)
            .unwrap()
    }

    pub fn set_seq(&mut self, seq: u16) {
        (&mut self.buffer.as_mut()[fields::SEQ])
            .write_u16::<NetworkEndian>(seq)
            .unwrap()
    }

    pub fn set_len(&mut self, len: u16) {
        (&mut self.buffer.as_mut()[fields::LEN])
            .write_u16::<NetworkEndian>(len)
            .unwrap()
    }

    pub fn set_timestamp(&mut self, timestamp: Timestamp) {
        (&mut self.buffer.as_mut()[fields::SECS])
            .write_u64::<NetworkEndian>(timestamp.secs)
            .unwrap();
        (&mut self.buffer.as_mut()[fields::USECS])
            .write_u64::<NetworkEndian>(timestamp.usecs)
            .unwrap();
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[Self::HEADER_LEN ..]
    }
}

fn payload_len(ctrl: u8, len: u16) -> usize {
    if ctrl::is_init(ctrl) || ctrl::is_followup_ctrl(ctrl) {
        0
    } else {
        len as usize
    }
}

/// Splits a LaMP packet into a view onto its header and the bytes after it.
pub fn packet_pointers(buffer: &[u8]) -> Result<(Packet<&[u8]>, &[u8])> {
    let packet = Packet::try_new(buffer)?;
    Ok((packet, &buffer[Packet::<&[u8]>::HEADER_LEN ..]))
}

/// Populated LaMP header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Repr {
    pub ctrl: u8,
    pub id: u16,
    pub seq: u16,
    pub len: u16,
    pub timestamp: Timestamp,
}

impl Repr {
    /// Populates a header with a full control value. The length and the
    /// timestamp start at zero.
    pub fn populate(ctrl: u8, id: u16, seq: u16) -> Repr {
        Repr {
            ctrl,
            id,
            seq,
            len: 0,
            timestamp: Timestamp::default(),
        }
    }

    pub fn lamp_type(&self) -> Option<Type> {
        Type::from_ctrl(self.ctrl)
    }

    /// Stores the connection type of an INIT header. Other headers and
    /// unknown types are left unchanged.
    pub fn set_conn_type(&mut self, init_type: u16) {
        if ctrl::is_init(self.ctrl) && init_types::is_valid(init_type) {
            self.len = init_type;
        }
    }

    /// Stores the type of a follow-up control header. Other headers and
    /// unknown types are left unchanged.
    pub fn set_followup_ctrl_type(&mut self, followup_type: u16) {
        if ctrl::is_followup_ctrl(self.ctrl) && followup::is_type_valid(followup_type) {
            self.len = followup_type;
        }
    }

    /// Sets the timestamp, reading the clock if none is given. Timestampless
    /// headers are left unchanged.
    pub fn set_timestamp(&mut self, timestamp: Option<Timestamp>) {
        if !ctrl::is_timestampless(self.ctrl) {
            self.timestamp = timestamp.unwrap_or_else(Timestamp::now);
        }
    }

    /// Moves to the next sequence number, wrapping to 0 after 65535.
    pub fn increase_seq(&mut self) {
        self.seq = self.seq.wrapping_add(1);
    }

    pub fn set_unidir_stop(&mut self) {
        self.ctrl = ctrl::UNIDIR_STOP;
    }

    pub fn set_pinglike_endreq(&mut self) {
        self.ctrl = ctrl::PINGLIKE_ENDREQ;
    }

    pub fn set_pinglike_endreq_tless(&mut self) {
        self.ctrl = ctrl::PINGLIKE_ENDREQ_TLESS;
    }

    /// Turns a ping-like request, with or without timestamp, into the
    /// matching end request.
    pub fn set_pinglike_endreq_all(&mut self) {
        if self.ctrl == ctrl::PINGLIKE_REQ {
            self.set_pinglike_endreq();
        } else if self.ctrl == ctrl::PINGLIKE_REQ_TLESS {
            self.set_pinglike_endreq_tless();
        }
    }

    /// Marks the header as the last of its session if the flag says so.
    pub fn apply_end_flag(&mut self, end_flag: EndFlag) {
        if end_flag != EndFlag::Stop {
            return;
        }

        if ctrl::is_unidir(self.ctrl) {
            self.set_unidir_stop();
        } else if ctrl::is_pinglike(self.ctrl) {
            self.set_pinglike_endreq_all();
        }
    }

    /// Returns the size of the packet this header describes.
    pub fn packet_len(&self) -> usize {
        Packet::<&[u8]>::buffer_len(payload_len(self.ctrl, self.len))
    }

    /// Returns the packet size needed to carry a payload of payload_len bytes.
    pub fn buffer_len(&self, payload_len: usize) -> usize {
        Packet::<&[u8]>::buffer_len(payload_len)
    }

    /// Deserializes the header of a packet. The reserved field is not
    /// checked, see `Packet::is_lamp`.
    pub fn deserialize<T>(packet: &Packet<T>) -> Repr
    where
        T: AsRef<[u8]>,
    {
        Repr {
            ctrl: packet.ctrl(),
            id: packet.id(),
            seq: packet.seq(),
            len: packet.len(),
            timestamp: packet.timestamp(),
        }
    }

    /// Serializes the header into a packet.
    pub fn serialize<T>(&self, packet: &mut Packet<T>)
    where
        T: AsRef<[u8]> + AsMut<[u8]>,
    {
        packet.set_reserved(RESERVED);
        packet.set_ctrl(self.ctrl);
        packet.set_id(self.id);
        packet.set_seq(self.seq);
        packet.set_len(self.len);
        packet.set_timestamp(self.timestamp);
    }

    /// Writes the header followed by the payload into the buffer and returns
    /// the number of bytes written.
    ///
    /// The length field is set to the payload size, replacing any INIT or
    /// follow-up type. Headers carrying a type and no payload are written
    /// with `serialize` instead.
    pub fn encapsulate(&mut self, buffer: &mut [u8], payload: &[u8]) -> Result<usize> {
        let packet_len = self.buffer_len(payload.len());
        if payload.len() > MAX_PAYLOAD_LEN || buffer.len() < packet_len {
            return Err(Error::Exhausted);
        }

        self.len = payload.len() as u16;

        let mut packet = Packet::try_new(&mut buffer[.. packet_len])?;
        self.serialize(&mut packet);
        packet.payload_mut().copy_from_slice(payload);

        Ok(packet_len)
    }
}

/// Prepares the LaMP packet at lamp_offset within an assembled frame for
/// sending.
///
/// The end flag is applied and requests and unidirectional packets are
/// stamped with now. Over UDP the checksum is then recomputed, covering
/// the LaMP header and the announced payload.
pub fn finalize_frame(
    frame: &mut [u8],
    lamp_offset: usize,
    end_flag: EndFlag,
    carrier: Carrier,
    now: Timestamp,
) -> Result<()> {
    if frame.len() < lamp_offset {
        return Err(Error::Exhausted);
    }

    let packet_len = {
        let mut packet = Packet::try_new(&mut frame[lamp_offset ..])?;
        let mut repr = Repr::deserialize(&packet);

        repr.apply_end_flag(end_flag);

        if ctrl::is_unidir(repr.ctrl)
            || repr.ctrl == ctrl::PINGLIKE_REQ
            || repr.ctrl == ctrl::PINGLIKE_ENDREQ
        {
            repr.timestamp = now;
        }

        repr.serialize(&mut packet);
        trace!("Finalized LaMP header {:?}.", repr);

        repr.packet_len()
    };

    match carrier {
        Carrier::Udp => refresh_udp_checksum(frame, lamp_offset, packet_len),
        Carrier::Raw => Ok(()),
    }
}

fn refresh_udp_checksum(frame: &mut [u8], lamp_offset: usize, lamp_len: usize) -> Result<()> {
    if lamp_offset < IPV4_HEADER_LEN + UDP_HEADER_LEN {
        return Err(Error::Exhausted);
    }

    let udp_offset = lamp_offset - UDP_HEADER_LEN;
    let ipv4_offset = udp_offset - IPV4_HEADER_LEN;
    let udp_end = lamp_offset + lamp_len;
    if frame.len() < udp_end {
        return Err(Error::Exhausted);
    }

    let (src_addr, dst_addr) = {
        let ipv4_packet = Ipv4Packet::try_new(&frame[ipv4_offset .. udp_offset])?;
        (ipv4_packet.src_addr(), ipv4_packet.dst_addr())
    };

    let mut udp_packet = UdpPacket::try_new(&mut frame[udp_offset .. udp_end])?;
    udp_packet.set_checksum(0);
    let checksum = udp_checksum(udp_packet.as_ref(), src_addr, dst_addr);
    udp_packet.set_checksum(checksum);

    Ok(())
}
