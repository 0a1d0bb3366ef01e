use bytes::{BufMut, Bytes, BytesMut};

use crate::av::PES_MARKER_BITS;
use super::types::wrap_timestamp;

/// PTS_DTS_flags value: PTS only.
pub const PTS_DTS_ONLY_PTS: u8 = 0b10;
/// PTS_DTS_flags value: PTS and DTS.
pub const PTS_DTS_BOTH: u8 = 0b11;

/// Packetized Elementary Stream (PES) header with its optional header.
///
/// Only the fields the muxer writes are modelled; ESCR, ES rate, trick mode,
/// copy info, CRC and extension flags are always zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PESHeader {
    /// Stream identifier indicating content type (0xE0 for video)
    pub stream_id: u8,
    /// PES_packet_length; 0 means unbounded, which is allowed for video
    pub packet_length: u16,
    /// The `'10'` marker bits opening the optional header
    pub marker_bits: u8,
    /// Control field for scrambling mode
    pub scrambling_control: u8,
    /// Priority flag for the packet
    pub priority: bool,
    /// Data alignment indicator, set when the payload starts with a start code
    pub data_alignment: bool,
    /// Copyright indicator
    pub copyright: bool,
    /// Original/copy indicator
    pub original: bool,
    /// Presentation Time Stamp, 90 kHz ticks
    pub pts: Option<i64>,
    /// Decoding Time Stamp, 90 kHz ticks
    pub dts: Option<i64>,
}

impl PESHeader {
    /// Creates a new PES header with a specific stream ID.
    pub fn new(stream_id: u8) -> Self {
        Self {
            stream_id,
            packet_length: 0,
            marker_bits: PES_MARKER_BITS,
            scrambling_control: 0,
            priority: false,
            data_alignment: false,
            copyright: false,
            original: false,
            pts: None,
            dts: None,
        }
    }

    /// Sets the Presentation Time Stamp.
    pub fn with_pts(mut self, pts: i64) -> Self {
        self.pts = Some(pts);
        self
    }

    /// Sets the Decoding Time Stamp. Ignored on write unless a PTS is set.
    pub fn with_dts(mut self, dts: i64) -> Self {
        self.dts = Some(dts);
        self
    }

    /// Sets the data alignment indicator.
    pub fn with_data_alignment(mut self, aligned: bool) -> Self {
        self.data_alignment = aligned;
        self
    }

    /// The two-bit PTS_DTS_flags field.
    pub fn pts_dts_flags(&self) -> u8 {
        match (self.pts, self.dts) {
            (Some(_), Some(_)) => PTS_DTS_BOTH,
            (Some(_), None) => PTS_DTS_ONLY_PTS,
            _ => 0,
        }
    }

    /// PES_header_data_length: bytes of optional fields after it.
    pub fn header_data_length(&self) -> u8 {
        match self.pts_dts_flags() {
            PTS_DTS_BOTH => 10,
            PTS_DTS_ONLY_PTS => 5,
            _ => 0,
        }
    }

    /// Total encoded header size.
    pub fn len(&self) -> usize {
        9 + self.header_data_length() as usize
    }

    /// Always false: a PES header has at least its 9 fixed bytes.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Writes the PES header according to ISO/IEC 13818-1 2.4.3.6.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_slice(&[0x00, 0x00, 0x01]);
        buf.put_u8(self.stream_id);
        buf.put_u16(self.packet_length);

        let mut flags = (self.marker_bits & 0x03) << 6;
        flags |= (self.scrambling_control & 0x03) << 4;
        if self.priority {
            flags |= 0x08;
        }
        if self.data_alignment {
            flags |= 0x04;
        }
        if self.copyright {
            flags |= 0x02;
        }
        if self.original {
            flags |= 0x01;
        }
        buf.put_u8(flags);

        let pts_dts_flags = self.pts_dts_flags();
        buf.put_u8(pts_dts_flags << 6);
        buf.put_u8(self.header_data_length());

        match (pts_dts_flags, self.pts, self.dts) {
            (PTS_DTS_BOTH, Some(pts), Some(dts)) => {
                write_timestamp(buf, 0x30, pts);
                write_timestamp(buf, 0x10, dts);
            }
            (PTS_DTS_ONLY_PTS, Some(pts), _) => write_timestamp(buf, 0x20, pts),
            _ => {}
        }
    }
}

/// A complete PES packet: header plus payload.
#[derive(Debug, Clone)]
pub struct PESPacket {
    /// PES header containing metadata and flags
    pub header: PESHeader,
    /// Elementary stream payload
    pub payload: Bytes,
}

impl PESPacket {
    /// Creates a new PES packet with the specified stream ID and payload data.
    pub fn new(stream_id: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            header: PESHeader::new(stream_id),
            payload: payload.into(),
        }
    }

    /// Sets the Presentation Time Stamp.
    pub fn with_pts(mut self, pts: i64) -> Self {
        self.header = self.header.with_pts(pts);
        self
    }

    /// Sets the Decoding Time Stamp.
    pub fn with_dts(mut self, dts: i64) -> Self {
        self.header = self.header.with_dts(dts);
        self
    }

    /// Writes the complete PES packet.
    pub fn write_to(&self, buf: &mut BytesMut) {
        self.header.write_to(buf);
        buf.extend_from_slice(&self.payload);
    }

    /// Serializes into a new buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.len());
        self.write_to(&mut buf);
        buf.freeze()
    }

    /// Total length of the PES packet in bytes.
    pub fn len(&self) -> usize {
        self.header.len() + self.payload.len()
    }

    /// True when the packet has no payload.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Writes a 33-bit timestamp as 5 bytes: 4-bit prefix, then 3/15/15 bits
/// each followed by a marker bit.
fn write_timestamp(buf: &mut BytesMut, prefix: u8, ticks: i64) {
    let ts = wrap_timestamp(ticks);

    buf.put_u8(prefix | ((ts >> 29) & 0x0e) as u8 | 0x01);
    buf.put_u16((((ts >> 14) & 0xfffe) | 0x01) as u16);
    buf.put_u16((((ts << 1) & 0xfffe) | 0x01) as u16);
}
