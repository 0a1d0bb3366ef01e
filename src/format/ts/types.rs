use bytes::{BufMut, BytesMut};

use crate::utils::Crc32Mpeg2;

// Stream IDs
pub const STREAM_ID_H264: u8 = 0xe0;

// PIDs
pub const PID_PAT: u16 = 0x0000;
pub const PID_PMT: u16 = 0x1000;
pub const PID_NULL: u16 = 0x1fff;
/// PIDs below this are reserved for PSI/SI tables.
pub const PID_FIRST_ELEMENTARY: u16 = 0x0010;

// Table IDs
pub const TABLE_ID_PAT: u8 = 0x00;
pub const TABLE_ID_PMT: u8 = 0x02;
pub const TRANSPORT_STREAM_ID: u16 = 1;

// Elementary Stream Types
pub const STREAM_TYPE_H264: u8 = 0x1b;

// Constants
pub const SYNC_BYTE: u8 = 0x47;
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;
pub const TS_PAYLOAD_SIZE: usize = TS_PACKET_SIZE - TS_HEADER_SIZE;
pub const PCR_PER_PTS_TICK: u64 = 300;

const TIMESTAMP_MASK: u64 = 0x1_FFFF_FFFF; // 33 bits

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PATEntry {
    pub program_number: u16,
    pub program_map_pid: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PAT {
    pub entries: Vec<PATEntry>,
}

impl PAT {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len() * 4
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn write_to(&self, buf: &mut BytesMut) {
        for entry in &self.entries {
            buf.put_u16(entry.program_number);
            buf.put_u16(0xe000 | (entry.program_map_pid & 0x1fff));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub tag: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementaryStreamInfo {
    pub stream_type: u8,
    pub elementary_pid: u16,
    pub descriptors: Vec<Descriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PMT {
    pub pcr_pid: u16,
    pub program_descriptors: Vec<Descriptor>,
    pub elementary_stream_infos: Vec<ElementaryStreamInfo>,
}

fn write_descriptors(buf: &mut BytesMut, descriptors: &[Descriptor]) {
    let len: usize = descriptors.iter().map(|d| 2 + d.data.len()).sum();
    buf.put_u16(0xf000 | (len as u16 & 0x0fff));
    for desc in descriptors {
        buf.put_u8(desc.tag);
        buf.put_u8(desc.data.len() as u8);
        buf.put_slice(&desc.data);
    }
}

impl PMT {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u16(0xe000 | (self.pcr_pid & 0x1fff));
        write_descriptors(buf, &self.program_descriptors);

        for info in &self.elementary_stream_infos {
            buf.put_u8(info.stream_type);
            buf.put_u16(0xe000 | (info.elementary_pid & 0x1fff));
            write_descriptors(buf, &info.descriptors);
        }
    }
}

/// Wraps a table body into a long-form PSI section:
/// header, version 0 / current, single section, trailing CRC32.
pub fn write_section(buf: &mut BytesMut, table_id: u8, table_id_extension: u16, body: &[u8]) {
    let start = buf.len();
    let section_length = 5 + body.len() + 4;

    buf.put_u8(table_id);
    buf.put_u16(0xb000 | (section_length as u16 & 0x0fff));
    buf.put_u16(table_id_extension);
    buf.put_u8(0xc1); // reserved, version 0, current_next_indicator
    buf.put_u8(0); // section_number
    buf.put_u8(0); // last_section_number
    buf.put_slice(body);

    let crc = Crc32Mpeg2::new().calculate(&buf[start..]);
    buf.put_u32(crc);
}

/// Adaptation field contents the muxer writes or the parser reads back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdaptationField {
    pub length: usize,
    pub discontinuity: bool,
    pub random_access: bool,
    pub es_priority: bool,
    /// Program clock reference in 27 MHz units.
    pub pcr: Option<u64>,
}

impl AdaptationField {
    /// Bytes needed for the flags and PCR, length byte included; 0 when
    /// nothing has to be signalled.
    pub fn encoded_len(&self) -> usize {
        if !self.discontinuity && !self.random_access && !self.es_priority && self.pcr.is_none() {
            return 0;
        }
        2 + if self.pcr.is_some() { 6 } else { 0 }
    }

    /// Writes the field padded with 0xFF stuffing to exactly `total_len`
    /// bytes (length byte included). `total_len` must be 0 or at least
    /// `encoded_len()`.
    pub fn write_to(&self, buf: &mut BytesMut, total_len: usize) {
        if total_len == 0 {
            return;
        }
        buf.put_u8((total_len - 1) as u8);
        if total_len == 1 {
            return;
        }

        let mut flags = 0u8;
        if self.discontinuity {
            flags |= 0x80;
        }
        if self.random_access {
            flags |= 0x40;
        }
        if self.es_priority {
            flags |= 0x20;
        }
        if self.pcr.is_some() {
            flags |= 0x10;
        }
        buf.put_u8(flags);

        if let Some(pcr) = self.pcr {
            let base = (pcr / PCR_PER_PTS_TICK) & TIMESTAMP_MASK;
            let ext = pcr % PCR_PER_PTS_TICK;
            let packed = (base << 15) | (0x3f << 9) | ext;
            buf.put_u32((packed >> 16) as u32);
            buf.put_u16((packed & 0xffff) as u16);
        }

        let written = 2 + if self.pcr.is_some() { 6 } else { 0 };
        buf.put_bytes(0xff, total_len.saturating_sub(written));
    }
}

/// The fixed 4-byte header of a TS packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TSHeader {
    /// Always [`SYNC_BYTE`].
    pub sync_byte: u8,
    /// Transport error indicator
    pub transport_error: bool,
    /// Set on the packet where a PES packet or PSI section starts.
    pub payload_unit_start: bool,
    /// Transport priority
    pub transport_priority: bool,
    /// 13-bit packet identifier.
    pub pid: u16,
    /// Transport scrambling control; 0 when not scrambled.
    pub scrambling_control: u8,
    /// An adaptation field follows the header.
    pub adaptation_field_exists: bool,
    /// The packet carries payload.
    pub contains_payload: bool,
    /// 4-bit counter incremented per payload packet on the same PID.
    pub continuity_counter: u8,
}

impl Default for TSHeader {
    fn default() -> Self {
        Self {
            sync_byte: SYNC_BYTE,
            transport_error: false,
            payload_unit_start: false,
            transport_priority: false,
            pid: 0,
            scrambling_control: 0,
            adaptation_field_exists: false,
            contains_payload: true,
            continuity_counter: 0,
        }
    }
}

impl TSHeader {
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.sync_byte);

        let mut b1 = 0u8;
        if self.transport_error {
            b1 |= 0x80;
        }
        if self.payload_unit_start {
            b1 |= 0x40;
        }
        if self.transport_priority {
            b1 |= 0x20;
        }
        b1 |= ((self.pid >> 8) & 0x1f) as u8;
        buf.put_u8(b1);

        buf.put_u8((self.pid & 0xff) as u8);

        let mut b3 = (self.scrambling_control & 0x03) << 6;
        if self.adaptation_field_exists {
            b3 |= 0x20;
        }
        if self.contains_payload {
            b3 |= 0x10;
        }
        b3 |= self.continuity_counter & 0x0f;
        buf.put_u8(b3);
    }
}

/// Reduces a signed 90 kHz tick count to the 33-bit wrapped value carried
/// in PES headers and PCR bases.
pub fn wrap_timestamp(ticks: i64) -> u64 {
    (ticks as u64) & TIMESTAMP_MASK
}

/// 27 MHz PCR for a 90 kHz tick count.
pub fn ticks_to_pcr(ticks: i64) -> u64 {
    wrap_timestamp(ticks) * PCR_PER_PTS_TICK
}
