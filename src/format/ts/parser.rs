use super::pes::{PESHeader, PTS_DTS_BOTH, PTS_DTS_ONLY_PTS};
use super::types::*;
use crate::error::{Result, VdkError};
use crate::utils::Crc32Mpeg2;

/// A PSI section with its header fields split out and the CRC verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub table_id: u8,
    /// Transport stream id for a PAT, program number for a PMT.
    pub table_id_extension: u16,
    pub version: u8,
    /// Table body between the fixed header and the CRC.
    pub body: &'a [u8],
}

/// A parsed PES header plus where its payload begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPes {
    pub header: PESHeader,
    /// Offset of the elementary stream data from the PES start code.
    pub payload_offset: usize,
}

/// Stateless reader for the structures [`TSMuxer`](super::TSMuxer) writes.
///
/// Each method takes a single 188-byte packet or a slice of one; callers
/// reassemble multi-packet PES payloads themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct TSPacketParser;

impl TSPacketParser {
    /// Creates a parser.
    pub fn new() -> Self {
        Self
    }

    /// Reads the 4-byte TS header, checking the sync byte.
    pub fn parse_header(&self, data: &[u8]) -> Result<TSHeader> {
        if data.len() < TS_HEADER_SIZE {
            return Err(VdkError::InvalidData("TS packet too short".into()));
        }

        if data[0] != SYNC_BYTE {
            return Err(VdkError::InvalidData("Invalid sync byte".into()));
        }

        Ok(TSHeader {
            sync_byte: data[0],
            transport_error: (data[1] & 0x80) != 0,
            payload_unit_start: (data[1] & 0x40) != 0,
            transport_priority: (data[1] & 0x20) != 0,
            pid: (((data[1] & 0x1F) as u16) << 8) | data[2] as u16,
            scrambling_control: (data[3] >> 6) & 0x03,
            adaptation_field_exists: (data[3] & 0x20) != 0,
            contains_payload: (data[3] & 0x10) != 0,
            continuity_counter: data[3] & 0x0F,
        })
    }

    /// Reads the adaptation field of a whole TS packet, if it has one.
    pub fn parse_adaptation_field(&self, data: &[u8]) -> Result<Option<AdaptationField>> {
        let header = self.parse_header(data)?;
        if !header.adaptation_field_exists {
            return Ok(None);
        }

        let offset = TS_HEADER_SIZE;
        let length = *data
            .get(offset)
            .ok_or_else(|| VdkError::InvalidData("Adaptation field missing".into()))?
            as usize;
        if data.len() < offset + length + 1 {
            return Err(VdkError::InvalidData("Adaptation field too short".into()));
        }

        let mut field = AdaptationField {
            length,
            ..Default::default()
        };
        if length == 0 {
            return Ok(Some(field));
        }

        let flags = data[offset + 1];
        field.discontinuity = (flags & 0x80) != 0;
        field.random_access = (flags & 0x40) != 0;
        field.es_priority = (flags & 0x20) != 0;

        if (flags & 0x10) != 0 {
            let pos = offset + 2;
            if length < 7 {
                return Err(VdkError::InvalidData("PCR data too short".into()));
            }
            let pcr_base = ((data[pos] as u64) << 25)
                | ((data[pos + 1] as u64) << 17)
                | ((data[pos + 2] as u64) << 9)
                | ((data[pos + 3] as u64) << 1)
                | ((data[pos + 4] & 0x80) as u64 >> 7);
            let pcr_ext = (((data[pos + 4] & 0x01) as u64) << 8) | (data[pos + 5] as u64);
            field.pcr = Some(pcr_base * PCR_PER_PTS_TICK + pcr_ext);
        }

        Ok(Some(field))
    }

    /// Offset of the first payload byte in a whole TS packet.
    pub fn payload_offset(&self, data: &[u8]) -> Result<usize> {
        let header = self.parse_header(data)?;
        let mut offset = TS_HEADER_SIZE;
        if header.adaptation_field_exists {
            offset += 1 + *data
                .get(offset)
                .ok_or_else(|| VdkError::InvalidData("Adaptation field missing".into()))?
                as usize;
        }
        if offset > data.len() || offset > TS_PACKET_SIZE {
            return Err(VdkError::InvalidData("Adaptation field overruns packet".into()));
        }
        Ok(offset)
    }

    /// Reads a long-form PSI section from a packet payload that starts with
    /// a pointer field, checking its CRC32.
    pub fn parse_section<'a>(&self, payload: &'a [u8]) -> Result<Section<'a>> {
        let pointer = *payload
            .first()
            .ok_or_else(|| VdkError::InvalidData("Empty PSI payload".into()))?
            as usize;
        let start = 1 + pointer;
        if payload.len() < start + 8 {
            return Err(VdkError::InvalidData("PSI section too short".into()));
        }

        let data = &payload[start..];
        let section_length = (((data[1] & 0x0F) as usize) << 8) | data[2] as usize;
        let end = 3 + section_length;
        if section_length < 9 || data.len() < end {
            return Err(VdkError::InvalidData("PSI section truncated".into()));
        }

        if Crc32Mpeg2::new().calculate(&data[..end]) != 0 {
            return Err(VdkError::InvalidData("PSI section CRC mismatch".into()));
        }

        Ok(Section {
            table_id: data[0],
            table_id_extension: ((data[3] as u16) << 8) | data[4] as u16,
            version: (data[5] >> 1) & 0x1F,
            body: &data[8..end - 4],
        })
    }

    /// Parses the body of a PAT section.
    pub fn parse_pat(&self, body: &[u8]) -> Result<PAT> {
        if body.len() % 4 != 0 {
            return Err(VdkError::InvalidData("PAT body is not a whole number of entries".into()));
        }

        let entries = body
            .chunks_exact(4)
            .map(|entry| PATEntry {
                program_number: ((entry[0] as u16) << 8) | entry[1] as u16,
                program_map_pid: (((entry[2] & 0x1F) as u16) << 8) | entry[3] as u16,
            })
            .collect();

        Ok(PAT { entries })
    }

    /// Parses the body of a PMT section.
    pub fn parse_pmt(&self, body: &[u8]) -> Result<PMT> {
        let mut pmt = PMT::new();
        let end = body.len();

        if end < 4 {
            return Err(VdkError::InvalidData("PMT too short".into()));
        }

        pmt.pcr_pid = ((body[0] as u16 & 0x1F) << 8) | body[1] as u16;
        let program_info_length = ((body[2] as usize & 0x0F) << 8) | body[3] as usize;
        let mut pos = 4;

        if pos + program_info_length > end {
            return Err(VdkError::InvalidData("Program info data too short".into()));
        }
        pmt.program_descriptors = parse_descriptors(&body[pos..pos + program_info_length])?;
        pos += program_info_length;

        while pos + 5 <= end {
            let stream_type = body[pos];
            let elementary_pid = ((body[pos + 1] as u16 & 0x1F) << 8) | body[pos + 2] as u16;
            let es_info_length = ((body[pos + 3] as usize & 0x0F) << 8) | body[pos + 4] as usize;
            pos += 5;

            if pos + es_info_length > end {
                return Err(VdkError::InvalidData("ES info data too short".into()));
            }

            let descriptors = parse_descriptors(&body[pos..pos + es_info_length])?;
            pos += es_info_length;

            pmt.elementary_stream_infos.push(ElementaryStreamInfo {
                stream_type,
                elementary_pid,
                descriptors,
            });
        }

        Ok(pmt)
    }

    /// Reads the PES header at the start of a unit's first payload.
    pub fn parse_pes_header(&self, data: &[u8]) -> Result<ParsedPes> {
        if data.len() < 9 {
            return Err(VdkError::InvalidData("PES header too short".into()));
        }
        if data[..3] != [0x00, 0x00, 0x01] {
            return Err(VdkError::InvalidData("Missing PES start code prefix".into()));
        }

        let flags = data[6];
        let pts_dts_flags = data[7] >> 6;
        let header_data_length = data[8] as usize;
        let payload_offset = 9 + header_data_length;
        if data.len() < payload_offset {
            return Err(VdkError::InvalidData("PES optional header truncated".into()));
        }

        let mut header = PESHeader::new(data[3]);
        header.packet_length = ((data[4] as u16) << 8) | data[5] as u16;
        header.marker_bits = flags >> 6;
        header.scrambling_control = (flags >> 4) & 0x03;
        header.priority = (flags & 0x08) != 0;
        header.data_alignment = (flags & 0x04) != 0;
        header.copyright = (flags & 0x02) != 0;
        header.original = (flags & 0x01) != 0;

        match pts_dts_flags {
            PTS_DTS_ONLY_PTS if header_data_length >= 5 => {
                header.pts = Some(read_timestamp(&data[9..14]));
            }
            PTS_DTS_BOTH if header_data_length >= 10 => {
                header.pts = Some(read_timestamp(&data[9..14]));
                header.dts = Some(read_timestamp(&data[14..19]));
            }
            0 => {}
            _ => {
                return Err(VdkError::InvalidData(format!(
                    "PES timestamps do not fit: flags {:#04b}, header length {}",
                    pts_dts_flags, header_data_length
                )))
            }
        }

        Ok(ParsedPes {
            header,
            payload_offset,
        })
    }
}

fn parse_descriptors(data: &[u8]) -> Result<Vec<Descriptor>> {
    let mut descriptors = Vec::new();
    let mut pos = 0;

    while pos + 2 <= data.len() {
        let tag = data[pos];
        let length = data[pos + 1] as usize;
        pos += 2;

        if pos + length > data.len() {
            return Err(VdkError::InvalidData("Descriptor data too short".into()));
        }

        descriptors.push(Descriptor {
            tag,
            data: data[pos..pos + length].to_vec(),
        });
        pos += length;
    }

    Ok(descriptors)
}

fn read_timestamp(data: &[u8]) -> i64 {
    let ts = (((data[0] >> 1) & 0x07) as u64) << 30
        | ((data[1] as u64) << 22)
        | (((data[2] >> 1) as u64) << 15)
        | ((data[3] as u64) << 7)
        | ((data[4] >> 1) as u64);
    ts as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_ts_header() {
        let parser = TSPacketParser::new();
        let data = [
            0x47, // Sync byte
            0x41, // Payload unit start indicator set, PID high bits
            0x00, // PID low bits
            0x3A, // Adaptation field + payload, counter 10
        ];

        let header = parser.parse_header(&data).unwrap();
        assert_eq!(header.sync_byte, 0x47);
        assert!(header.payload_unit_start);
        assert_eq!(header.pid, 0x100);
        assert!(header.adaptation_field_exists);
        assert!(header.contains_payload);
        assert_eq!(header.continuity_counter, 10);

        assert!(parser.parse_header(&[0x46, 0, 0, 0]).is_err());
        assert!(parser.parse_header(&[0x47, 0]).is_err());
    }

    #[test]
    fn test_parse_adaptation_field_with_pcr() {
        let parser = TSPacketParser::new();
        let mut packet = BytesMut::new();
        TSHeader {
            pid: 0x100,
            adaptation_field_exists: true,
            ..Default::default()
        }
        .write_to(&mut packet);
        let af = AdaptationField {
            random_access: true,
            pcr: Some(ticks_to_pcr(39_600)),
            ..Default::default()
        };
        af.write_to(&mut packet, 20);
        packet.resize(TS_PACKET_SIZE, 0xAB);

        let parsed = parser.parse_adaptation_field(&packet).unwrap().unwrap();
        assert!(parsed.random_access);
        assert!(!parsed.discontinuity);
        assert_eq!(parsed.length, 19);
        assert_eq!(parsed.pcr, Some(39_600 * 300));
        assert_eq!(parser.payload_offset(&packet).unwrap(), 24);
    }

    #[test]
    fn test_parse_section_checks_crc() {
        let parser = TSPacketParser::new();
        let pat = PAT {
            entries: vec![PATEntry {
                program_number: 1,
                program_map_pid: 0x1000,
            }],
        };
        let mut body = BytesMut::new();
        pat.write_to(&mut body);

        let mut payload = BytesMut::from(&[0u8][..]);
        write_section(&mut payload, TABLE_ID_PAT, TRANSPORT_STREAM_ID, &body);

        let section = parser.parse_section(&payload).unwrap();
        assert_eq!(section.table_id, TABLE_ID_PAT);
        assert_eq!(section.table_id_extension, TRANSPORT_STREAM_ID);
        assert_eq!(section.version, 0);
        assert_eq!(parser.parse_pat(section.body).unwrap(), pat);

        let last = payload.len() - 1;
        payload[last] ^= 0x01;
        assert!(parser.parse_section(&payload).is_err());
    }

    #[test]
    fn test_parse_pat() {
        let parser = TSPacketParser::new();
        let data = [
            0x00, 0x01, // Program number
            0xF0, 0x00, // PID
            0x00, 0x02, // Program number
            0xE1, 0x23, // PID
        ];

        let pat = parser.parse_pat(&data).unwrap();
        assert_eq!(pat.entries.len(), 2);
        assert_eq!(pat.entries[0].program_number, 1);
        assert_eq!(pat.entries[0].program_map_pid, 0x1000);
        assert_eq!(pat.entries[1].program_number, 2);
        assert_eq!(pat.entries[1].program_map_pid, 0x0123);

        assert!(parser.parse_pat(&data[..3]).is_err());
    }

    #[test]
    fn test_parse_pmt() {
        let parser = TSPacketParser::new();
        let body = [
            0xE1, 0x00, // PCR PID 0x100
            0xF0, 0x02, 0x05, 0x00, // one empty descriptor
            0x1B, 0xE1, 0x00, 0xF0, 0x00, // H.264 on 0x100
        ];

        let pmt = parser.parse_pmt(&body).unwrap();
        assert_eq!(pmt.pcr_pid, 0x100);
        assert_eq!(pmt.program_descriptors.len(), 1);
        assert_eq!(pmt.elementary_stream_infos.len(), 1);
        assert_eq!(pmt.elementary_stream_infos[0].stream_type, STREAM_TYPE_H264);
        assert_eq!(pmt.elementary_stream_infos[0].elementary_pid, 0x100);

        assert!(parser.parse_pmt(&body[..5]).is_err());
    }

    #[test]
    fn test_parse_pes_header() {
        let parser = TSPacketParser::new();
        let mut buf = BytesMut::new();
        PESHeader::new(STREAM_ID_H264)
            .with_pts(39_600)
            .with_dts(36_000)
            .write_to(&mut buf);
        buf.extend_from_slice(&[0, 0, 0, 1, 0x09, 0xF0]);

        let parsed = parser.parse_pes_header(&buf).unwrap();
        assert_eq!(parsed.header.stream_id, STREAM_ID_H264);
        assert_eq!(parsed.header.marker_bits, 0b10);
        assert_eq!(parsed.header.pts, Some(39_600));
        assert_eq!(parsed.header.dts, Some(36_000));
        assert_eq!(parsed.payload_offset, 19);
        assert_eq!(&buf[parsed.payload_offset..], &[0, 0, 0, 1, 0x09, 0xF0]);

        let mut buf = BytesMut::new();
        PESHeader::new(STREAM_ID_H264).with_pts(-1).write_to(&mut buf);
        let parsed = parser.parse_pes_header(&buf).unwrap();
        assert_eq!(parsed.header.pts, Some(0x1_FFFF_FFFF));
        assert_eq!(parsed.header.dts, None);

        assert!(parser.parse_pes_header(&[0, 0, 2, 0xE0, 0, 0, 0x80, 0, 0]).is_err());
    }
}
