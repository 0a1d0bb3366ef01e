//! Synthetic H.264 NAL units and a small TS reader shared by the
//! integration tests.
#![allow(dead_code)]

use bytes::Bytes;
use h264ts::format::ts::{TSPacketParser, TS_PACKET_SIZE};
use h264ts::utils::BitWriter;

pub const PPS: &[u8] = &[0x68, 0xce, 0x3c, 0x80];
pub const AUD: &[u8] = &[0x09, 0x10];
/// The delimiter the encoder writes in front of every access unit.
pub const DELIMITER: &[u8] = &[0x09, 0xF0];
pub const SEI: &[u8] = &[0x06, 0x05, 0x01, 0x80];

/// Baseline-profile 320x240 SPS with a 4-bit frame_num. `poc_type0`
/// selects pic_order_cnt_type 0 with a 6-bit POC LSB, otherwise type 2.
pub fn sps(poc_type0: bool, level_idc: u32) -> Bytes {
    sps_with_width(poc_type0, level_idc, 19)
}

/// Same as [`sps`] with `pic_width_in_mbs_minus1` chosen by the caller.
pub fn sps_with_width(poc_type0: bool, level_idc: u32, width_in_mbs_minus1: u32) -> Bytes {
    let mut w = BitWriter::new();
    w.write_bits(0x67, 8);
    w.write_bits(66, 8); // profile_idc
    w.write_bits(0, 8); // constraint flags
    w.write_bits(level_idc, 8);
    w.write_golomb(0); // seq_parameter_set_id
    w.write_golomb(0); // log2_max_frame_num_minus4
    if poc_type0 {
        w.write_golomb(0);
        w.write_golomb(2); // log2_max_pic_order_cnt_lsb_minus4
    } else {
        w.write_golomb(2);
    }
    w.write_golomb(1); // max_num_ref_frames
    w.write_bit(false);
    w.write_golomb(width_in_mbs_minus1);
    w.write_golomb(14); // pic_height_in_map_units_minus1
    w.write_bit(true); // frame_mbs_only_flag
    w.write_bit(true);
    w.write_bit(false); // frame_cropping_flag
    w.write_bit(false); // vui_parameters_present_flag
    w.write_trailing_bits();
    Bytes::from(w.into_bytes())
}

/// High profile SPS carrying one 4x4 scaling list that starts with
/// `delta_scale`.
pub fn high_profile_sps(delta_scale: i32) -> Bytes {
    let mut w = BitWriter::new();
    w.write_bits(0x67, 8);
    w.write_bits(100, 8); // profile_idc
    w.write_bits(0, 8);
    w.write_bits(40, 8);
    w.write_golomb(0); // seq_parameter_set_id
    w.write_golomb(1); // chroma_format_idc
    w.write_golomb(0);
    w.write_golomb(0);
    w.write_bit(false);
    w.write_bit(true); // seq_scaling_matrix_present_flag
    w.write_bit(true);
    w.write_signed_golomb(delta_scale);
    for _ in 1..16 {
        w.write_signed_golomb(0);
    }
    for _ in 1..8 {
        w.write_bit(false);
    }
    w.write_golomb(0); // log2_max_frame_num_minus4
    w.write_golomb(2); // pic_order_cnt_type
    w.write_golomb(1);
    w.write_bit(false);
    w.write_golomb(119);
    w.write_golomb(67);
    w.write_bit(true);
    w.write_bit(true);
    w.write_bit(false);
    w.write_bit(false);
    w.write_trailing_bits();
    Bytes::from(w.into_bytes())
}

pub fn idr() -> Bytes {
    let mut w = BitWriter::new();
    w.write_bits(0x65, 8);
    w.write_golomb(0); // first_mb_in_slice
    w.write_golomb(7); // I slice
    w.write_golomb(0); // pic_parameter_set_id
    w.write_bits(0, 4); // frame_num
    w.write_golomb(0); // idr_pic_id
    w.write_bits(0, 6); // pic_order_cnt_lsb
    w.write_bits(0b1011, 4);
    w.write_trailing_bits();
    Bytes::from(w.into_bytes())
}

pub fn p_slice(frame_num: u32, poc_lsb: u32) -> Bytes {
    let mut w = BitWriter::new();
    w.write_bits(0x41, 8);
    w.write_golomb(0); // first_mb_in_slice
    w.write_golomb(5); // P slice
    w.write_golomb(0); // pic_parameter_set_id
    w.write_bits(frame_num % 16, 4);
    w.write_bits(poc_lsb % 64, 6);
    w.write_bits(0b0110, 4);
    w.write_trailing_bits();
    Bytes::from(w.into_bytes())
}

pub fn annexb(nalus: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for nalu in nalus {
        out.extend_from_slice(&[0, 0, 0, 1]);
        out.extend_from_slice(nalu);
    }
    out
}

/// One PES packet reassembled from the TS output.
#[derive(Debug, Clone)]
pub struct PesUnit {
    pub random_access: bool,
    pub pcr: Option<u64>,
    pub stream_id: u8,
    pub marker_bits: u8,
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub continuity_counters: Vec<u8>,
    pub payload: Vec<u8>,
}

pub fn pids(output: &[u8]) -> Vec<u16> {
    let parser = TSPacketParser::new();
    output
        .chunks(TS_PACKET_SIZE)
        .map(|p| parser.parse_header(p).unwrap().pid)
        .collect()
}

/// Reassembles the PES packets carried on `pid`.
pub fn read_pes_units(output: &[u8], pid: u16) -> Vec<PesUnit> {
    assert_eq!(output.len() % TS_PACKET_SIZE, 0, "output is not packet aligned");

    let parser = TSPacketParser::new();
    let mut units: Vec<PesUnit> = Vec::new();
    for packet in output.chunks(TS_PACKET_SIZE) {
        let header = parser.parse_header(packet).unwrap();
        if header.pid != pid {
            continue;
        }
        let payload = &packet[parser.payload_offset(packet).unwrap()..];

        if header.payload_unit_start {
            let af = parser.parse_adaptation_field(packet).unwrap().unwrap_or_default();
            let pes = parser.parse_pes_header(payload).unwrap();
            units.push(PesUnit {
                random_access: af.random_access,
                pcr: af.pcr,
                stream_id: pes.header.stream_id,
                marker_bits: pes.header.marker_bits,
                pts: pes.header.pts,
                dts: pes.header.dts,
                continuity_counters: vec![header.continuity_counter],
                payload: payload[pes.payload_offset..].to_vec(),
            });
        } else {
            let unit = units.last_mut().expect("continuation before unit start");
            unit.continuity_counters.push(header.continuity_counter);
            unit.payload.extend_from_slice(payload);
        }
    }
    units
}
