use log::debug;

use crate::error::{Result, VdkError};
use crate::utils::BitReader;
use super::types::{FrameCropping, NalUnitType, PicOrderCnt, Sps};

const HIGH_PROFILES: [u8; 13] = [100, 110, 122, 244, 44, 83, 86, 118, 128, 138, 139, 134, 135];

/// Largest `pic_width_in_mbs_minus1` / `pic_height_in_map_units_minus1`
/// accepted; level 6.2 pictures need about 1055 macroblocks on a side.
const MAX_PIC_SIZE_IN_MBS_MINUS1: u32 = 2047;

/// Strips `emulation_prevention_three_byte`s, turning a NAL payload into
/// its RBSP.
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut zeros = 0usize;

    for &byte in data {
        if zeros >= 2 && byte == 0x03 {
            zeros = 0;
            continue;
        }
        zeros = if byte == 0x00 { zeros + 1 } else { 0 };
        out.push(byte);
    }

    out
}

/// Decodes an SPS NAL unit, header byte included.
pub fn parse_sps(nalu: &[u8]) -> Result<Sps> {
    match NalUnitType::of(nalu) {
        Some(NalUnitType::Sps) => {}
        Some(other) => {
            return Err(VdkError::InvalidData(format!(
                "expected an SPS NAL unit, got {:?}",
                other
            )))
        }
        None => return Err(VdkError::InvalidData("empty SPS NAL unit".into())),
    }

    let rbsp = remove_emulation_prevention(&nalu[1..]);
    let mut reader = BitReader::new(&rbsp);

    let mut sps = Sps {
        profile_idc: reader.read_bits(8)? as u8,
        constraint_flags: reader.read_bits(8)? as u8,
        level_idc: reader.read_bits(8)? as u8,
        seq_parameter_set_id: reader.read_golomb()?,
        chroma_format_idc: 1,
        ..Default::default()
    };

    if sps.seq_parameter_set_id > 31 {
        return Err(VdkError::InvalidData(format!(
            "seq_parameter_set_id {} out of range",
            sps.seq_parameter_set_id
        )));
    }

    if HIGH_PROFILES.contains(&sps.profile_idc) {
        sps.chroma_format_idc = reader.read_golomb()?;
        if sps.chroma_format_idc > 3 {
            return Err(VdkError::InvalidData(format!(
                "chroma_format_idc {} out of range",
                sps.chroma_format_idc
            )));
        }
        if sps.chroma_format_idc == 3 {
            sps.separate_colour_plane_flag = reader.read_flag()?;
        }
        sps.bit_depth_luma_minus8 = reader.read_golomb()?;
        sps.bit_depth_chroma_minus8 = reader.read_golomb()?;
        reader.read_flag()?; // qpprime_y_zero_transform_bypass_flag

        if reader.read_flag()? {
            let count = if sps.chroma_format_idc != 3 { 8 } else { 12 };
            for i in 0..count {
                if reader.read_flag()? {
                    skip_scaling_list(&mut reader, if i < 6 { 16 } else { 64 })?;
                }
            }
        }
    }

    let log2_max_frame_num_minus4 = reader.read_golomb()?;
    if log2_max_frame_num_minus4 > 12 {
        return Err(VdkError::InvalidData(format!(
            "log2_max_frame_num_minus4 {} out of range",
            log2_max_frame_num_minus4
        )));
    }
    sps.log2_max_frame_num_minus4 = log2_max_frame_num_minus4 as u8;

    sps.pic_order_cnt = match reader.read_golomb()? {
        0 => {
            let lsb = reader.read_golomb()?;
            if lsb > 12 {
                return Err(VdkError::InvalidData(format!(
                    "log2_max_pic_order_cnt_lsb_minus4 {} out of range",
                    lsb
                )));
            }
            PicOrderCnt::TypeZero {
                log2_max_pic_order_cnt_lsb_minus4: lsb as u8,
            }
        }
        1 => {
            let delta_pic_order_always_zero_flag = reader.read_flag()?;
            let offset_for_non_ref_pic = reader.read_signed_golomb()?;
            let offset_for_top_to_bottom_field = reader.read_signed_golomb()?;
            let cycle = reader.read_golomb()?;
            if cycle > 255 {
                return Err(VdkError::InvalidData(format!(
                    "num_ref_frames_in_pic_order_cnt_cycle {} out of range",
                    cycle
                )));
            }
            let offsets_for_ref_frame = (0..cycle)
                .map(|_| reader.read_signed_golomb())
                .collect::<Result<Vec<_>>>()?;
            PicOrderCnt::TypeOne {
                delta_pic_order_always_zero_flag,
                offset_for_non_ref_pic,
                offset_for_top_to_bottom_field,
                offsets_for_ref_frame,
            }
        }
        2 => PicOrderCnt::TypeTwo,
        other => {
            return Err(VdkError::InvalidData(format!(
                "pic_order_cnt_type {} out of range",
                other
            )))
        }
    };

    sps.max_num_ref_frames = reader.read_golomb()?;
    sps.gaps_in_frame_num_value_allowed_flag = reader.read_flag()?;
    sps.pic_width_in_mbs_minus1 = reader.read_golomb()?;
    sps.pic_height_in_map_units_minus1 = reader.read_golomb()?;
    for (name, value) in [
        ("pic_width_in_mbs_minus1", sps.pic_width_in_mbs_minus1),
        ("pic_height_in_map_units_minus1", sps.pic_height_in_map_units_minus1),
    ] {
        if value > MAX_PIC_SIZE_IN_MBS_MINUS1 {
            return Err(VdkError::InvalidData(format!("{} {} out of range", name, value)));
        }
    }
    sps.frame_mbs_only_flag = reader.read_flag()?;
    if !sps.frame_mbs_only_flag {
        sps.mb_adaptive_frame_field_flag = reader.read_flag()?;
    }
    sps.direct_8x8_inference_flag = reader.read_flag()?;

    if reader.read_flag()? {
        sps.frame_cropping = Some(FrameCropping {
            left: reader.read_golomb()?,
            right: reader.read_golomb()?,
            top: reader.read_golomb()?,
            bottom: reader.read_golomb()?,
        });
    }
    sps.vui_parameters_present_flag = reader.read_flag()?;

    debug!(
        "parsed SPS: profile {} level {} {}x{}",
        sps.profile_idc,
        sps.level_idc,
        sps.width(),
        sps.height()
    );

    Ok(sps)
}

fn skip_scaling_list(reader: &mut BitReader, size: usize) -> Result<()> {
    let mut last_scale = 8i32;
    let mut next_scale = 8i32;

    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = reader.read_signed_golomb()?;
            if !(-128..=127).contains(&delta_scale) {
                return Err(VdkError::InvalidData(format!(
                    "delta_scale {} out of range",
                    delta_scale
                )));
            }
            next_scale = (last_scale + delta_scale + 256) % 256;
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
    }

    Ok(())
}

/// Leading fields of a slice header, up to the picture order count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceHeader {
    /// `first_mb_in_slice`; zero on the first slice of a picture.
    pub first_mb_in_slice: u32,
    /// `slice_type` (0..=9).
    pub slice_type: u32,
    /// `pic_parameter_set_id`
    pub pic_parameter_set_id: u32,
    /// `frame_num`
    pub frame_num: u32,
    /// `pic_order_cnt_lsb`, present with POC type 0 only.
    pub pic_order_cnt_lsb: Option<u32>,
}

/// Reads only `first_mb_in_slice` from a slice NAL unit; needs no SPS.
pub fn first_mb_in_slice(nalu: &[u8]) -> Result<u32> {
    if nalu.len() < 2 {
        return Err(VdkError::InvalidData("slice NAL unit too short".into()));
    }
    // The first ue(v) fits in a few bytes, unescaping those is enough.
    let head = remove_emulation_prevention(&nalu[1..nalu.len().min(9)]);
    BitReader::new(&head).read_golomb()
}

/// Parses a slice header up to `pic_order_cnt_lsb`.
///
/// Field pictures are rejected: their POC cannot be compared frame by frame.
pub fn parse_slice_header(nalu: &[u8], sps: &Sps) -> Result<SliceHeader> {
    let nal_type = NalUnitType::of(nalu)
        .ok_or_else(|| VdkError::InvalidData("empty slice NAL unit".into()))?;
    if !matches!(nal_type, NalUnitType::NonIdrSlice | NalUnitType::IdrSlice) {
        return Err(VdkError::InvalidData(format!(
            "expected a slice NAL unit, got {:?}",
            nal_type
        )));
    }

    let rbsp = remove_emulation_prevention(&nalu[1..]);
    let mut reader = BitReader::new(&rbsp);

    let first_mb_in_slice = reader.read_golomb()?;
    let slice_type = reader.read_golomb()?;
    let pic_parameter_set_id = reader.read_golomb()?;
    if sps.separate_colour_plane_flag {
        reader.skip_bits(2)?; // colour_plane_id
    }
    let frame_num = reader.read_bits(u32::from(sps.log2_max_frame_num_minus4) + 4)?;

    if !sps.frame_mbs_only_flag && reader.read_flag()? {
        return Err(VdkError::InvalidData("field pictures are not supported".into()));
    }

    if nal_type == NalUnitType::IdrSlice {
        reader.read_golomb()?; // idr_pic_id
    }

    let pic_order_cnt_lsb = match sps.pic_order_cnt {
        PicOrderCnt::TypeZero {
            log2_max_pic_order_cnt_lsb_minus4,
        } => Some(reader.read_bits(u32::from(log2_max_pic_order_cnt_lsb_minus4) + 4)?),
        _ => None,
    };

    Ok(SliceHeader {
        first_mb_in_slice,
        slice_type,
        pic_parameter_set_id,
        frame_num,
        pic_order_cnt_lsb,
    })
}
