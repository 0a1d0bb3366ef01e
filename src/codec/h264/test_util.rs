//! Synthetic NAL units for unit tests.

use bytes::Bytes;

use crate::utils::BitWriter;

pub(crate) enum PocConfig {
    Type0 { log2_lsb_minus4: u32 },
    Type1,
    Type2,
}

/// Baseline-profile 320x240 SPS with `log2_max_frame_num_minus4 = 0`.
pub(crate) fn sps_nalu(poc: PocConfig) -> Bytes {
    sps_nalu_with_level(poc, 31)
}

pub(crate) fn sps_nalu_with_level(poc: PocConfig, level_idc: u32) -> Bytes {
    sps_nalu_with_size(poc, level_idc, 19, 14)
}

pub(crate) fn sps_nalu_with_size(
    poc: PocConfig,
    level_idc: u32,
    width_in_mbs_minus1: u32,
    height_in_map_units_minus1: u32,
) -> Bytes {
    let mut w = BitWriter::new();
    w.write_bits(0x67, 8);
    w.write_bits(66, 8); // profile_idc
    w.write_bits(0, 8); // constraint flags
    w.write_bits(level_idc, 8);
    w.write_golomb(0); // seq_parameter_set_id
    w.write_golomb(0); // log2_max_frame_num_minus4
    match poc {
        PocConfig::Type0 { log2_lsb_minus4 } => {
            w.write_golomb(0);
            w.write_golomb(log2_lsb_minus4);
        }
        PocConfig::Type1 => {
            w.write_golomb(1);
            w.write_bit(false);
            w.write_signed_golomb(0);
            w.write_signed_golomb(0);
            w.write_golomb(1);
            w.write_signed_golomb(0);
        }
        PocConfig::Type2 => w.write_golomb(2),
    }
    w.write_golomb(1); // max_num_ref_frames
    w.write_bit(false); // gaps_in_frame_num_value_allowed_flag
    w.write_golomb(width_in_mbs_minus1);
    w.write_golomb(height_in_map_units_minus1);
    w.write_bit(true); // frame_mbs_only_flag
    w.write_bit(true); // direct_8x8_inference_flag
    w.write_bit(false); // frame_cropping_flag
    w.write_bit(false); // vui_parameters_present_flag
    w.write_trailing_bits();
    Bytes::from(w.into_bytes())
}

/// 1920x1080 High profile SPS with POC type 2 and one 4x4 scaling list
/// whose first `delta_scale` is given.
pub(crate) fn high_profile_sps_nalu(first_delta_scale: i32) -> Bytes {
    let mut w = BitWriter::new();
    w.write_bits(0x67, 8);
    w.write_bits(100, 8);
    w.write_bits(0, 8);
    w.write_bits(40, 8);
    w.write_golomb(0); // sps id
    w.write_golomb(1); // chroma_format_idc 4:2:0
    w.write_golomb(0); // bit_depth_luma_minus8
    w.write_golomb(0); // bit_depth_chroma_minus8
    w.write_bit(false); // qpprime_y_zero_transform_bypass_flag
    w.write_bit(true); // seq_scaling_matrix_present_flag
    w.write_bit(true); // list 0 present
    w.write_signed_golomb(first_delta_scale);
    for _ in 1..16 {
        w.write_signed_golomb(0);
    }
    for _ in 1..8 {
        w.write_bit(false);
    }
    w.write_golomb(0); // log2_max_frame_num_minus4
    w.write_golomb(2); // poc type 2
    w.write_golomb(4);
    w.write_bit(false);
    w.write_golomb(119);
    w.write_golomb(67);
    w.write_bit(true);
    w.write_bit(true);
    w.write_bit(true); // frame_cropping_flag
    w.write_golomb(0);
    w.write_golomb(0);
    w.write_golomb(0);
    w.write_golomb(4);
    w.write_bit(true); // vui present
    w.write_trailing_bits();
    Bytes::from(w.into_bytes())
}

pub(crate) fn idr_slice() -> Bytes {
    let mut w = BitWriter::new();
    w.write_bits(0x65, 8);
    w.write_golomb(0); // first_mb_in_slice
    w.write_golomb(7); // slice_type I
    w.write_golomb(0); // pic_parameter_set_id
    w.write_bits(0, 4); // frame_num
    w.write_golomb(0); // idr_pic_id
    w.write_bits(0, 6); // pic_order_cnt_lsb
    w.write_bits(0b1011, 4);
    w.write_trailing_bits();
    Bytes::from(w.into_bytes())
}

/// P slice for an SPS with 4-bit frame_num and 6-bit POC LSB.
pub(crate) fn non_idr_slice(frame_num: u32, poc_lsb: u32) -> Bytes {
    let mut w = BitWriter::new();
    w.write_bits(0x41, 8);
    w.write_golomb(0); // first_mb_in_slice
    w.write_golomb(5); // slice_type P
    w.write_golomb(0); // pic_parameter_set_id
    w.write_bits(frame_num % 16, 4);
    w.write_bits(poc_lsb % 64, 6);
    w.write_bits(0b0110, 4);
    w.write_trailing_bits();
    Bytes::from(w.into_bytes())
}
