use bytes::Bytes;

/// NAL unit type tag, the low 5 bits of the NAL header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NalUnitType {
    /// 0, and the reserved/unspecified values 13..=23 and 24..=31.
    Unspecified(u8),
    /// 1
    NonIdrSlice,
    /// 2
    DataPartitionA,
    /// 3
    DataPartitionB,
    /// 4
    DataPartitionC,
    /// 5
    IdrSlice,
    /// 6
    Sei,
    /// 7
    Sps,
    /// 8
    Pps,
    /// 9
    AccessUnitDelimiter,
    /// 10
    EndOfSequence,
    /// 11
    EndOfStream,
    /// 12
    FillerData,
}

impl NalUnitType {
    /// Classifies a NAL unit by its header byte. `None` for an empty buffer.
    pub fn of(nalu: &[u8]) -> Option<Self> {
        nalu.first().map(|&header| Self::from(header))
    }

    /// True for coded slice data (types 1 to 5).
    pub fn is_vcl(self) -> bool {
        matches!(
            self,
            NalUnitType::NonIdrSlice
                | NalUnitType::DataPartitionA
                | NalUnitType::DataPartitionB
                | NalUnitType::DataPartitionC
                | NalUnitType::IdrSlice
        )
    }
}

impl From<u8> for NalUnitType {
    fn from(header: u8) -> Self {
        match header & 0x1F {
            1 => NalUnitType::NonIdrSlice,
            2 => NalUnitType::DataPartitionA,
            3 => NalUnitType::DataPartitionB,
            4 => NalUnitType::DataPartitionC,
            5 => NalUnitType::IdrSlice,
            6 => NalUnitType::Sei,
            7 => NalUnitType::Sps,
            8 => NalUnitType::Pps,
            9 => NalUnitType::AccessUnitDelimiter,
            10 => NalUnitType::EndOfSequence,
            11 => NalUnitType::EndOfStream,
            12 => NalUnitType::FillerData,
            other => NalUnitType::Unspecified(other),
        }
    }
}

/// Access unit delimiter with `primary_pic_type = 7` (any slice type).
pub const ACCESS_UNIT_DELIMITER: [u8; 2] = [0x09, 0xF0];

/// True if any of the NAL units is an IDR slice.
pub fn idr_present(nalus: &[Bytes]) -> bool {
    nalus
        .iter()
        .any(|nalu| NalUnitType::of(nalu) == Some(NalUnitType::IdrSlice))
}

/// Picture order count coding, `pic_order_cnt_type` with its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PicOrderCnt {
    /// Type 0: POC LSBs are sent in every slice header.
    TypeZero {
        /// `log2_max_pic_order_cnt_lsb_minus4`
        log2_max_pic_order_cnt_lsb_minus4: u8,
    },
    /// Type 1: POC derived from frame_num and offsets.
    TypeOne {
        /// `delta_pic_order_always_zero_flag`
        delta_pic_order_always_zero_flag: bool,
        /// `offset_for_non_ref_pic`
        offset_for_non_ref_pic: i32,
        /// `offset_for_top_to_bottom_field`
        offset_for_top_to_bottom_field: i32,
        /// `offset_for_ref_frame[]`
        offsets_for_ref_frame: Vec<i32>,
    },
    /// Type 2: output order equals decoding order.
    TypeTwo,
}

impl Default for PicOrderCnt {
    fn default() -> Self {
        PicOrderCnt::TypeTwo
    }
}

/// Frame cropping rectangle in luma samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCropping {
    /// Left offset.
    pub left: u32,
    /// Right offset.
    pub right: u32,
    /// Top offset.
    pub top: u32,
    /// Bottom offset.
    pub bottom: u32,
}

/// Decoded sequence parameter set: the fields timestamp extraction and
/// stream description need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sps {
    /// `profile_idc`, e.g. 66 baseline, 77 main, 100 high.
    pub profile_idc: u8,
    /// `constraint_set0_flag` to `constraint_set5_flag` plus reserved bits.
    pub constraint_flags: u8,
    /// `level_idc`, ten times the level number.
    pub level_idc: u8,
    /// `seq_parameter_set_id`
    pub seq_parameter_set_id: u32,
    /// `chroma_format_idc`; 1 (4:2:0) unless a high profile says otherwise.
    pub chroma_format_idc: u32,
    /// `separate_colour_plane_flag`
    pub separate_colour_plane_flag: bool,
    /// `bit_depth_luma_minus8`
    pub bit_depth_luma_minus8: u32,
    /// `bit_depth_chroma_minus8`
    pub bit_depth_chroma_minus8: u32,
    /// `log2_max_frame_num_minus4`, sizing `frame_num` in slice headers.
    pub log2_max_frame_num_minus4: u8,
    /// Picture order count type and its parameters.
    pub pic_order_cnt: PicOrderCnt,
    /// `max_num_ref_frames`
    pub max_num_ref_frames: u32,
    /// `gaps_in_frame_num_value_allowed_flag`
    pub gaps_in_frame_num_value_allowed_flag: bool,
    /// `pic_width_in_mbs_minus1`
    pub pic_width_in_mbs_minus1: u32,
    /// `pic_height_in_map_units_minus1`
    pub pic_height_in_map_units_minus1: u32,
    /// `frame_mbs_only_flag`; false when field coding may be used.
    pub frame_mbs_only_flag: bool,
    /// `mb_adaptive_frame_field_flag`
    pub mb_adaptive_frame_field_flag: bool,
    /// `direct_8x8_inference_flag`
    pub direct_8x8_inference_flag: bool,
    /// Cropping rectangle, if `frame_cropping_flag` is set.
    pub frame_cropping: Option<FrameCropping>,
    /// `vui_parameters_present_flag`; VUI itself is not parsed.
    pub vui_parameters_present_flag: bool,
}

impl Sps {
    /// Decoded picture width in luma samples, after cropping.
    pub fn width(&self) -> u32 {
        let width = self.pic_width_in_mbs_minus1.saturating_add(1).saturating_mul(16);
        let (crop_unit_x, _) = self.crop_units();
        let crop = self
            .frame_cropping
            .map(|c| c.left.saturating_add(c.right).saturating_mul(crop_unit_x))
            .unwrap_or(0);
        width.saturating_sub(crop)
    }

    /// Decoded picture height in luma samples, after cropping.
    pub fn height(&self) -> u32 {
        let field_factor = if self.frame_mbs_only_flag { 1 } else { 2 };
        let height = self
            .pic_height_in_map_units_minus1
            .saturating_add(1)
            .saturating_mul(16 * field_factor);
        let (_, crop_unit_y) = self.crop_units();
        let crop = self
            .frame_cropping
            .map(|c| c.top.saturating_add(c.bottom).saturating_mul(crop_unit_y))
            .unwrap_or(0);
        height.saturating_sub(crop)
    }

    fn crop_units(&self) -> (u32, u32) {
        let field_factor = if self.frame_mbs_only_flag { 1 } else { 2 };
        let chroma_array_type = if self.separate_colour_plane_flag {
            0
        } else {
            self.chroma_format_idc
        };
        match chroma_array_type {
            1 => (2, 2 * field_factor),
            2 => (2, field_factor),
            _ => (1, field_factor),
        }
    }
}
