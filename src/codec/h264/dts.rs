// DTS extraction from PTS and the picture order count, after the approach
// of gortsplib's h264 DTSExtractor.

use bytes::Bytes;
use thiserror::Error;

use crate::av::MediaTime;
use crate::error::VdkError;
use super::parser::parse_slice_header;
use super::types::{NalUnitType, PicOrderCnt, Sps};

/// Just over one 90 kHz tick, so consecutive DTS values never round to the
/// same tick.
const DTS_STEP: MediaTime = MediaTime::from_nanos(11_112);

/// Failures of [`DtsExtractor::extract`].
#[derive(Debug, Error)]
pub enum DtsError {
    /// Reordering state starts at an IDR.
    #[error("first access unit must contain an IDR")]
    FirstCallNotIdr,

    /// Field-coded streams.
    #[error("frame_mbs_only_flag = 0 is not supported")]
    FieldCodingUnsupported,

    /// POC type 1 streams.
    #[error("pic_order_cnt_type = 1 is not supported")]
    PicOrderCntType1Unsupported,

    /// No non-IDR slice to read a POC from.
    #[error("POC not found")]
    PocNotFound,

    /// POC lies before the expected one.
    #[error("invalid POC")]
    PocInvalid,

    /// Derived DTS, then PTS.
    #[error("DTS is greater than PTS: {0} vs {1}")]
    DtsGreaterThanPts(MediaTime, MediaTime),

    /// Previous DTS, then the derived one.
    #[error("DTS is not monotonically increasing, was {0}, now is {1}")]
    DtsNotIncreasing(MediaTime, MediaTime),

    /// Slice header could not be parsed.
    #[error("slice header: {0}")]
    SliceHeader(#[from] VdkError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PocIncrement {
    One = 1,
    Two = 2,
}

impl PocIncrement {
    fn value(self) -> i64 {
        self as i64
    }
}

#[derive(Debug)]
struct Reorder {
    expected_poc: u32,
    reordered_frames: i64,
    pause_dts: i64,
    poc_increment: PocIncrement,
}

/// Derives decoding timestamps from presentation timestamps.
///
/// With `pic_order_cnt_type == 0` the distance between each picture's POC
/// and the POC expected in decoding order tells how many frames the encoder
/// reordered; DTS values are then interpolated between the previous DTS and
/// the current PTS. The first access unit must be an IDR. Without reordering
/// the DTS equals the PTS.
#[derive(Debug, Default)]
pub struct DtsExtractor {
    state: Option<Reorder>,
    prev_dts: Option<MediaTime>,
}

impl DtsExtractor {
    /// Creates an extractor awaiting its first IDR.
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts the DTS of an access unit. Calls must follow decoding order.
    ///
    /// Every returned DTS is at most the PTS and above the previous DTS.
    pub fn extract(
        &mut self,
        nalus: &[Bytes],
        idr_present: bool,
        pts: MediaTime,
        sps: &Sps,
    ) -> Result<MediaTime, DtsError> {
        let dts = self.extract_inner(nalus, idr_present, pts, sps)?;
        if dts > pts {
            return Err(DtsError::DtsGreaterThanPts(dts, pts));
        }
        if let Some(prev_dts) = self.prev_dts {
            if dts <= prev_dts {
                return Err(DtsError::DtsNotIncreasing(prev_dts, dts));
            }
        }
        self.prev_dts = Some(dts);
        Ok(dts)
    }

    fn extract_inner(
        &mut self,
        nalus: &[Bytes],
        idr_present: bool,
        pts: MediaTime,
        sps: &Sps,
    ) -> Result<MediaTime, DtsError> {
        let log2_max_poc_lsb = match sps.pic_order_cnt {
            PicOrderCnt::TypeZero {
                log2_max_pic_order_cnt_lsb_minus4,
            } => u32::from(log2_max_pic_order_cnt_lsb_minus4) + 4,
            PicOrderCnt::TypeOne { .. } => return Err(DtsError::PicOrderCntType1Unsupported),
            PicOrderCnt::TypeTwo => return Ok(pts),
        };
        if !sps.frame_mbs_only_flag {
            return Err(DtsError::FieldCodingUnsupported);
        }

        if let (Some(state), Some(prev_dts)) = (self.state.as_mut(), self.prev_dts) {
            return state.next_dts(nalus, idr_present, pts, prev_dts, sps, log2_max_poc_lsb);
        }
        if !idr_present {
            return Err(DtsError::FirstCallNotIdr);
        }
        self.state = Some(Reorder::new());
        Ok(pts)
    }
}

impl Reorder {
    fn new() -> Self {
        Self {
            expected_poc: 0,
            reordered_frames: 0,
            pause_dts: 0,
            poc_increment: PocIncrement::Two,
        }
    }

    fn next_dts(
        &mut self,
        nalus: &[Bytes],
        idr_present: bool,
        pts: MediaTime,
        prev_dts: MediaTime,
        sps: &Sps,
        log2_max_poc_lsb: u32,
    ) -> Result<MediaTime, DtsError> {
        if idr_present {
            self.expected_poc = 0;
            self.reordered_frames = 0;
            self.pause_dts = 0;
            self.poc_increment = PocIncrement::Two;
            return Ok(pts);
        }

        self.expected_poc = self
            .expected_poc
            .wrapping_add(self.poc_increment as u32)
            & ((1u32 << log2_max_poc_lsb) - 1);

        if self.pause_dts > 0 {
            self.pause_dts -= 1;
            return Ok(prev_dts + DTS_STEP);
        }

        let poc = find_picture_order_count(nalus, sps)?;

        if self.poc_increment == PocIncrement::Two && poc % 2 != 0 {
            self.poc_increment = PocIncrement::One;
            self.expected_poc /= 2;
        }

        let inc = self.poc_increment.value();
        let poc_diff = i64::from(poc_diff(poc, self.expected_poc, log2_max_poc_lsb))
            + self.reordered_frames * inc;

        if poc_diff < 0 {
            return Err(DtsError::PocInvalid);
        }
        if poc_diff == 0 {
            return Ok(pts);
        }

        let reordered_frames = match self.poc_increment {
            PocIncrement::One => poc_diff - self.reordered_frames,
            PocIncrement::Two => (poc_diff - self.reordered_frames * 2) / 2,
        };

        if reordered_frames > self.reordered_frames {
            self.pause_dts = reordered_frames - self.reordered_frames - 1;
            self.reordered_frames = reordered_frames;
            return Ok(prev_dts + DTS_STEP);
        }

        let dts_diff = (pts - prev_dts).nanos();
        let dts_inc = match self.poc_increment {
            PocIncrement::One => dts_diff / (poc_diff + 1),
            PocIncrement::Two => dts_diff * 2 / (poc_diff + 2),
        };
        Ok(prev_dts + MediaTime::from_nanos(dts_inc))
    }
}

/// Signed distance between two POC LSB values, modulo `MaxPicOrderCntLsb`.
fn poc_diff(poc1: u32, poc2: u32, log2_max_poc_lsb: u32) -> i32 {
    let max = 1i64 << log2_max_poc_lsb;
    let half = max / 2;
    let diff = i64::from(poc1) - i64::from(poc2);
    let wrapped = if diff < -(half - 1) {
        diff + max
    } else if diff > half - 1 {
        diff - max
    } else {
        diff
    };
    wrapped as i32
}

fn find_picture_order_count(nalus: &[Bytes], sps: &Sps) -> Result<u32, DtsError> {
    let slice = nalus
        .iter()
        .find(|n| NalUnitType::of(n) == Some(NalUnitType::NonIdrSlice))
        .ok_or(DtsError::PocNotFound)?;
    parse_slice_header(slice, sps)?
        .pic_order_cnt_lsb
        .ok_or(DtsError::PocNotFound)
}
