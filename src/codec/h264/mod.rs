//! # H.264/AVC bitstream support
//!
//! Everything the transport-stream encoder needs from an H.264 stream:
//!
//! - NAL unit classification
//! - Sequence parameter set decoding
//! - Annex-B packing and splitting
//! - Access unit assembly from a flat NAL stream
//! - `sprop-parameter-sets` parsing
//! - DTS extraction from picture order counts
//!
//! [`H264Codec`] bundles these behind the [`BitstreamCodec`] contract.
//!
//! ## Example: splitting an Annex-B stream into access units
//!
//! ```rust
//! use bytes::Bytes;
//! use h264ts::codec::h264::{split_annexb, AccessUnitAssembler, NalUnitType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = Bytes::from_static(&[0, 0, 0, 1, 0x09, 0xF0, 0, 0, 0, 1, 0x65, 0x88]);
//!
//! let mut assembler = AccessUnitAssembler::new();
//! for nalu in split_annexb(&data) {
//!     assembler.push(nalu)?;
//! }
//! let au = assembler.flush().unwrap();
//! assert_eq!(NalUnitType::of(&au[1]), Some(NalUnitType::IdrSlice));
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;

use crate::av::{BitstreamCodec, MediaTime};
use crate::error::{Result, VdkError};

/// Annex-B byte stream framing
pub mod annexb;
/// Access unit boundary detection
pub mod assembler;
/// DTS extraction
pub mod dts;
/// SPS and slice header parsing
pub mod parser;
/// Parameter sets carried in SDP
pub mod sprop;
/// NAL unit and parameter set types
pub mod types;

#[cfg(test)]
pub(crate) mod test_util;
#[cfg(test)]
mod tests;

#[doc(inline)]
pub use annexb::{pack_annexb, split_annexb};
#[doc(inline)]
pub use assembler::AccessUnitAssembler;
#[doc(inline)]
pub use dts::{DtsError, DtsExtractor};
#[doc(inline)]
pub use parser::{parse_slice_header, parse_sps, remove_emulation_prevention, SliceHeader};
#[doc(inline)]
pub use sprop::{parse_sprop_parameter_sets, ParameterSets};
#[doc(inline)]
pub use types::*;

/// The default [`BitstreamCodec`]: this module's parsers plus a
/// [`DtsExtractor`].
///
/// Holds reordering state, so use one codec per stream.
#[derive(Debug, Default)]
pub struct H264Codec {
    dts_extractor: DtsExtractor,
}

impl H264Codec {
    /// Creates a codec with a fresh DTS extractor.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BitstreamCodec for H264Codec {
    fn decode_sps(&self, nalu: &[u8]) -> Result<Sps> {
        parse_sps(nalu).map_err(|e| VdkError::ParameterSet(e.to_string()))
    }

    fn pack_annexb(&self, nalus: &[Bytes]) -> Result<Bytes> {
        pack_annexb(nalus)
    }

    fn extract_dts(
        &mut self,
        nalus: &[Bytes],
        idr_present: bool,
        pts: MediaTime,
        sps: &Sps,
    ) -> Result<MediaTime> {
        self.dts_extractor
            .extract(nalus, idr_present, pts, sps)
            .map_err(|e| VdkError::Codec(format!("DTS extraction failed: {}", e)))
    }
}
