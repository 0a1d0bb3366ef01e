use bytes::Bytes;

use crate::error::Result;
use super::parser::first_mb_in_slice;
use super::types::NalUnitType;

/// Groups a flat NAL unit stream (e.g. from [`split_annexb`]) into access
/// units.
///
/// A new access unit starts, once the current one holds a coded slice, at an
/// access unit delimiter, an SPS, PPS or SEI, or a slice whose
/// `first_mb_in_slice` is zero.
///
/// [`split_annexb`]: super::split_annexb
#[derive(Debug, Default)]
pub struct AccessUnitAssembler {
    current: Vec<Bytes>,
    has_vcl: bool,
}

impl AccessUnitAssembler {
    /// Creates an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one NAL unit, returning the previous access unit when this one
    /// starts a new access unit. Empty NAL units are ignored.
    pub fn push(&mut self, nalu: Bytes) -> Result<Option<Vec<Bytes>>> {
        let nal_type = match NalUnitType::of(&nalu) {
            Some(t) => t,
            None => return Ok(None),
        };

        let starts_new = self.has_vcl
            && match nal_type {
                NalUnitType::AccessUnitDelimiter
                | NalUnitType::Sps
                | NalUnitType::Pps
                | NalUnitType::Sei => true,
                NalUnitType::Unspecified(14..=18) => true,
                t if t.is_vcl() => first_mb_in_slice(&nalu)? == 0,
                _ => false,
            };

        let completed = if starts_new { self.take() } else { None };

        self.has_vcl |= nal_type.is_vcl();
        self.current.push(nalu);
        Ok(completed)
    }

    /// Returns whatever is buffered as the final access unit.
    pub fn flush(&mut self) -> Option<Vec<Bytes>> {
        self.take()
    }

    fn take(&mut self) -> Option<Vec<Bytes>> {
        self.has_vcl = false;
        if self.current.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.current))
        }
    }
}
