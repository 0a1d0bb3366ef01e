use base64::Engine as _;
use bytes::Bytes;

use crate::error::{Result, VdkError};
use super::types::NalUnitType;

/// Initial parameter sets, typically from an SDP `sprop-parameter-sets`
/// attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSets {
    /// Raw SPS NAL unit.
    pub sps: Option<Bytes>,
    /// Raw PPS NAL unit.
    pub pps: Option<Bytes>,
}

/// Parses a comma separated list of base64 NAL units, e.g.
/// `Z0LAHtkDxWhAAAADAEAAAAwDxYuS,aMuMsg==`.
///
/// The last SPS and the last PPS found win; other NAL types are ignored.
pub fn parse_sprop_parameter_sets(sprop: &str) -> Result<ParameterSets> {
    let mut sets = ParameterSets::default();

    for part in sprop.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let nalu = base64::engine::general_purpose::STANDARD
            .decode(part)
            .map_err(|e| VdkError::InvalidInput(format!("invalid sprop entry {:?}: {}", part, e)))?;

        match NalUnitType::of(&nalu) {
            Some(NalUnitType::Sps) => sets.sps = Some(Bytes::from(nalu)),
            Some(NalUnitType::Pps) => sets.pps = Some(Bytes::from(nalu)),
            Some(other) => log::debug!("ignoring {:?} NAL unit in sprop-parameter-sets", other),
            None => {}
        }
    }

    Ok(sets)
}
