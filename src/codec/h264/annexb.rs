use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, VdkError};

/// Four-byte start code written before every NAL unit.
pub const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// Packs NAL units into an Annex-B byte stream.
pub fn pack_annexb(nalus: &[Bytes]) -> Result<Bytes> {
    if nalus.is_empty() {
        return Err(VdkError::Codec("no NAL units to pack".into()));
    }

    let size = nalus.iter().map(|n| START_CODE.len() + n.len()).sum();
    let mut buf = BytesMut::with_capacity(size);
    for (i, nalu) in nalus.iter().enumerate() {
        if nalu.is_empty() {
            return Err(VdkError::Codec(format!("NAL unit {} is empty", i)));
        }
        buf.put_slice(&START_CODE);
        buf.put_slice(nalu);
    }

    Ok(buf.freeze())
}

/// Splits an Annex-B byte stream at its 3- and 4-byte start codes.
///
/// Bytes before the first start code and trailing zero bytes of each NAL
/// unit are discarded; empty NAL units are skipped.
pub fn split_annexb(data: &Bytes) -> Vec<Bytes> {
    let mut nalus = Vec::new();
    let mut start: Option<usize> = None;
    let mut i = 0;

    while i + 2 < data.len() {
        if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
            if let Some(s) = start {
                push_trimmed(&mut nalus, data.slice(s..i));
            }
            i += 3;
            start = Some(i);
        } else {
            i += 1;
        }
    }

    if let Some(s) = start {
        push_trimmed(&mut nalus, data.slice(s..));
    }

    nalus
}

fn push_trimmed(nalus: &mut Vec<Bytes>, nalu: Bytes) {
    let end = nalu.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    if end > 0 {
        nalus.push(nalu.slice(..end));
    }
}
