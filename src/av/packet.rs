use bytes::Bytes;
use std::time::Duration;

/// One picture's worth of NAL units plus its presentation time.
///
/// NAL units are raw (no start codes, no length prefix); the first byte of
/// each carries the 5-bit type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessUnit {
    /// NAL units in decoding order.
    pub nalus: Vec<Bytes>,
    /// Presentation time since an arbitrary stream epoch.
    pub pts: Duration,
}

impl AccessUnit {
    /// Creates an access unit from anything convertible to NAL buffers.
    pub fn new<I, N>(nalus: I, pts: Duration) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Bytes>,
    {
        Self {
            nalus: nalus.into_iter().map(Into::into).collect(),
            pts,
        }
    }

    /// Appends a NAL unit.
    pub fn with_nalu(mut self, nalu: impl Into<Bytes>) -> Self {
        self.nalus.push(nalu.into());
        self
    }

    /// Number of NAL units.
    pub fn len(&self) -> usize {
        self.nalus.len()
    }

    /// True when the unit carries no NAL units.
    pub fn is_empty(&self) -> bool {
        self.nalus.is_empty()
    }
}

/// A transport-stream-ready payload with its timing metadata.
///
/// Produced by the encoder for every access unit that passes the gates and
/// handed straight to the container muxer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPacket {
    /// Elementary stream PID.
    pub pid: u16,
    /// PES stream id (0xE0 for the first video stream).
    pub stream_id: u8,
    /// Set when the payload starts with a decodable keyframe.
    pub random_access: bool,
    /// PES optional-header marker bits, always `0b10`.
    pub marker_bits: u8,
    /// Presentation timestamp in 90 kHz ticks.
    pub pts: i64,
    /// Decoding timestamp in 90 kHz ticks, present only when it differs
    /// from `pts`.
    pub dts: Option<i64>,
    /// Annex-B packed NAL units.
    pub data: Bytes,
}

impl EncodedPacket {
    /// Creates a packet carrying PTS only.
    pub fn new(pid: u16, stream_id: u8, data: impl Into<Bytes>, pts: i64) -> Self {
        Self {
            pid,
            stream_id,
            random_access: false,
            marker_bits: super::PES_MARKER_BITS,
            pts,
            dts: None,
            data: data.into(),
        }
    }

    /// Sets the decoding timestamp.
    pub fn with_dts(mut self, dts: i64) -> Self {
        self.dts = Some(dts);
        self
    }

    /// Sets the random access indicator.
    pub fn with_random_access(mut self, random_access: bool) -> Self {
        self.random_access = random_access;
        self
    }

    /// The DTS, falling back to the PTS when only the PTS is carried.
    pub fn decode_ticks(&self) -> i64 {
        self.dts.unwrap_or(self.pts)
    }
}
