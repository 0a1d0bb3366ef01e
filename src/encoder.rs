//! The access-unit encoder: the stateful core turning H.264 access units
//! into transport-stream packets.

use bytes::Bytes;
use log::{debug, info, warn};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::av::{AccessUnit, BitstreamCodec, ContainerMuxer, EncodedPacket, MediaTime};
use crate::codec::h264::{idr_present, H264Codec, NalUnitType, Sps, ACCESS_UNIT_DELIMITER};
use crate::config::EncoderConfig;
use crate::error::{Result, VdkError};
use crate::format::ts::{TSMuxer, STREAM_ID_H264, STREAM_TYPE_H264};

/// Where an encoder is in its lifecycle. States only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    /// No access unit received yet.
    Created,
    /// Waiting for both an SPS and a PPS.
    AwaitingParameterSets,
    /// Parameter sets known, waiting for the first IDR.
    AwaitingIdr,
    /// Writing packets.
    Streaming,
    /// `close` was called.
    Closed,
}

impl fmt::Display for EncoderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EncoderState::Created => "created",
            EncoderState::AwaitingParameterSets => "awaiting parameter sets",
            EncoderState::AwaitingIdr => "awaiting IDR",
            EncoderState::Streaming => "streaming",
            EncoderState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Counters kept by an encoder over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderStats {
    /// Access units accepted by `encode`.
    pub received: u64,
    /// Dropped because no SPS or PPS was known.
    pub dropped_not_ready: u64,
    /// Dropped while waiting for the first IDR.
    pub dropped_before_idr: u64,
    /// Packets handed to the muxer.
    pub written: u64,
    /// Annex-B payload bytes handed to the muxer.
    pub bytes_written: u64,
}

#[derive(Debug, Clone)]
struct StoredSps {
    nalu: Bytes,
    decoded: Sps,
}

/// Encodes H.264 access units into a single-program MPEG-TS.
///
/// Each call to [`encode`](Self::encode) filters the unit's NAL units,
/// re-inserts SPS/PPS before keyframes, derives a DTS and hands one PES
/// packet to the muxer. Output starts at the first IDR once both parameter
/// sets are known; earlier units are dropped without error.
///
/// ```rust,no_run
/// use bytes::Bytes;
/// use h264ts::{AccessUnit, AccessUnitEncoder};
/// use std::time::Duration;
///
/// # fn main() -> h264ts::Result<()> {
/// let mut encoder = AccessUnitEncoder::create("stream.ts", None, None)?;
/// # let (sps, pps, idr) = (Bytes::new(), Bytes::new(), Bytes::new());
/// encoder.encode(&AccessUnit::new([sps, pps, idr], Duration::ZERO))?;
/// encoder.close()?;
/// # Ok(())
/// # }
/// ```
pub struct AccessUnitEncoder<C: BitstreamCodec, M: ContainerMuxer> {
    config: EncoderConfig,
    codec: C,
    muxer: M,
    sps: Option<StoredSps>,
    pps: Option<Bytes>,
    baseline: Option<MediaTime>,
    parameter_sets_ready: bool,
    first_idr_received: bool,
    closed: bool,
    stats: EncoderStats,
}

impl AccessUnitEncoder<H264Codec, TSMuxer<File>> {
    /// Creates `path` and encodes into it with the default configuration.
    pub fn create<P: AsRef<Path>>(path: P, sps: Option<Bytes>, pps: Option<Bytes>) -> Result<Self> {
        let config = EncoderConfig::default();
        let muxer = TSMuxer::<File>::create(path)?;
        Self::with_parts(config, H264Codec::new(), muxer, sps, pps)
    }
}

impl<W: Write> AccessUnitEncoder<H264Codec, TSMuxer<W>> {
    /// Encodes into an already open sink with the default configuration.
    pub fn with_writer(writer: W, sps: Option<Bytes>, pps: Option<Bytes>) -> Result<Self> {
        Self::with_config(writer, EncoderConfig::default(), sps, pps)
    }

    /// Encodes into an already open sink with the given configuration.
    pub fn with_config(
        writer: W,
        config: EncoderConfig,
        sps: Option<Bytes>,
        pps: Option<Bytes>,
    ) -> Result<Self> {
        let muxer = TSMuxer::from_config(writer, &config);
        Self::with_parts(config, H264Codec::new(), muxer, sps, pps)
    }
}

impl<C: BitstreamCodec, M: ContainerMuxer> AccessUnitEncoder<C, M> {
    /// Builds an encoder from explicit collaborators.
    ///
    /// A supplied SPS must decode. The muxer is configured with one H.264
    /// stream on `config.video_pid`, which also carries the PCR. On error
    /// the muxer, and the sink it owns, is dropped.
    pub fn with_parts(
        config: EncoderConfig,
        codec: C,
        mut muxer: M,
        sps: Option<Bytes>,
        pps: Option<Bytes>,
    ) -> Result<Self> {
        config.validate()?;

        let sps = match sps {
            Some(nalu) => {
                let decoded = codec.decode_sps(&nalu).map_err(parameter_set_error)?;
                Some(StoredSps { nalu, decoded })
            }
            None => None,
        };

        muxer
            .configure(config.video_pid, STREAM_TYPE_H264, config.video_pid)
            .map_err(mux_error)?;

        Ok(Self {
            config,
            codec,
            muxer,
            sps,
            pps,
            baseline: None,
            parameter_sets_ready: false,
            first_idr_received: false,
            closed: false,
            stats: EncoderStats::default(),
        })
    }

    /// Current position in the stream lifecycle.
    pub fn state(&self) -> EncoderState {
        if self.closed {
            EncoderState::Closed
        } else if self.baseline.is_none() {
            EncoderState::Created
        } else if !self.parameter_sets_ready {
            EncoderState::AwaitingParameterSets
        } else if !self.first_idr_received {
            EncoderState::AwaitingIdr
        } else {
            EncoderState::Streaming
        }
    }

    /// Counters since construction.
    pub fn stats(&self) -> EncoderStats {
        self.stats
    }

    /// Configuration in use.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// The most recently decoded SPS.
    pub fn sps(&self) -> Option<&Sps> {
        self.sps.as_ref().map(|s| &s.decoded)
    }

    /// Bitstream codec in use.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Container muxer in use.
    pub fn muxer(&self) -> &M {
        &self.muxer
    }

    /// Encodes one access unit. Units that arrive before the stream is
    /// decodable are dropped and still return `Ok`.
    pub fn encode(&mut self, au: &AccessUnit) -> Result<()> {
        if self.closed {
            return Err(VdkError::Closed);
        }
        if au.is_empty() {
            return Err(VdkError::InvalidInput("access unit has no NAL units".into()));
        }
        if let Some(i) = au.nalus.iter().position(|nalu| nalu.is_empty()) {
            return Err(VdkError::InvalidInput(format!("NAL unit {} is empty", i)));
        }
        self.stats.received += 1;

        let baseline = *self
            .baseline
            .get_or_insert_with(|| MediaTime::from_duration(au.pts));

        let filtered = self.filter_nalus(&au.nalus)?;

        let sps = match (&self.sps, &self.pps) {
            (Some(sps), Some(_)) => sps.decoded.clone(),
            _ => {
                self.stats.dropped_not_ready += 1;
                debug!("Dropping access unit at {:?}: no SPS/PPS yet", au.pts);
                return Ok(());
            }
        };
        if !self.parameter_sets_ready {
            self.parameter_sets_ready = true;
            info!("Parameter sets received, waiting for an IDR");
        }

        let idr = idr_present(&au.nalus);
        if !self.first_idr_received {
            if !idr {
                self.stats.dropped_before_idr += 1;
                debug!("Dropping access unit at {:?}: no IDR yet", au.pts);
                return Ok(());
            }
            self.first_idr_received = true;
            info!("First IDR received at {:?}, streaming", au.pts);
        }

        let data = self.codec.pack_annexb(&filtered).map_err(codec_error)?;

        let pts = MediaTime::from_duration(au.pts) - baseline;
        let dts = self
            .codec
            .extract_dts(&filtered, idr, pts, &sps)
            .map_err(codec_error)?;

        let offset = MediaTime::from_duration(self.config.pts_dts_offset);
        let pts_ticks = (pts + offset).to_pts_ticks();
        let dts_ticks = (dts + offset).to_pts_ticks();

        let mut packet = EncodedPacket::new(self.config.video_pid, STREAM_ID_H264, data, pts_ticks)
            .with_random_access(idr_present(&filtered));
        if dts_ticks != pts_ticks {
            packet = packet.with_dts(dts_ticks);
        }

        self.muxer.write_packet(&packet).map_err(mux_error)?;

        self.stats.written += 1;
        self.stats.bytes_written += packet.data.len() as u64;
        debug!(
            "Wrote packet: pts {} dts {} ({} NAL units, {} bytes{})",
            pts + offset,
            dts + offset,
            filtered.len(),
            packet.data.len(),
            if packet.random_access { ", random access" } else { "" }
        );
        Ok(())
    }

    /// Builds the output NAL list and updates the stored parameter sets.
    fn filter_nalus(&mut self, nalus: &[Bytes]) -> Result<Vec<Bytes>> {
        let mut filtered = Vec::with_capacity(nalus.len() + 3);
        filtered.push(Bytes::from_static(&ACCESS_UNIT_DELIMITER));

        for nalu in nalus {
            match NalUnitType::of(nalu) {
                Some(NalUnitType::Sps) => {
                    let changed = self.sps.as_ref().map_or(true, |stored| stored.nalu != *nalu);
                    if changed {
                        let decoded = self.codec.decode_sps(nalu).map_err(parameter_set_error)?;
                        info!(
                            "New SPS: {}x{}, profile {}, level {}",
                            decoded.width(),
                            decoded.height(),
                            decoded.profile_idc,
                            decoded.level_idc
                        );
                        self.sps = Some(StoredSps {
                            nalu: nalu.clone(),
                            decoded,
                        });
                    }
                }
                Some(NalUnitType::Pps) => self.pps = Some(nalu.clone()),
                Some(NalUnitType::AccessUnitDelimiter) | Some(NalUnitType::Sei) => {}
                Some(NalUnitType::IdrSlice) => {
                    if let (Some(sps), Some(pps)) = (&self.sps, &self.pps) {
                        filtered.push(sps.nalu.clone());
                        filtered.push(pps.clone());
                    }
                    filtered.push(nalu.clone());
                }
                _ => filtered.push(nalu.clone()),
            }
        }

        Ok(filtered)
    }

    /// Flushes and releases the sink. The encoder rejects every call
    /// afterwards with [`VdkError::Closed`].
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(VdkError::Closed);
        }
        self.closed = true;

        if self.stats.written == 0 {
            warn!(
                "Closing encoder without output: {} access units received, none written",
                self.stats.received
            );
        }
        self.muxer.close()?;
        info!(
            "Encoder closed: {} packets, {} bytes",
            self.stats.written, self.stats.bytes_written
        );
        Ok(())
    }
}

impl<C: BitstreamCodec, M: ContainerMuxer> Drop for AccessUnitEncoder<C, M> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.muxer.close() {
                warn!("Failed to flush output on drop: {}", e);
            }
        }
    }
}

fn parameter_set_error(e: VdkError) -> VdkError {
    match e {
        VdkError::ParameterSet(_) => e,
        other => VdkError::ParameterSet(other.to_string()),
    }
}

fn codec_error(e: VdkError) -> VdkError {
    match e {
        VdkError::Codec(_) => e,
        other => VdkError::Codec(other.to_string()),
    }
}

fn mux_error(e: VdkError) -> VdkError {
    match e {
        VdkError::Mux(_) => e,
        other => VdkError::Mux(other.to_string()),
    }
}
