#![doc(html_root_url = "https://docs.rs/h264ts/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # h264ts - H.264 to MPEG transport stream
//!
//! `h264ts` turns a sequence of H.264 access units (NAL units plus a
//! presentation timestamp) into a playable MPEG-TS file or stream.
//!
//! ## Features
//!
//! - SPS/PPS tracking, with both re-inserted before every IDR frame
//! - NAL filtering and access unit delimiters for strict decoders
//! - DTS derivation from picture order counts (B-frame reordering)
//! - PES/TS packetization with PAT/PMT, PCR and continuity counters
//! - Annex-B splitting, access unit assembly and `sprop-parameter-sets`
//!   parsing for feeding the encoder
//!
//! ## Quick Start
//!
//! ```rust
//! use bytes::Bytes;
//! use h264ts::{AccessUnit, AccessUnitEncoder};
//! use std::time::Duration;
//!
//! # fn main() -> h264ts::Result<()> {
//! let mut output = Vec::new();
//! let mut encoder = AccessUnitEncoder::with_writer(&mut output, None, None)?;
//!
//! // No parameter sets yet: dropped without error
//! let p_slice = Bytes::from_static(&[0x41, 0x9a, 0x02]);
//! encoder.encode(&AccessUnit::new([p_slice], Duration::ZERO))?;
//! encoder.close()?;
//! drop(encoder);
//!
//! assert!(output.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - `encoder`: [`AccessUnitEncoder`], the stateful core
//! - `av`: access units, encoded packets, timestamps and the
//!   [`BitstreamCodec`](av::BitstreamCodec) /
//!   [`ContainerMuxer`](av::ContainerMuxer) contracts
//! - `codec`: H.264 bitstream support
//! - `format`: MPEG-TS muxer and parser
//! - `config`: encoder settings with env and file overrides
//! - `error`: error type and `Result` alias
//! - `utils`: bit reader/writer and CRC32

/// Access units, packets, timestamps and collaborator traits
pub mod av;

/// Codec implementations
pub mod codec;

/// Configuration module
pub mod config;

/// The access-unit encoder
pub mod encoder;

/// Error types and utilities
pub mod error;

/// Container format implementations
pub mod format;

/// Common utilities and helper functions
pub mod utils;

pub use av::{AccessUnit, EncodedPacket, MediaTime};
pub use config::EncoderConfig;
pub use encoder::{AccessUnitEncoder, EncoderState, EncoderStats};
pub use error::{Result, VdkError};
