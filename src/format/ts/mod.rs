//! # MPEG Transport Stream (TS)
//!
//! Writing side of ISO/IEC 13818-1 for a single program with one video
//! elementary stream, plus a small parser for reading the result back.
//!
//! - [`TSMuxer`]: PAT/PMT, PES packetization, PCR and stuffing
//! - [`TSPacketParser`]: TS header, adaptation field, PSI and PES header
//! - [`PESHeader`]/[`PESPacket`]: PES framing with PTS/DTS
//!
//! ## Example
//!
//! ```rust
//! use h264ts::av::{ContainerMuxer, EncodedPacket};
//! use h264ts::format::ts::{TSMuxer, STREAM_ID_H264, STREAM_TYPE_H264, TS_PACKET_SIZE};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut muxer = TSMuxer::new(Vec::new());
//! muxer.configure(256, STREAM_TYPE_H264, 256)?;
//!
//! let packet = EncodedPacket::new(256, STREAM_ID_H264, vec![0, 0, 0, 1, 0x09, 0xF0], 36_000)
//!     .with_random_access(true);
//! muxer.write_packet(&packet)?;
//!
//! let output = muxer.finish()?;
//! assert_eq!(output.len() % TS_PACKET_SIZE, 0);
//! # Ok(())
//! # }
//! ```
#![allow(missing_docs)]

/// TS muxer implementation for creating MPEG-TS packets
pub mod muxer;

/// Low-level TS packet parsing utilities
pub mod parser;

/// PES packet handling
pub mod pes;

/// Core TS types and constants
pub mod types;

pub use muxer::TSMuxer;
pub use parser::{ParsedPes, Section, TSPacketParser};
pub use pes::{PESHeader, PESPacket};
pub use types::{
    AdaptationField,
    TSHeader,
    PID_PAT,
    PID_PMT,
    STREAM_ID_H264,
    STREAM_TYPE_H264,
    TS_HEADER_SIZE,
    TS_PACKET_SIZE,
};
