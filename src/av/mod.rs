//! Core media types and the collaborator contracts the encoder drives.
//!
//! The access-unit encoder never touches bitstream syntax or transport
//! packets directly: it talks to a [`BitstreamCodec`] and a
//! [`ContainerMuxer`], so either side can be swapped (tests substitute
//! recording fakes).

use bytes::Bytes;

use crate::codec::h264::Sps;
use crate::Result;

mod packet;
mod time;

pub use packet::*;
pub use time::*;

/// Fixed value of the `'10'` marker bits opening a PES optional header.
pub const PES_MARKER_BITS: u8 = 0b10;

/// H.264 bitstream operations required by the encoder.
pub trait BitstreamCodec {
    /// Decodes a raw SPS NAL unit (header byte included).
    fn decode_sps(&self, nalu: &[u8]) -> Result<Sps>;

    /// Packs NAL units into one Annex-B byte stream.
    fn pack_annexb(&self, nalus: &[Bytes]) -> Result<Bytes>;

    /// Derives the decoding timestamp of an access unit.
    ///
    /// Stateful: it tracks the frame-reordering depth across calls, so it
    /// must be fed every written access unit in decoding order.
    fn extract_dts(
        &mut self,
        nalus: &[Bytes],
        idr_present: bool,
        pts: MediaTime,
        sps: &Sps,
    ) -> Result<MediaTime>;
}

/// Transport-stream packetization of a single program.
pub trait ContainerMuxer {
    /// Declares the elementary stream and the PID carrying the PCR. Called
    /// once before any packet is written.
    fn configure(&mut self, pid: u16, stream_type: u8, pcr_pid: u16) -> Result<()>;

    /// Packetizes and writes one PES packet.
    fn write_packet(&mut self, packet: &EncodedPacket) -> Result<()>;

    /// Flushes buffered output and releases the sink.
    fn close(&mut self) -> Result<()>;
}
