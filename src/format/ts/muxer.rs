use bytes::{BufMut, BytesMut};
use log::{debug, trace};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::pes::PESHeader;
use super::types::*;
use crate::av::{ContainerMuxer, EncodedPacket};
use crate::config::EncoderConfig;
use crate::error::{Result, VdkError};

#[derive(Debug, Clone, Copy)]
struct StreamInfo {
    pid: u16,
    stream_type: u8,
    pcr_pid: u16,
}

/// Single-program MPEG-TS muxer writing 188-byte packets to any
/// [`Write`] sink.
///
/// PAT and PMT are emitted before the first PES packet and, unless
/// disabled, again before every random-access packet so a reader can join
/// at any keyframe.
pub struct TSMuxer<W: Write> {
    writer: Option<BufWriter<W>>,
    pmt_pid: u16,
    program_number: u16,
    psi_on_random_access: bool,
    stream: Option<StreamInfo>,
    continuity_counters: HashMap<u16, u8>,
    psi_written: bool,
    packets_written: u64,
    bytes_written: u64,
}

impl TSMuxer<File> {
    /// Creates the output file and a muxer writing to it.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> TSMuxer<W> {
    /// Creates a muxer with program 1 on PMT PID 0x1000.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(BufWriter::new(writer)),
            pmt_pid: PID_PMT,
            program_number: 1,
            psi_on_random_access: true,
            stream: None,
            continuity_counters: HashMap::new(),
            psi_written: false,
            packets_written: 0,
            bytes_written: 0,
        }
    }

    /// Creates a muxer using the PSI settings of `config`.
    pub fn from_config(writer: W, config: &EncoderConfig) -> Self {
        Self::new(writer)
            .with_pmt_pid(config.pmt_pid)
            .with_program_number(config.program_number)
            .with_psi_on_random_access(config.psi_on_random_access)
    }

    /// Sets the PID carrying the PMT.
    pub fn with_pmt_pid(mut self, pid: u16) -> Self {
        self.pmt_pid = pid;
        self
    }

    /// Sets the program number announced in the PAT.
    pub fn with_program_number(mut self, program_number: u16) -> Self {
        self.program_number = program_number;
        self
    }

    /// Whether PAT/PMT are repeated before random-access packets.
    pub fn with_psi_on_random_access(mut self, enabled: bool) -> Self {
        self.psi_on_random_access = enabled;
        self
    }

    /// Number of 188-byte packets written so far.
    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    /// Number of bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Whether [`close`](ContainerMuxer::close) has released the sink.
    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Flushes and returns the underlying sink.
    pub fn finish(mut self) -> Result<W> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| VdkError::Mux("muxer is closed".into()))?;
        writer.into_inner().map_err(|e| e.into_error().into())
    }

    fn next_continuity_counter(&mut self, pid: u16) -> u8 {
        let counter = self.continuity_counters.entry(pid).or_insert(0);
        let current = *counter;
        *counter = (current + 1) & 0x0f;
        current
    }

    fn write_ts_packet(&mut self, packet: &[u8]) -> Result<()> {
        debug_assert_eq!(packet.len(), TS_PACKET_SIZE);
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| VdkError::Mux("muxer is closed".into()))?;
        writer.write_all(packet)?;
        self.packets_written += 1;
        self.bytes_written += packet.len() as u64;
        Ok(())
    }

    /// Writes one PSI section as a single TS packet padded with 0xFF.
    fn write_section_packet(&mut self, pid: u16, table_id: u8, ext: u16, body: &[u8]) -> Result<()> {
        let mut buf = BytesMut::with_capacity(TS_PACKET_SIZE);
        TSHeader {
            payload_unit_start: true,
            pid,
            continuity_counter: self.next_continuity_counter(pid),
            ..Default::default()
        }
        .write_to(&mut buf);

        buf.put_u8(0); // pointer field
        write_section(&mut buf, table_id, ext, body);
        if buf.len() > TS_PACKET_SIZE {
            return Err(VdkError::Mux("PSI section does not fit one packet".into()));
        }
        buf.put_bytes(0xff, TS_PACKET_SIZE - buf.len());

        self.write_ts_packet(&buf)
    }

    fn write_psi(&mut self, stream: StreamInfo) -> Result<()> {
        let pat = PAT {
            entries: vec![PATEntry {
                program_number: self.program_number,
                program_map_pid: self.pmt_pid,
            }],
        };
        let mut body = BytesMut::with_capacity(pat.len());
        pat.write_to(&mut body);
        self.write_section_packet(PID_PAT, TABLE_ID_PAT, TRANSPORT_STREAM_ID, &body)?;

        let pmt = PMT {
            pcr_pid: stream.pcr_pid,
            program_descriptors: Vec::new(),
            elementary_stream_infos: vec![ElementaryStreamInfo {
                stream_type: stream.stream_type,
                elementary_pid: stream.pid,
                descriptors: Vec::new(),
            }],
        };
        let mut body = BytesMut::new();
        pmt.write_to(&mut body);
        self.write_section_packet(self.pmt_pid, TABLE_ID_PMT, self.program_number, &body)?;

        self.psi_written = true;
        debug!("Wrote PAT/PMT (PMT PID {:#x})", self.pmt_pid);
        Ok(())
    }

    /// Splits a PES packet over TS packets. The first one carries the
    /// random access indicator and the PCR; the last is padded through
    /// adaptation field stuffing.
    fn write_pes(&mut self, stream: StreamInfo, packet: &EncodedPacket) -> Result<()> {
        let mut header = PESHeader::new(packet.stream_id)
            .with_pts(packet.pts)
            .with_data_alignment(true);
        header.marker_bits = packet.marker_bits;
        if let Some(dts) = packet.dts {
            header = header.with_dts(dts);
        }

        let mut pes = BytesMut::with_capacity(header.len() + packet.data.len());
        header.write_to(&mut pes);
        pes.extend_from_slice(&packet.data);

        let mut offset = 0;
        let mut first = true;
        let mut buf = BytesMut::with_capacity(TS_PACKET_SIZE);
        while offset < pes.len() {
            let af = AdaptationField {
                random_access: first && packet.random_access,
                pcr: (first && stream.pcr_pid == stream.pid)
                    .then(|| ticks_to_pcr(packet.decode_ticks())),
                ..Default::default()
            };

            let remaining = pes.len() - offset;
            let mut af_len = af.encoded_len();
            let chunk = remaining.min(TS_PAYLOAD_SIZE - af_len);
            if chunk < TS_PAYLOAD_SIZE - af_len {
                af_len = TS_PAYLOAD_SIZE - chunk;
            }

            buf.clear();
            TSHeader {
                payload_unit_start: first,
                pid: stream.pid,
                adaptation_field_exists: af_len > 0,
                continuity_counter: self.next_continuity_counter(stream.pid),
                ..Default::default()
            }
            .write_to(&mut buf);
            af.write_to(&mut buf, af_len);
            buf.extend_from_slice(&pes[offset..offset + chunk]);

            self.write_ts_packet(&buf)?;
            offset += chunk;
            first = false;
        }

        trace!(
            "PES on PID {:#x}: {} bytes, pts {}, dts {:?}",
            stream.pid,
            pes.len(),
            packet.pts,
            packet.dts
        );
        Ok(())
    }
}

impl<W: Write> ContainerMuxer for TSMuxer<W> {
    fn configure(&mut self, pid: u16, stream_type: u8, pcr_pid: u16) -> Result<()> {
        if self.is_closed() {
            return Err(VdkError::Mux("muxer is closed".into()));
        }
        if self.stream.is_some() {
            return Err(VdkError::Mux("only one elementary stream is supported".into()));
        }
        if !(PID_FIRST_ELEMENTARY..PID_NULL).contains(&pid) || pid == self.pmt_pid {
            return Err(VdkError::Mux(format!("PID {:#x} cannot carry an elementary stream", pid)));
        }
        if pcr_pid != pid {
            return Err(VdkError::Mux(format!(
                "PCR PID {:#x} must be the elementary stream PID {:#x}",
                pcr_pid, pid
            )));
        }

        self.stream = Some(StreamInfo {
            pid,
            stream_type,
            pcr_pid,
        });
        debug!("Configured stream type {:#04x} on PID {:#x}", stream_type, pid);
        Ok(())
    }

    fn write_packet(&mut self, packet: &EncodedPacket) -> Result<()> {
        if self.is_closed() {
            return Err(VdkError::Mux("muxer is closed".into()));
        }
        let stream = self
            .stream
            .ok_or_else(|| VdkError::Mux("no elementary stream configured".into()))?;
        if packet.pid != stream.pid {
            return Err(VdkError::Mux(format!(
                "packet for PID {:#x} but the stream is on {:#x}",
                packet.pid, stream.pid
            )));
        }
        if packet.data.is_empty() {
            return Err(VdkError::Mux("empty PES payload".into()));
        }

        if !self.psi_written || (self.psi_on_random_access && packet.random_access) {
            self.write_psi(stream)?;
        }
        self.write_pes(stream, packet)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            debug!(
                "Closed TS output after {} packets ({} bytes)",
                self.packets_written, self.bytes_written
            );
        }
        Ok(())
    }
}
