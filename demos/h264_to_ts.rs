//! h264_to_ts - wraps a raw Annex-B H.264 file into an MPEG transport stream.
//!
//! ```text
//! RUST_LOG=debug cargo run --example h264_to_ts -- input.h264 output.ts --fps 25
//! ```

use bytes::Bytes;
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use h264ts::codec::h264::{parse_sprop_parameter_sets, split_annexb, AccessUnitAssembler};
use h264ts::format::ts::{TSPacketParser, TS_PACKET_SIZE};
use h264ts::{AccessUnit, AccessUnitEncoder, EncoderConfig, EncoderStats};

#[derive(Parser, Debug)]
#[command(name = "h264_to_ts", version, about = "Wrap an Annex-B H.264 stream into MPEG-TS")]
struct Cli {
    /// Input .h264 file (Annex-B byte stream)
    input: PathBuf,

    /// Output .ts file
    output: PathBuf,

    /// Frame rate used to assign presentation timestamps
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Initial parameter sets as carried in SDP, e.g. "Z0IAHpWoLQSZ,aM48gA=="
    #[arg(long)]
    sprop: Option<String>,

    /// Read encoder settings from a `key = value` file instead of the environment
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a summary of the written transport stream
    #[arg(long)]
    verify: bool,
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    if !(cli.fps > 0.0) {
        return Err(format!("invalid frame rate {}", cli.fps).into());
    }

    let config = match &cli.config {
        Some(path) => EncoderConfig::from_file(path)?,
        None => EncoderConfig::from_env()?,
    };
    let (sps, pps) = match &cli.sprop {
        Some(sprop) => {
            let sets = parse_sprop_parameter_sets(sprop)?;
            (sets.sps, sets.pps)
        }
        None => (None, None),
    };

    let data = Bytes::from(tokio::fs::read(&cli.input).await?);
    let access_units = assemble(&data, cli.fps)?;
    info!(
        "Read {} bytes, {} access units from {}",
        data.len(),
        access_units.len(),
        cli.input.display()
    );

    let output = cli.output.clone();
    let stats = tokio::task::spawn_blocking(move || -> Result<EncoderStats, BoxError> {
        let file = std::fs::File::create(&output)?;
        let mut encoder = AccessUnitEncoder::with_config(file, config, sps, pps)?;
        for au in &access_units {
            encoder.encode(au)?;
        }
        encoder.close()?;
        Ok(encoder.stats())
    })
    .await??;

    println!(
        "{} access units in, {} written ({} before parameter sets, {} before the first IDR), {} payload bytes",
        stats.received,
        stats.written,
        stats.dropped_not_ready,
        stats.dropped_before_idr,
        stats.bytes_written
    );

    if cli.verify {
        let written = tokio::fs::read(&cli.output).await?;
        verify(&written)?;
    }
    Ok(())
}

/// Splits the byte stream into access units with timestamps from `fps`.
fn assemble(data: &Bytes, fps: f64) -> Result<Vec<AccessUnit>, BoxError> {
    let frame_duration = Duration::from_secs_f64(1.0 / fps);
    let mut assembler = AccessUnitAssembler::new();
    let mut units = Vec::new();

    for nalu in split_annexb(data) {
        if let Some(nalus) = assembler.push(nalu)? {
            units.push(nalus);
        }
    }
    units.extend(assembler.flush());

    Ok(units
        .into_iter()
        .enumerate()
        .map(|(i, nalus)| AccessUnit::new(nalus, frame_duration * i as u32))
        .collect())
}

fn verify(data: &[u8]) -> Result<(), BoxError> {
    let parser = TSPacketParser::new();
    let mut packets = 0usize;
    let mut pes_units = 0usize;
    let mut random_access = 0usize;
    let mut with_dts = 0usize;
    let mut first_pts = None;
    let mut last_pts = None;

    for packet in data.chunks(TS_PACKET_SIZE) {
        let header = parser.parse_header(packet)?;
        packets += 1;
        if !header.payload_unit_start || header.pid < 0x10 {
            continue;
        }
        if let Some(af) = parser.parse_adaptation_field(packet)? {
            if af.random_access {
                random_access += 1;
            }
        }
        let offset = parser.payload_offset(packet)?;
        // PSI sections on elementary-range PIDs (the PMT) start with a pointer field
        if packet.get(offset..offset + 3) != Some(&[0, 0, 1][..]) {
            continue;
        }
        let pes = parser.parse_pes_header(&packet[offset..])?;
        pes_units += 1;
        if pes.header.dts.is_some() {
            with_dts += 1;
        }
        first_pts = first_pts.or(pes.header.pts);
        last_pts = pes.header.pts.or(last_pts);
    }

    println!("{} TS packets, {} PES packets", packets, pes_units);
    println!("{} random access points, {} with explicit DTS", random_access, with_dts);
    if let (Some(first), Some(last)) = (first_pts, last_pts) {
        println!("PTS {} .. {} (90 kHz ticks)", first, last);
    }
    Ok(())
}
