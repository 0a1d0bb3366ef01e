//! # Utility Functions and Types
//!
//! Bit-level reading and writing for H.264 RBSP data, and the MPEG-2 CRC32
//! used by transport-stream PSI sections.
//!
//! ```rust
//! use h264ts::utils::{BitReader, BitWriter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut writer = BitWriter::new();
//! writer.write_golomb(5);
//! let data = writer.into_bytes();
//!
//! let mut reader = BitReader::new(&data);
//! assert_eq!(reader.read_golomb()?, 5);
//! # Ok(())
//! # }
//! ```

/// Bit manipulation and bitstream reading utilities
pub mod bits;

/// CRC calculation implementations
pub mod crc;

pub use bits::{BitReader, BitWriter};
pub use crc::Crc32Mpeg2;
