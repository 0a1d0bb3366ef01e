use crate::error::{Result, VdkError};

/// A bit-level reader for H.264 RBSP data.
///
/// Implements the reads needed by parameter-set and slice-header parsing:
/// - fixed-width fields `u(n)`
/// - unsigned exponential Golomb codes `ue(v)`
/// - signed exponential Golomb codes `se(v)`
///
/// Example:
/// ```
/// use h264ts::utils::BitReader;
///
/// let data = [0b10110011];
/// let mut reader = BitReader::new(&data);
///
/// assert_eq!(reader.read_bit().unwrap(), true);   // 1
/// assert_eq!(reader.read_bits(3).unwrap(), 0b011); // 011
/// ```
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_offset: usize,
    bit_offset: u8,
}

impl<'a> BitReader<'a> {
    /// Creates a new BitReader from a byte slice
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            byte_offset: 0,
            bit_offset: 0,
        }
    }

    /// Reads a single bit. Returns true for 1, false for 0.
    pub fn read_bit(&mut self) -> Result<bool> {
        let byte = *self
            .data
            .get(self.byte_offset)
            .ok_or_else(|| VdkError::InvalidData("reached end of bitstream".into()))?;

        let bit = (byte >> (7 - self.bit_offset)) & 1;
        self.bit_offset += 1;

        if self.bit_offset == 8 {
            self.bit_offset = 0;
            self.byte_offset += 1;
        }

        Ok(bit == 1)
    }

    /// Reads a boolean flag, `u(1)`.
    pub fn read_flag(&mut self) -> Result<bool> {
        self.read_bit()
    }

    /// Reads n bits big-endian. Fails if n > 32 or the data runs out.
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        if n > 32 {
            return Err(VdkError::InvalidData(format!(
                "cannot read {} bits into a u32",
                n
            )));
        }

        let mut value = 0u64;
        for _ in 0..n {
            value = (value << 1) | u64::from(self.read_bit()?);
        }

        Ok(value as u32)
    }

    /// Reads an unsigned exponential Golomb code, `ue(v)`.
    ///
    /// M leading zeros, a 1, then M info bits: value = 2^M + INFO - 1.
    /// "00110" has M=2, INFO=10, so the value is 4 + 2 - 1 = 5.
    pub fn read_golomb(&mut self) -> Result<u32> {
        let mut leading_zeros = 0u32;
        while !self.read_bit()? {
            leading_zeros += 1;
            if leading_zeros > 31 {
                return Err(VdkError::InvalidData("invalid Golomb code".into()));
            }
        }

        if leading_zeros == 0 {
            return Ok(0);
        }

        let info = self.read_bits(leading_zeros)?;
        let value = (1u64 << leading_zeros) + u64::from(info) - 1;
        u32::try_from(value).map_err(|_| VdkError::InvalidData("Golomb code overflow".into()))
    }

    /// Reads a signed exponential Golomb code, `se(v)`.
    ///
    /// k=0 maps to 0, odd k to +(k+1)/2 and even k to -(k/2).
    pub fn read_signed_golomb(&mut self) -> Result<i32> {
        let k = self.read_golomb()?;
        let magnitude = ((u64::from(k) + 1) >> 1) as i32;
        Ok(if k & 1 == 1 { magnitude } else { -magnitude })
    }

    /// Skips n bits in the stream.
    pub fn skip_bits(&mut self, n: u32) -> Result<()> {
        if (n as usize) > self.available_bits() {
            return Err(VdkError::InvalidData("reached end of bitstream".into()));
        }
        let bits = self.bit_offset as usize + n as usize;
        self.byte_offset += bits / 8;
        self.bit_offset = (bits % 8) as u8;
        Ok(())
    }

    /// Aligns reader to next byte boundary by skipping remaining bits in current byte.
    pub fn align_byte(&mut self) {
        if self.bit_offset != 0 {
            self.bit_offset = 0;
            self.byte_offset += 1;
        }
    }

    /// Returns number of bits available to read.
    pub fn available_bits(&self) -> usize {
        (self.data.len().saturating_sub(self.byte_offset)) * 8 - self.bit_offset as usize
    }
}

/// Bit-level writer, the inverse of [`BitReader`].
///
/// Used to synthesize parameter sets and slice headers.
#[derive(Debug, Default)]
pub struct BitWriter {
    data: Vec<u8>,
    bit_offset: u8,
}

impl BitWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one bit.
    pub fn write_bit(&mut self, bit: bool) {
        if self.bit_offset == 0 {
            self.data.push(0);
        }
        if bit {
            if let Some(last) = self.data.last_mut() {
                *last |= 1 << (7 - self.bit_offset);
            }
        }
        self.bit_offset = (self.bit_offset + 1) % 8;
    }

    /// Appends the low `n` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u32, n: u32) {
        for i in (0..n.min(32)).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
    }

    /// Appends an unsigned exponential Golomb code.
    pub fn write_golomb(&mut self, value: u32) {
        let code = u64::from(value) + 1;
        let len = 64 - code.leading_zeros();
        for _ in 0..len - 1 {
            self.write_bit(false);
        }
        for i in (0..len).rev() {
            self.write_bit((code >> i) & 1 == 1);
        }
    }

    /// Appends a signed exponential Golomb code.
    pub fn write_signed_golomb(&mut self, value: i32) {
        let k = if value > 0 {
            (value as u32) * 2 - 1
        } else {
            value.unsigned_abs() * 2
        };
        self.write_golomb(k);
    }

    /// Appends `rbsp_trailing_bits`: a stop bit and zero padding.
    pub fn write_trailing_bits(&mut self) {
        self.write_bit(true);
        while self.bit_offset != 0 {
            self.write_bit(false);
        }
    }

    /// Returns the written bytes; a partial last byte is zero padded.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
