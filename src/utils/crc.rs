/// CRC32 used by MPEG-2 TS PSI sections (ITU-T H.222.0 / ISO/IEC 13818-1).
/// Polynomial 0x04C11DB7, initial value 0xFFFFFFFF, no reflection, no final xor.
const CRC32_MPEG2: u32 = 0x04C11DB7;

const TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ CRC32_MPEG2
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// MPEG-2 CRC32 calculator for PAT/PMT sections.
///
/// The lookup table is built at compile time, so the type is zero sized and
/// free to construct.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32Mpeg2;

impl Crc32Mpeg2 {
    /// Creates a calculator.
    pub fn new() -> Self {
        Self
    }

    /// Calculates the checksum of a PSI section, from `table_id` up to (not
    /// including) the CRC field.
    ///
    /// ```
    /// use h264ts::utils::Crc32Mpeg2;
    ///
    /// assert_eq!(Crc32Mpeg2::new().calculate(&[0x01, 0x01]), 0xD66F_B816);
    /// ```
    pub fn calculate(&self, data: &[u8]) -> u32 {
        data.iter().fold(0xFFFF_FFFF, |crc, &byte| {
            let index = ((crc >> 24) ^ u32::from(byte)) & 0xFF;
            (crc << 8) ^ TABLE[index as usize]
        })
    }
}
