//! MSB-first bit packing for transmission frames.
//!
//! Fields are written most significant bit first and concatenated without
//! gaps. The final partial byte is padded with zero bits on the low end.
//! `BitReader` is the inverse, used to inspect frames (tests, frame dumps).

/// Writes bits MSB-first into a byte buffer.
///
/// # Invariants
/// - `bit_count` is always < 8
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    /// Current partial byte, MSB-aligned
    bit_buffer: u8,
    /// Number of bits in bit_buffer (0-7)
    bit_count: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            ..Self::default()
        }
    }

    /// Writes the lowest `count` bits of `value`, MSB first. `count` is at
    /// most 32; higher bits of `value` are ignored.
    pub fn write_bits(&mut self, value: u32, count: u8) {
        debug_assert!(count <= 32, "field wider than 32 bits");

        let mut remaining = count as usize;
        let val = value as u64;

        while remaining > 0 {
            // How many bits fit in the current byte
            let bits_to_write = remaining.min(8 - self.bit_count as usize);
            let shift = remaining - bits_to_write;
            let bits = ((val >> shift) & ((1 << bits_to_write) - 1)) as u8;

            self.bit_buffer |= bits << (8 - self.bit_count as usize - bits_to_write);
            self.bit_count += bits_to_write as u8;

            if self.bit_count == 8 {
                self.bytes.push(self.bit_buffer);
                self.bit_buffer = 0;
                self.bit_count = 0;
            }

            remaining -= bits_to_write;
        }
    }

    /// Total number of bits written, including the partial byte.
    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8 + self.bit_count as usize
    }

    /// Consumes the writer, flushing the zero-padded partial byte.
    pub fn finish(mut self) -> Vec<u8> {
        if self.bit_count > 0 {
            self.bytes.push(self.bit_buffer);
        }
        self.bytes
    }
}

/// Reads bits MSB-first from a frame.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// 0 = MSB of the first byte
    bit_position: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bit_position: 0,
        }
    }

    /// Reads `count` (at most 32) bits. Returns `None` past the end of the data.
    pub fn read_bits(&mut self, count: u8) -> Option<u32> {
        if count > 32 || self.bit_position + count as usize > self.data.len() * 8 {
            return None;
        }

        let mut result = 0u64;
        for _ in 0..count {
            let byte = self.data[self.bit_position / 8];
            let bit = (byte >> (7 - self.bit_position % 8)) & 1;
            result = (result << 1) | bit as u64;
            self.bit_position += 1;
        }
        Some(result as u32)
    }

    pub fn bits_remaining(&self) -> usize {
        self.data.len() * 8 - self.bit_position
    }
}
