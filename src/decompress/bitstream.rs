//! Bit-level access to the compressed stream
//!
//! The coder consumes the source one byte at a time and hands out single
//! bits, most significant first. Multi-bit fields are assembled in the
//! opposite order: the first bit read becomes bit 0 of the value. Both
//! orders are fixed by the format.

use std::io::Read;

/// Sub-byte cursor over a byte source.
///
/// Once a refill from the source fails, the cursor latches `failed` and
/// every further read yields a zero bit. The decode loop checks the flag
/// between symbols rather than per bit, so a symbol already in flight when
/// the source runs dry still finishes on zero bits.
#[derive(Debug, Clone)]
pub struct BitReader {
    byte: u8,
    bits_left: u8,
    failed: bool,
}

impl BitReader {
    /// Create a cursor with no cached bits.
    pub fn new() -> Self {
        BitReader {
            byte: 0,
            bits_left: 0,
            failed: false,
        }
    }

    /// Read one bit, refilling the byte cache from `source` as needed.
    ///
    /// Returns 0 and latches the failure flag when the source has no more
    /// bytes.
    pub fn read_bit<R: Read>(&mut self, source: &mut R) -> u32 {
        if self.bits_left == 0 {
            let mut next = [0u8; 1];
            if source.read_exact(&mut next).is_err() {
                self.failed = true;
                return 0;
            }
            self.byte = next[0];
            self.bits_left = 8;
        }
        let bit = u32::from(self.byte >> 7);
        self.byte <<= 1;
        self.bits_left -= 1;
        bit
    }

    /// Read `count` bits and pack them with the first bit in position 0.
    pub fn read_bits<R: Read>(&mut self, source: &mut R, count: u32) -> u32 {
        let mut value = 0;
        for position in 0..count {
            value |= self.read_bit(source) << position;
        }
        value
    }

    /// Drop any partially consumed byte so the next read starts on a byte
    /// boundary. The failure flag is left alone.
    pub fn align(&mut self) {
        self.bits_left = 0;
    }

    /// Forget all state, including a latched failure.
    pub fn reset(&mut self) {
        self.byte = 0;
        self.bits_left = 0;
        self.failed = false;
    }

    /// Whether a refill has failed since the last reset.
    pub fn failed(&self) -> bool {
        self.failed
    }
}

impl Default for BitReader {
    fn default() -> Self {
        Self::new()
    }
}
