//! Decode loop
//!
//! Symbols below 256 are literals. Symbols 256 through 272 encode match
//! lengths 3 through 19 directly; symbol 273 escapes to the length tree,
//! whose value plus 20 gives lengths up to 256. Every match then decodes
//! an offset symbol: buckets 0 through 29 take extra bits per the VLC
//! table, buckets 30 through 33 reuse an offset from the history. The
//! copy distance is the sum of length and offset, measured back from the
//! current window position, so matches never overlap themselves.

use std::io::Read;

use super::bitstream::BitReader;
use super::state::DecompressorState;
use crate::common::{MATCH_VLC_LENGTHS, WINDOW_SIZE};
use crate::huffman::AdaptiveTree;

impl DecompressorState {
    /// Decode up to `dest.len()` bytes from `source`.
    ///
    /// Returns how many bytes were produced. A short count means the
    /// source ran dry mid-stream; the failure latches and later calls
    /// produce nothing until [`reset`](Self::reset). A request can end in
    /// the middle of a match copy, which then resumes on the next call.
    pub fn decompress<R: Read>(&mut self, source: &mut R, dest: &mut [u8]) -> usize {
        let mut written = 0;
        while written < dest.len() && !self.bits.failed() {
            if self.match_remaining > 0 {
                let byte = self.window[self.match_read_pos];
                self.match_read_pos += 1;
                if self.match_read_pos == WINDOW_SIZE {
                    self.match_read_pos = 0;
                }
                self.match_remaining -= 1;
                self.push_byte(dest, &mut written, byte);
                continue;
            }

            let symbol = decode_symbol(&mut self.code_tree, &mut self.bits, source);
            if symbol < 256 {
                self.push_byte(dest, &mut written, symbol as u8);
                continue;
            }

            let match_length = if symbol > 272 {
                usize::from(decode_symbol(&mut self.length_tree, &mut self.bits, source)) + 20
            } else {
                usize::from(symbol) - 253
            };
            let bucket = usize::from(decode_symbol(&mut self.offset_tree, &mut self.bits, source));
            let match_offset = if bucket < self.vlc_offsets.len() {
                let extra = self
                    .bits
                    .read_bits(source, u32::from(MATCH_VLC_LENGTHS[bucket]));
                self.vlc_offsets[bucket] + extra
            } else {
                self.offset_history[bucket - 30]
            };

            let back_distance = match_length + match_offset as usize;
            self.match_read_pos = match_start(self.window_offset, back_distance);
            self.match_remaining = match_length;
            self.record_match_offset(match_offset);
        }
        written
    }

    fn push_byte(&mut self, dest: &mut [u8], written: &mut usize, byte: u8) {
        dest[*written] = byte;
        *written += 1;
        self.window[self.window_offset] = byte;
        self.window_offset += 1;
        if self.window_offset == WINDOW_SIZE {
            self.window_offset = 0;
        }
    }
}

/// Walk `tree` from the root, one bit per branch, then record the decoded
/// symbol's occurrence. On an exhausted source the walk follows zero bits
/// to some leaf; the caller sees the failure through the bit cursor.
fn decode_symbol<R: Read>(tree: &mut AdaptiveTree, bits: &mut BitReader, source: &mut R) -> u16 {
    let mut node = tree.root();
    while let Some(children) = tree.children(node) {
        node = children[bits.read_bit(source) as usize];
    }
    let symbol = tree.symbol(node);
    tree.increment_freq(symbol);
    symbol
}

/// Window read position `back_distance` bytes behind `write_pos`, wrapped.
fn match_start(write_pos: usize, back_distance: usize) -> usize {
    let mut pos = write_pos;
    while pos < back_distance {
        pos += WINDOW_SIZE;
    }
    pos - back_distance
}
