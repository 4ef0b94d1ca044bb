//! Gentee installer decompression
//!
//! The installer runtime compresses with a sliding 32767-byte window and
//! three adaptive Huffman trees that both ends mutate in lockstep. There
//! is no end-of-stream marker anywhere: the consumer always knows how many
//! bytes to expect and stops after producing them, which is also how the
//! archive layer finds where each compressed payload ends.
//!
//! The trees carry several quirks of the original coder (biased initial
//! frequencies, whole-tree halving with an arithmetic shift, a signed
//! rebalance adjustment). These are load-bearing: a clean textbook coder
//! diverges from real packages within a few hundred symbols.

mod bitstream;
mod decoder;
mod state;

pub use bitstream::BitReader;
pub use state::DecompressorState;

use crate::common::{PackageError, Result};

/// Decode exactly `size` bytes from an in-memory stream with a fresh
/// session.
pub fn decompress_bytes(data: &[u8], size: usize) -> Result<Vec<u8>> {
    let mut state = DecompressorState::new();
    let mut out = vec![0u8; size];
    let mut source = std::io::Cursor::new(data);
    let got = state.decompress(&mut source, &mut out);
    if got < size {
        return Err(PackageError::EntryDecompression {
            got: got as u64,
            expected: size as u64,
        });
    }
    Ok(out)
}
