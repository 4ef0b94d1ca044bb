//! Decompressor state
//!
//! One `DecompressorState` is one compression session: the three adaptive
//! Huffman trees, the circular window, the most-recently-used offset
//! history, the VLC bucket bases and the bit cursor all persist from call
//! to call. The package parser keeps a single session alive across every
//! commandlet chunk; each compressed file payload gets a session of its
//! own. The decode loop itself lives in `decoder.rs`.

use super::bitstream::BitReader;
use crate::common::{
    CODE_SYMBOLS, LENGTH_SYMBOLS, MATCH_VLC_LENGTHS, OFFSET_SYMBOLS, WINDOW_SIZE,
};
use crate::huffman::AdaptiveTree;

/// Decoder state for one compression session.
#[derive(Debug, Clone)]
pub struct DecompressorState {
    /// Literal and match-code tree.
    pub(crate) code_tree: AdaptiveTree,
    /// Match-offset tree: 30 VLC buckets plus 4 history slots.
    pub(crate) offset_tree: AdaptiveTree,
    /// Match-length extension tree for lengths of 20 and up.
    pub(crate) length_tree: AdaptiveTree,
    /// Circular window over the last `WINDOW_SIZE` produced bytes.
    pub(crate) window: Vec<u8>,
    /// Next write position in the window.
    pub(crate) window_offset: usize,
    /// Most-recently-used match offsets, newest first.
    pub(crate) offset_history: [u32; 4],
    /// Base offset of each VLC bucket.
    pub(crate) vlc_offsets: [u32; 30],
    /// Window read position of the match copy in progress.
    pub(crate) match_read_pos: usize,
    /// Bytes still to copy for the match in progress.
    pub(crate) match_remaining: usize,
    /// Sub-byte cursor over the compressed source.
    pub(crate) bits: BitReader,
}

impl DecompressorState {
    /// Create a session in its initial state.
    pub fn new() -> Self {
        DecompressorState {
            code_tree: AdaptiveTree::new(CODE_SYMBOLS),
            offset_tree: AdaptiveTree::new(OFFSET_SYMBOLS),
            length_tree: AdaptiveTree::new(LENGTH_SYMBOLS),
            window: vec![0; WINDOW_SIZE],
            window_offset: 0,
            offset_history: INITIAL_HISTORY,
            vlc_offsets: derive_vlc_offsets(),
            match_read_pos: 0,
            match_remaining: 0,
            bits: BitReader::new(),
        }
    }

    /// Return the session to its initial state: trees rebuilt, window
    /// zeroed, history reseeded, bit cursor cleared of cache and failure.
    pub fn reset(&mut self) {
        self.code_tree.reset();
        self.offset_tree.reset();
        self.length_tree.reset();
        self.window.fill(0);
        self.window_offset = 0;
        self.offset_history = INITIAL_HISTORY;
        self.vlc_offsets = derive_vlc_offsets();
        self.match_read_pos = 0;
        self.match_remaining = 0;
        self.bits.reset();
    }

    /// Drop any partially consumed source byte so decoding resumes on a
    /// byte boundary. Trees, window and history are untouched; commandlet
    /// chunks are framed this way.
    pub fn reset_bitstream(&mut self) {
        self.bits.align();
    }

    /// Whether the source ran out mid-stream since the last full reset.
    pub fn failed(&self) -> bool {
        self.bits.failed()
    }

    /// Note `offset` as the most recent match offset.
    ///
    /// Only the first three history slots are searched; a hit is moved to
    /// the front, shifting the newer slots down. A miss does the same with
    /// the last slot as the eviction point, so slot 3 can be referenced by
    /// the coder but never survives a miss.
    pub(crate) fn record_match_offset(&mut self, offset: u32) {
        let mut expunge = 3;
        for slot in 0..3 {
            if self.offset_history[slot] == offset {
                expunge = slot;
                break;
            }
        }
        if expunge == 0 {
            return;
        }
        for slot in (1..=expunge).rev() {
            self.offset_history[slot] = self.offset_history[slot - 1];
        }
        self.offset_history[0] = offset;
    }
}

impl Default for DecompressorState {
    fn default() -> Self {
        Self::new()
    }
}

const INITIAL_HISTORY: [u32; 4] = [0, 1, 2, 3];

/// Bucket bases are exclusive prefix sums of `1 << length`, so bucket `i`
/// covers `[base[i], base[i] + (1 << length[i]))`.
fn derive_vlc_offsets() -> [u32; 30] {
    let mut offsets = [0u32; 30];
    let mut base = 0u32;
    for (offset, &length) in offsets.iter_mut().zip(MATCH_VLC_LENGTHS.iter()) {
        *offset = base;
        base += 1 << length;
    }
    offsets
}
