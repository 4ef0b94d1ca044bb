//! Shared test support: a mirror encoder for the installer compression
//! scheme and a builder that assembles complete synthetic packages.
//!
//! The encoder drives the same adaptive Huffman trees the decoder uses and
//! mirrors its window, offset-history and bucket-table bookkeeping, so any
//! sequence of literals and matches it emits decodes back bit-exactly. That
//! includes the model's quirks (biased seeding, signed frequency halving);
//! both sides replay them in lockstep.

#![allow(dead_code)]

use gipack::common::{
    CODE_SYMBOLS, LENGTH_SYMBOLS, MATCH_VLC_LENGTHS, OFFSET_SYMBOLS, UNPACK_FILE_CODE, WINDOW_SIZE,
};
use gipack::AdaptiveTree;
use std::collections::HashMap;

/// Inverse of the decoder's bit cursor: single bits pack MSB-first into
/// bytes, multi-bit values emit from bit 0 upward.
#[derive(Debug, Default)]
pub struct BitWriter {
    out: Vec<u8>,
    byte: u8,
    used: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bit(&mut self, bit: u32) {
        self.byte = (self.byte << 1) | (bit as u8 & 1);
        self.used += 1;
        if self.used == 8 {
            self.out.push(self.byte);
            self.byte = 0;
            self.used = 0;
        }
    }

    pub fn push_bits(&mut self, value: u32, count: u32) {
        for position in 0..count {
            self.push_bit((value >> position) & 1);
        }
    }

    /// Pads the partial byte with zero bits. The decoder discards the same
    /// padding when it realigns between commandlet chunks.
    pub fn align(&mut self) {
        if self.used > 0 {
            self.byte <<= 8 - self.used;
            self.out.push(self.byte);
            self.byte = 0;
            self.used = 0;
        }
    }

    /// Aligns and hands over everything emitted so far.
    pub fn drain(&mut self) -> Vec<u8> {
        self.align();
        std::mem::take(&mut self.out)
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        self.align();
        self.out
    }
}

/// One encoding session, state-matched to `DecompressorState`.
///
/// `produced` holds every byte the paired decoder would output for the
/// stream emitted so far; after `encode_bytes` it equals the input, and
/// after a hand-rolled `match_ref` it extends by whatever the window run
/// contained. Tests compare decoder output against it directly.
pub struct Encoder {
    code_tree: AdaptiveTree,
    offset_tree: AdaptiveTree,
    length_tree: AdaptiveTree,
    window: Vec<u8>,
    window_offset: usize,
    offset_history: [u32; 4],
    vlc_offsets: [u32; 30],
    bits: BitWriter,
    produced: Vec<u8>,
    positions: HashMap<[u8; 3], Vec<usize>>,
}

impl Encoder {
    pub fn new() -> Self {
        let mut vlc_offsets = [0u32; 30];
        let mut base = 0u32;
        for (slot, &len) in vlc_offsets.iter_mut().zip(MATCH_VLC_LENGTHS.iter()) {
            *slot = base;
            base += 1 << len;
        }
        Encoder {
            code_tree: AdaptiveTree::new(CODE_SYMBOLS),
            offset_tree: AdaptiveTree::new(OFFSET_SYMBOLS),
            length_tree: AdaptiveTree::new(LENGTH_SYMBOLS),
            window: vec![0; WINDOW_SIZE],
            window_offset: 0,
            offset_history: [0, 1, 2, 3],
            vlc_offsets,
            bits: BitWriter::new(),
            produced: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Emits one literal byte.
    pub fn literal(&mut self, byte: u8) {
        emit_symbol(&mut self.code_tree, &mut self.bits, u16::from(byte));
        self.push_output(byte);
    }

    /// Emits a back-reference of `length` bytes starting `length + offset`
    /// bytes behind the write cursor. The referenced run replays through
    /// the mirrored window, so `produced` extends by exactly what the
    /// decoder will write (zeros, if the window there is still untouched).
    pub fn match_ref(&mut self, length: usize, offset: u32) {
        assert!((3..=256).contains(&length), "length {length} out of range");
        assert!(offset <= WINDOW_SIZE as u32, "offset {offset} out of range");

        if length <= 19 {
            emit_symbol(&mut self.code_tree, &mut self.bits, (length + 253) as u16);
        } else {
            emit_symbol(&mut self.code_tree, &mut self.bits, 273);
            emit_symbol(&mut self.length_tree, &mut self.bits, (length - 20) as u16);
        }

        if let Some(slot) = self.offset_history.iter().position(|&held| held == offset) {
            emit_symbol(&mut self.offset_tree, &mut self.bits, (30 + slot) as u16);
        } else {
            let bucket = self.vlc_bucket(offset);
            emit_symbol(&mut self.offset_tree, &mut self.bits, bucket as u16);
            let extra = offset - self.vlc_offsets[bucket];
            self.bits.push_bits(extra, u32::from(MATCH_VLC_LENGTHS[bucket]));
        }

        let back_distance = length + offset as usize;
        let mut read_pos = self.window_offset;
        while read_pos < back_distance {
            read_pos += WINDOW_SIZE;
        }
        read_pos -= back_distance;
        for _ in 0..length {
            let byte = self.window[read_pos];
            read_pos += 1;
            if read_pos == WINDOW_SIZE {
                read_pos = 0;
            }
            self.push_output(byte);
        }

        self.record_match_offset(offset);
    }

    /// Encodes `data` exactly, choosing matches greedily against this
    /// session's history. Matches never cover their own output (the format
    /// cannot express that) and never reach past the window.
    pub fn encode_bytes(&mut self, data: &[u8]) {
        let mut index = 0;
        while index < data.len() {
            match self.find_match(data, index) {
                Some((length, distance)) => {
                    self.match_ref(length, (distance - length) as u32);
                    index += length;
                }
                None => {
                    self.literal(data[index]);
                    index += 1;
                }
            }
        }
    }

    /// Every byte the paired decoder would have produced so far.
    pub fn produced(&self) -> &[u8] {
        &self.produced
    }

    /// Pads to a byte boundary and hands over the bytes emitted since the
    /// last drain. Chunk framing for commandlet streams.
    pub fn drain_chunk(&mut self) -> Vec<u8> {
        self.bits.drain()
    }

    /// Finishes the session and returns the complete encoded stream.
    pub fn finish(mut self) -> Vec<u8> {
        self.bits.drain()
    }

    fn vlc_bucket(&self, offset: u32) -> usize {
        self.vlc_offsets
            .iter()
            .rposition(|&base| base <= offset)
            .unwrap_or(0)
    }

    fn push_output(&mut self, byte: u8) {
        self.window[self.window_offset] = byte;
        self.window_offset += 1;
        if self.window_offset == WINDOW_SIZE {
            self.window_offset = 0;
        }
        self.produced.push(byte);
        let here = self.produced.len();
        if here >= 3 {
            let key = [
                self.produced[here - 3],
                self.produced[here - 2],
                self.produced[here - 1],
            ];
            self.positions.entry(key).or_default().push(here - 3);
        }
    }

    fn find_match(&self, data: &[u8], index: usize) -> Option<(usize, usize)> {
        let remaining = data.len() - index;
        if remaining < 3 {
            return None;
        }
        let key = [data[index], data[index + 1], data[index + 2]];
        let here = self.produced.len();
        let candidates = self.positions.get(&key)?;
        let mut best: Option<(usize, usize)> = None;
        for &cand in candidates.iter().rev().take(32) {
            let distance = here - cand;
            if distance > WINDOW_SIZE {
                break;
            }
            // A match may not read past `here` (it would cover its own
            // output) or extend beyond what the format can express.
            let max_len = remaining.min(256).min(distance);
            let mut length = 0;
            while length < max_len && self.produced[cand + length] == data[index + length] {
                length += 1;
            }
            if length >= 3 && best.map_or(true, |(best_len, _)| length > best_len) {
                best = Some((length, distance));
            }
        }
        best
    }

    // Same policy as the decoder: only the first three slots count as
    // hits, a miss evicts slot 3.
    fn record_match_offset(&mut self, offset: u32) {
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

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

fn emit_symbol(tree: &mut AdaptiveTree, bits: &mut BitWriter, symbol: u16) {
    let mut path = Vec::new();
    let mut node = symbol;
    while let Some(parent) = tree.parent(node) {
        let children = tree.children(parent).unwrap();
        path.push(u32::from(children[1] == node));
        node = parent;
    }
    for &bit in path.iter().rev() {
        bits.push_bit(bit);
    }
    tree.increment_freq(symbol);
}

enum Item {
    File {
        name: Vec<u8>,
        data: Vec<u8>,
        compressed: bool,
    },
    Unknown {
        code: u16,
        body: Vec<u8>,
    },
}

/// Assembles complete synthetic packages in the on-disk layout: leading
/// size word, opaque header, the compressed commandlet stream (flags and
/// reserved chunks first), and file payloads interleaved after their
/// commandlets.
pub struct PackageBuilder {
    header: [u8; 16],
    all_stored: bool,
    items: Vec<Item>,
}

impl PackageBuilder {
    pub fn new() -> Self {
        PackageBuilder {
            header: [0; 16],
            all_stored: false,
            items: Vec::new(),
        }
    }

    /// Sets the global flag that forces every payload to be stored raw.
    pub fn all_stored(&mut self) -> &mut Self {
        self.all_stored = true;
        self
    }

    /// Adds a file entry whose payload is stored uncompressed. Names keep
    /// their raw Windows-1252 bytes, so `&str` and `&[u8]` both work.
    pub fn stored(&mut self, name: impl AsRef<[u8]>, data: &[u8]) -> &mut Self {
        self.items.push(Item::File {
            name: name.as_ref().to_vec(),
            data: data.to_vec(),
            compressed: false,
        });
        self
    }

    /// Adds a file entry whose payload goes through the compressor.
    pub fn compressed(&mut self, name: impl AsRef<[u8]>, data: &[u8]) -> &mut Self {
        self.items.push(Item::File {
            name: name.as_ref().to_vec(),
            data: data.to_vec(),
            compressed: true,
        });
        self
    }

    /// Adds a commandlet with an unrecognized code. Loaders skip these.
    pub fn unknown_commandlet(&mut self, code: u16, body: &[u8]) -> &mut Self {
        self.items.push(Item::Unknown {
            code,
            body: body.to_vec(),
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut session = Encoder::new();
        let mut body = Vec::new();

        body.extend_from_slice(&self.header);

        let flags = [u8::from(self.all_stored)];
        append_chunk(&mut body, &mut session, &flags);
        append_chunk(&mut body, &mut session, b"reserved");

        for item in &self.items {
            match item {
                Item::Unknown { code, body: extra } => {
                    let mut chunk = code.to_le_bytes().to_vec();
                    chunk.extend_from_slice(extra);
                    append_chunk(&mut body, &mut session, &chunk);
                }
                Item::File {
                    name,
                    data,
                    compressed,
                } => {
                    append_chunk(&mut body, &mut session, &file_commandlet(name, data, *compressed));
                    if *compressed && !self.all_stored {
                        body.extend_from_slice(&(data.len() as u32).to_le_bytes());
                        let mut payload = Encoder::new();
                        payload.encode_bytes(data);
                        body.extend_from_slice(&payload.finish());
                    } else {
                        body.extend_from_slice(data);
                    }
                }
            }
        }

        let total = (body.len() + 4) as u32;
        let mut package = total.to_le_bytes().to_vec();
        package.extend_from_slice(&body);
        package
    }
}

impl Default for PackageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Frames one commandlet chunk: plain size word, then the chunk content
/// pushed through the shared session and padded to a byte boundary.
fn append_chunk(body: &mut Vec<u8>, session: &mut Encoder, content: &[u8]) {
    body.extend_from_slice(&(content.len() as u32).to_le_bytes());
    session.encode_bytes(content);
    body.extend_from_slice(&session.drain_chunk());
}

fn file_commandlet(name: &[u8], data: &[u8], compressed: bool) -> Vec<u8> {
    let mut chunk = vec![0u8; 34];
    chunk[0..2].copy_from_slice(&UNPACK_FILE_CODE.to_le_bytes());
    chunk[7..11].copy_from_slice(&(data.len() as u32).to_le_bytes());
    chunk[28] = u8::from(compressed);
    chunk.extend_from_slice(name);
    chunk.push(0);
    chunk
}

/// Deterministic byte soup for throughput and stress tests.
pub fn pseudo_random_bytes(len: usize, mut seed: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(len);
    for _ in 0..len {
        seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
        data.push((seed >> 16) as u8);
    }
    data
}
