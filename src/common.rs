//! Common types and constants for the Gentee installer package format
//!
//! This module defines the error type, result alias, and the fixed protocol
//! constants shared by the decompressor core and the archive layer.

use thiserror::Error;

/// Error type for package operations
#[derive(Debug, Error)]
pub enum PackageError {
    /// Declared package size cannot fit in the underlying stream
    #[error("package declares {declared} bytes but only {available} are available")]
    TruncatedPackage {
        /// Size from the package header
        declared: u64,
        /// Bytes actually present from the package start
        available: u64,
    },

    /// Commandlet chunk size above the sanity bound
    #[error("commandlet of {0} bytes exceeds the 4 MiB sanity limit")]
    OversizedCommandlet(u32),

    /// A commandlet chunk did not decompress to its declared size
    #[error("commandlet decompression produced {got} of {expected} bytes")]
    CommandletDecompression {
        /// Bytes actually produced
        got: usize,
        /// Declared chunk size
        expected: usize,
    },

    /// An unpack-file commandlet with an invalid shape
    #[error("malformed unpack-file commandlet: {0}")]
    MalformedCommandlet(&'static str),

    /// A compressed entry's payload did not decompress to its declared size
    #[error("entry payload produced {got} of {expected} bytes")]
    EntryDecompression {
        /// Bytes actually produced during bounds discovery
        got: u64,
        /// Declared decompressed size
        expected: u64,
    },

    /// An entry's payload runs past the end of the package
    #[error("entry payload overruns the package bounds")]
    PayloadOutOfBounds,

    /// Lookup of a path not present in the archive
    #[error("no entry named {0:?} in the archive")]
    EntryNotFound(String),

    /// I/O error from the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for package operations
pub type Result<T> = std::result::Result<T, PackageError>;

// Format constants. These are fixed protocol values observed in Gentee
// installer packages, not tunables.

/// Circular decode window size in bytes. 0x7fff, not 0x8000.
pub const WINDOW_SIZE: usize = 0x7fff;

/// Leaf count of the code tree: 256 literals plus 18 match codes.
pub const CODE_SYMBOLS: usize = 274;

/// Leaf count of the match-offset tree: 30 VLC buckets plus 4 history slots.
pub const OFFSET_SYMBOLS: usize = 34;

/// Leaf count of the match-length extension tree.
pub const LENGTH_SYMBOLS: usize = 237;

/// Frequency ceiling that triggers the halving of every node.
pub const MAX_FREQ: i32 = 512;

/// Extra-bit counts for the 30 coded-offset VLC buckets. Bucket base
/// offsets are the cumulative sums of `1 << length`, which tile the coded
/// offset range [0, 32767] exactly.
pub const MATCH_VLC_LENGTHS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Commandlet code for "unpack file", little-endian at chunk offset 0.
pub const UNPACK_FILE_CODE: u16 = 0x87f4;

/// Sanity bound on a single commandlet chunk's declared size.
pub const COMMANDLET_SIZE_LIMIT: u32 = 4 * 1024 * 1024;

/// Raw header bytes following the package size prefix.
pub const PACKAGE_HEADER_LEN: usize = 16;

/// Scratch buffer size for discard decoding (bounds discovery, forward seek).
pub const SCRATCH_LEN: usize = 1024;
