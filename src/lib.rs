//! gipack - reader for Gentee installer packages
//!
//! Game installers built with the Gentee toolchain carry their payload as
//! a single package, usually appended to the setup executable: a small
//! header followed by a stream of compressed "commandlet" records, some
//! of which carry the files to install. This crate parses that stream and
//! presents the files as a read-only archive with independently seekable
//! entry streams, which is what a game engine needs to pull assets
//! straight out of an installer without running it.
//!
//! The compression is the installer runtime's own scheme: a 32767-byte
//! sliding window driven by three adaptive Huffman trees that encoder and
//! decoder mutate in lockstep. The trees reproduce the original coder's
//! quirks (biased initial frequencies, whole-tree halving with an
//! arithmetic shift, a signed rebalance adjustment) because real packages
//! only decode against exactly that behavior.
//!
//! # Example
//!
//! ```no_run
//! use gipack::PackageArchive;
//! use std::io::{BufReader, Read};
//!
//! let setup = BufReader::new(std::fs::File::open("setup.bin")?);
//! let archive = PackageArchive::load(setup, "")?;
//!
//! for entry in archive.entries() {
//!     println!("{} ({} bytes)", entry.path(), entry.size());
//! }
//!
//! let mut stream = archive.open("data/strings.txt")?;
//! let mut text = String::new();
//! stream.read_to_string(&mut text)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod archive;
pub mod common;
pub mod decompress;
pub mod error;
pub mod huffman;

// Re-export commonly used types
pub use archive::{EntryStream, PackageArchive, PackageEntry};
pub use common::{PackageError, Result, WINDOW_SIZE};
pub use decompress::{BitReader, DecompressorState};
pub use huffman::AdaptiveTree;

use std::io::{Read, Seek};

/// Open the package at `reader`'s current position.
///
/// Equivalent to [`PackageArchive::load`]; seek the reader to the package
/// start first when it does not sit at offset zero.
pub fn open_package<R: Read + Seek>(reader: R, prefix: &str) -> Result<PackageArchive<R>> {
    PackageArchive::load(reader, prefix)
}

/// Decode `size` bytes of a standalone compressed stream with a fresh
/// decoder session.
///
/// The format never marks its own end, so the caller supplies the
/// expected output length.
pub fn decompress_bytes(data: &[u8], size: usize) -> Result<Vec<u8>> {
    decompress::decompress_bytes(data, size)
}
