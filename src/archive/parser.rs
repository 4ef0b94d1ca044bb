//! Package parsing
//!
//! A package is a declared-size prefix, 16 opaque header bytes, then a
//! run of compressed "commandlet" chunks. Every chunk decodes through one
//! persistent decompressor session whose trees and window carry across
//! chunks; only the bit cursor realigns between them. The first chunk
//! carries the package flags, the second is reserved, and the rest
//! dispatch on a little-endian code word. Unpack-file commandlets are
//! followed in the main stream by their payload, whose extent for
//! compressed files is only discoverable by decoding it once with a
//! throwaway session.

use std::io::{Read, Seek, SeekFrom};

use encoding_rs::WINDOWS_1252;
use indexmap::IndexMap;
use log::{debug, warn};

use super::entry::PackageEntry;
use super::stream::SubStream;
use crate::common::{
    COMMANDLET_SIZE_LIMIT, PACKAGE_HEADER_LEN, SCRATCH_LEN, UNPACK_FILE_CODE,
};
use crate::decompress::DecompressorState;
use crate::{PackageError, Result};

/// Chunk offset of the stored-size field in an unpack-file commandlet.
const ENTRY_STORED_SIZE: usize = 7;
/// Chunk offset of the per-entry compressed flag.
const ENTRY_COMPRESSED_FLAG: usize = 28;
/// Chunk offset where the NUL-terminated filename begins.
const ENTRY_FILENAME: usize = 34;
/// Minimum unpack-file commandlet length: fixed fields plus a filename
/// terminator.
const ENTRY_MIN_LEN: usize = 36;

/// Parse the package at `reader`'s current position into an entry index
/// keyed by lowercased path.
pub(crate) fn parse_package<R: Read + Seek>(
    reader: &mut R,
    prefix: &str,
) -> Result<IndexMap<String, PackageEntry>> {
    let package_start = reader.stream_position()?;
    let stream_end = reader.seek(SeekFrom::End(0))?;
    let available = stream_end.saturating_sub(package_start);
    reader.seek(SeekFrom::Start(package_start))?;

    let declared = u64::from(read_u32(reader)?);
    if declared > available {
        return Err(PackageError::TruncatedPackage {
            declared,
            available,
        });
    }
    debug!("package at offset {package_start}: {declared} of {available} available bytes");

    let mut sub = SubStream::new(&mut *reader, package_start, declared)?;
    sub.seek(SeekFrom::Start(4))?;
    let mut header = [0u8; PACKAGE_HEADER_LEN];
    sub.read_exact(&mut header)?;

    let mut session = DecompressorState::new();
    let mut entries = IndexMap::new();
    let mut all_stored = false;
    let mut chunk = Vec::new();
    let mut chunk_index = 0usize;

    while sub.position() < sub.len() {
        let declared_len = read_u32(&mut sub)?;
        if declared_len > COMMANDLET_SIZE_LIMIT {
            return Err(PackageError::OversizedCommandlet(declared_len));
        }
        let len = declared_len as usize;
        chunk.resize(len, 0);
        session.reset_bitstream();
        let got = session.decompress(&mut sub, &mut chunk[..]);
        if got < len {
            return Err(PackageError::CommandletDecompression { got, expected: len });
        }

        match chunk_index {
            0 => {
                let Some(&flags) = chunk.first() else {
                    return Err(PackageError::MalformedCommandlet("empty flags commandlet"));
                };
                all_stored = flags != 0;
                debug!("flags commandlet: all files stored = {all_stored}");
            }
            // The reserved commandlet still has to be decoded, not seeked
            // over, to keep the session's stream position honest.
            1 => {}
            _ => match chunk.get(..2) {
                Some(code) if u16::from_le_bytes([code[0], code[1]]) == UNPACK_FILE_CODE => {
                    unpack_file(&mut sub, &chunk, all_stored, prefix, package_start, &mut entries)?;
                }
                Some(code) => {
                    debug!(
                        "ignoring commandlet code {:#06x} ({} bytes)",
                        u16::from_le_bytes([code[0], code[1]]),
                        len
                    );
                }
                None => debug!("ignoring short commandlet ({len} bytes)"),
            },
        }
        chunk_index += 1;
    }

    debug!("indexed {} entries", entries.len());
    Ok(entries)
}

/// Handle one unpack-file commandlet: pull out the metadata, then walk
/// `sub` past the payload that follows it, recording where that payload
/// lives.
fn unpack_file<S: Read + Seek>(
    sub: &mut SubStream<S>,
    chunk: &[u8],
    all_stored: bool,
    prefix: &str,
    package_start: u64,
    entries: &mut IndexMap<String, PackageEntry>,
) -> Result<()> {
    if chunk.len() < ENTRY_MIN_LEN || chunk[chunk.len() - 1] != 0 {
        return Err(PackageError::MalformedCommandlet(
            "unpack-file commandlet too short or unterminated",
        ));
    }
    let name_bytes = &chunk[ENTRY_FILENAME..];
    let name_len = name_bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(name_bytes.len());
    let (raw_name, _, _) = WINDOWS_1252.decode(&name_bytes[..name_len]);

    let compressed = !all_stored && chunk[ENTRY_COMPRESSED_FLAG] != 0;
    let size;
    let data_start;
    let data_span;
    if compressed {
        // The decompressed size rides in the main stream, between the
        // commandlet and the entropy-coded payload.
        size = u64::from(read_u32(sub)?);
        data_start = sub.position();
        discover_bounds(sub, size)?;
        data_span = sub.position() - data_start;
    } else {
        size = u64::from(u32::from_le_bytes([
            chunk[ENTRY_STORED_SIZE],
            chunk[ENTRY_STORED_SIZE + 1],
            chunk[ENTRY_STORED_SIZE + 2],
            chunk[ENTRY_STORED_SIZE + 3],
        ]));
        data_start = sub.position();
        if data_start + size > sub.len() {
            return Err(PackageError::PayloadOutOfBounds);
        }
        sub.seek(SeekFrom::Current(size as i64))?;
        data_span = size;
    }

    if !raw_name.starts_with(prefix) {
        debug!("skipping {raw_name:?}: outside prefix {prefix:?}");
        return Ok(());
    }
    let path = raw_name[prefix.len()..].replace('\\', "/");
    debug!(
        "entry {:?}: {} bytes at {}+{} ({})",
        path,
        size,
        package_start + data_start,
        data_span,
        if compressed { "compressed" } else { "stored" }
    );

    let entry = PackageEntry {
        path,
        data_start: package_start + data_start,
        data_span,
        size,
        compressed,
    };
    let key = entry.path.to_ascii_lowercase();
    if let Some(previous) = entries.insert(key, entry) {
        warn!(
            "duplicate entry path {:?}: the later occurrence wins",
            previous.path
        );
    }
    Ok(())
}

/// Decode `size` bytes with a throwaway session, discarding the output.
/// On return `sub` sits on the first byte after the payload, which is the
/// only way the format exposes a compressed payload's extent.
fn discover_bounds<S: Read + Seek>(sub: &mut SubStream<S>, size: u64) -> Result<()> {
    let mut probe = DecompressorState::new();
    let mut scratch = [0u8; SCRATCH_LEN];
    let mut produced = 0u64;
    while produced < size {
        let want = (size - produced).min(SCRATCH_LEN as u64) as usize;
        let got = probe.decompress(sub, &mut scratch[..want]);
        produced += got as u64;
        if got < want {
            return Err(PackageError::EntryDecompression {
                got: produced,
                expected: size,
            });
        }
    }
    Ok(())
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}
