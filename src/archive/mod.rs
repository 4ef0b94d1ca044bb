//! Package archive facade
//!
//! [`PackageArchive`] indexes a package once at load time and then serves
//! lookups, listings and entry streams against that index. The base
//! stream lives behind `Arc<Mutex<_>>` so opened [`EntryStream`]s remain
//! independent of the archive and of each other; the whole surface is
//! read-only.

mod entry;
mod parser;
mod pattern;
mod stream;

pub use entry::PackageEntry;
pub use stream::EntryStream;

use std::io::{Read, Seek};
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;

use crate::{PackageError, Result};

/// An opened installer package.
///
/// Lookups are case-insensitive and accept either path separator, while
/// listings preserve each entry's original case and package order.
#[derive(Debug)]
pub struct PackageArchive<R> {
    base: Arc<Mutex<R>>,
    entries: IndexMap<String, PackageEntry>,
}

impl<R: Read + Seek> PackageArchive<R> {
    /// Parse the package at `reader`'s current position and take ownership
    /// of the reader.
    ///
    /// `prefix` selects which files get indexed: only those whose stored
    /// name starts with it, and the prefix is then stripped from their
    /// paths. Pass `""` to take everything. Loading is all or nothing; any
    /// structural problem fails the whole load.
    pub fn load(mut reader: R, prefix: &str) -> Result<Self> {
        let entries = parser::parse_package(&mut reader, prefix)?;
        Ok(PackageArchive {
            base: Arc::new(Mutex::new(reader)),
            entries,
        })
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `path` names an entry.
    pub fn has_entry(&self, path: &str) -> bool {
        self.entries.contains_key(&lookup_key(path))
    }

    /// Metadata for the entry at `path`.
    pub fn entry(&self, path: &str) -> Option<&PackageEntry> {
        self.entries.get(&lookup_key(path))
    }

    /// All entries in package order.
    pub fn entries(&self) -> impl Iterator<Item = &PackageEntry> + '_ {
        self.entries.values()
    }

    /// Entries whose path matches the glob `pattern`, in package order.
    ///
    /// `*` and `?` stand for any run of characters and any single
    /// character. With `match_path_components` unset they refuse to cross
    /// `/`; set, a pattern like `*.ogg` reaches entries at any depth.
    /// Matching ignores case.
    pub fn matching_entries(
        &self,
        pattern: &str,
        match_path_components: bool,
    ) -> Vec<&PackageEntry> {
        self.entries
            .values()
            .filter(|entry| pattern::matches(pattern, entry.path(), match_path_components))
            .collect()
    }

    /// Open the entry at `path` for reading.
    pub fn open(&self, path: &str) -> Result<EntryStream<R>> {
        let entry = self
            .entry(path)
            .ok_or_else(|| PackageError::EntryNotFound(path.to_string()))?;
        let stream = EntryStream::open(
            Arc::clone(&self.base),
            entry.data_start(),
            entry.data_span(),
            entry.size(),
            entry.is_compressed(),
        )?;
        Ok(stream)
    }

    /// Read the whole entry at `path` into memory.
    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        let mut stream = self.open(path)?;
        let expected = stream.size();
        let mut data = Vec::with_capacity(expected as usize);
        stream.read_to_end(&mut data)?;
        if stream.err() || (data.len() as u64) < expected {
            return Err(PackageError::EntryDecompression {
                got: data.len() as u64,
                expected,
            });
        }
        Ok(data)
    }
}

fn lookup_key(path: &str) -> String {
    path.replace('\\', "/").to_ascii_lowercase()
}
