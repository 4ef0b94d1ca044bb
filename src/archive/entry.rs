//! Entry metadata

/// One file indexed from a package.
///
/// Produced by [`PackageArchive::load`](crate::PackageArchive::load) and
/// borrowed from the archive's index. Offsets are absolute positions in
/// the underlying stream, so an entry stays meaningful for packages that
/// start partway into a file.
#[derive(Debug, Clone)]
pub struct PackageEntry {
    pub(crate) path: String,
    pub(crate) data_start: u64,
    pub(crate) data_span: u64,
    pub(crate) size: u64,
    pub(crate) compressed: bool,
}

impl PackageEntry {
    /// Entry path in original case, load prefix stripped, separators
    /// normalized to `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Final path component.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Decompressed size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether the payload is entropy coded rather than stored raw.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Absolute stream offset where the payload begins.
    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    /// Bytes the payload occupies in the package. Equals [`size`](Self::size)
    /// for stored entries.
    pub fn data_span(&self) -> u64 {
        self.data_span
    }
}
