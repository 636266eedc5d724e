//! Archive writers, one per container, and the compression layers they sit on

use std::collections::HashSet;
use std::fs::Metadata;
use std::io::{self, Write};
use std::time::UNIX_EPOCH;

use flate2::write::GzEncoder;
use xz2::write::XzEncoder;

use crate::entry::FileEntry;
use crate::error::{ArchiveError, Result};

pub mod gzip;
pub mod tar;
pub mod zip;

pub use self::gzip::GzWriter;
pub use self::tar::TarWriter;
pub use self::zip::ZipWriter;

/// xz preset 7 works with a 16 MiB dictionary.
const XZ_PRESET: u32 = 7;

/// A stream layer below an archive container that must be finalized on close.
///
/// Closing writes the layer's trailer and hands back the stream it wraps, so
/// a layered writer is torn down from the inside out.
pub trait CompressionLayer: Write {
    /// The stream this layer writes into
    type Inner;

    /// Write the trailer and return the wrapped stream
    fn close(self) -> io::Result<Self::Inner>;
}

/// A layer that passes bytes through untouched (plain tar)
#[derive(Debug)]
pub struct Uncompressed<W>(W);

impl<W: Write> Uncompressed<W> {
    /// Wrap a sink without compression
    pub fn new(inner: W) -> Self {
        Self(inner)
    }
}

impl<W: Write> Write for Uncompressed<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write> CompressionLayer for Uncompressed<W> {
    type Inner = W;

    fn close(mut self) -> io::Result<W> {
        self.0.flush()?;
        Ok(self.0)
    }
}

impl<W: Write> CompressionLayer for GzEncoder<W> {
    type Inner = W;

    fn close(self) -> io::Result<W> {
        self.finish()
    }
}

impl<W: Write> CompressionLayer for XzEncoder<W> {
    type Inner = W;

    fn close(self) -> io::Result<W> {
        self.finish()
    }
}

impl<W: Write> CompressionLayer for zstd::stream::write::Encoder<'static, W> {
    type Inner = W;

    fn close(self) -> io::Result<W> {
        self.finish()
    }
}

/// Gzip layer at best compression
pub fn gzip_layer<W: Write>(inner: W) -> GzEncoder<W> {
    GzEncoder::new(inner, flate2::Compression::best())
}

/// xz layer
pub fn xz_layer<W: Write>(inner: W) -> XzEncoder<W> {
    XzEncoder::new(inner, XZ_PRESET)
}

/// zstd layer at the library's default level
pub fn zstd_layer<W: Write>(inner: W) -> io::Result<zstd::stream::write::Encoder<'static, W>> {
    zstd::stream::write::Encoder::new(inner, 0)
}

/// Destination names already written by one writer.
///
/// A name is reserved before its entry is written, so an `add` that fails
/// halfway still owns the name and a retry with the same destination is
/// rejected as a duplicate.
#[derive(Debug, Default)]
pub(crate) struct WrittenNames(HashSet<String>);

impl WrittenNames {
    pub(crate) fn reserve(&mut self, destination: &str) -> Result<()> {
        if self.0.insert(destination.to_string()) {
            Ok(())
        } else {
            Err(ArchiveError::duplicate_entry(destination))
        }
    }

    /// Record a name read from an existing archive
    pub(crate) fn insert(&mut self, name: impl Into<String>) {
        self.0.insert(name.into());
    }
}

/// Seconds since the epoch for the entry, preferring the explicit override
pub(crate) fn entry_mtime(entry: &FileEntry, metadata: &Metadata) -> u64 {
    match entry.info.mtime {
        Some(mtime) => u64::try_from(mtime.timestamp()).unwrap_or(0),
        None => metadata
            .modified()
            .ok()
            .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |elapsed| elapsed.as_secs()),
    }
}

/// Permission bits of the source, or the usual default where there are none
pub(crate) fn source_mode(metadata: &Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o7777
    }
    #[cfg(not(unix))]
    {
        if metadata.is_dir() {
            0o755
        } else {
            0o644
        }
    }
}

/// Stat the source of an entry without following symlinks
pub(crate) fn stat_source(entry: &FileEntry) -> Result<Metadata> {
    fs_err::symlink_metadata(&entry.source)
        .map_err(|e| ArchiveError::source_unavailable(&entry.source, e))
}
