//! Format dispatch for archive writers

use std::io::{Read, Seek, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use xz2::write::XzEncoder;

use crate::entry::FileEntry;
use crate::error::{ArchiveError, Result};
use crate::format::ArchiveFormat;
use crate::writer::{
    gzip_layer, xz_layer, zstd_layer, GzWriter, TarWriter, Uncompressed, ZipWriter,
};

type ZstdEncoder<W> = zstd::stream::write::Encoder<'static, W>;

/// An archive being written, one variant per format.
///
/// The writer owns its sink until [`ArchiveWriter::finish`] hands it back,
/// so a finished archive cannot be written to again. The sink is only ever
/// written to, never sought.
pub enum ArchiveWriter<W: Write> {
    /// Plain tar
    Tar(TarWriter<Uncompressed<W>>),
    /// Gzip-compressed tar
    TarGz(TarWriter<GzEncoder<W>>),
    /// XZ-compressed tar
    TarXz(TarWriter<XzEncoder<W>>),
    /// Zstd-compressed tar
    TarZst(TarWriter<ZstdEncoder<W>>),
    /// Single gzip member
    Gz(GzWriter<W>),
    /// Zip
    Zip(ZipWriter<W>),
}

impl<W: Write> ArchiveWriter<W> {
    /// Create an empty archive of the given format writing into `sink`
    pub fn new(sink: W, format: ArchiveFormat) -> Result<Self> {
        Ok(match format {
            ArchiveFormat::Tar => Self::Tar(TarWriter::new(Uncompressed::new(sink))),
            ArchiveFormat::TarGz => Self::TarGz(TarWriter::new(gzip_layer(sink))),
            ArchiveFormat::TarXz => Self::TarXz(TarWriter::new(xz_layer(sink))),
            ArchiveFormat::TarZst => Self::TarZst(TarWriter::new(zstd_layer(sink)?)),
            ArchiveFormat::Gz => Self::Gz(GzWriter::new(sink)),
            ArchiveFormat::Zip => Self::Zip(ZipWriter::new(sink)),
        })
    }

    /// Rewrite the archive read from `source` into `sink` and keep it open
    /// for more entries.
    ///
    /// Only tar, tar.gz and zip can be reopened this way.
    pub fn copy<R: Read + Seek>(source: R, sink: W, format: ArchiveFormat) -> Result<Self> {
        match format {
            ArchiveFormat::Tar => Ok(Self::Tar(TarWriter::copy(
                source,
                Uncompressed::new(sink),
            )?)),
            ArchiveFormat::TarGz => Ok(Self::TarGz(TarWriter::copy(
                GzDecoder::new(source),
                gzip_layer(sink),
            )?)),
            ArchiveFormat::Zip => Ok(Self::Zip(ZipWriter::copy(source, sink)?)),
            ArchiveFormat::TarXz | ArchiveFormat::TarZst | ArchiveFormat::Gz => {
                Err(ArchiveError::CopyUnsupported(format))
            }
        }
    }

    /// The format this writer produces
    pub fn format(&self) -> ArchiveFormat {
        match self {
            Self::Tar(_) => ArchiveFormat::Tar,
            Self::TarGz(_) => ArchiveFormat::TarGz,
            Self::TarXz(_) => ArchiveFormat::TarXz,
            Self::TarZst(_) => ArchiveFormat::TarZst,
            Self::Gz(_) => ArchiveFormat::Gz,
            Self::Zip(_) => ArchiveFormat::Zip,
        }
    }

    /// Add one entry to the archive
    pub fn add(&mut self, entry: &FileEntry) -> Result<()> {
        match self {
            Self::Tar(writer) => writer.add(entry),
            Self::TarGz(writer) => writer.add(entry),
            Self::TarXz(writer) => writer.add(entry),
            Self::TarZst(writer) => writer.add(entry),
            Self::Gz(writer) => writer.add(entry),
            Self::Zip(writer) => writer.add(entry),
        }
    }

    /// Finalize every layer of the archive and return the sink
    pub fn finish(self) -> Result<W> {
        match self {
            Self::Tar(writer) => writer.finish(),
            Self::TarGz(writer) => writer.finish(),
            Self::TarXz(writer) => writer.finish(),
            Self::TarZst(writer) => writer.finish(),
            Self::Gz(writer) => writer.finish(),
            Self::Zip(writer) => writer.finish(),
        }
    }
}

/// Create an archive writer from a format identifier such as `"tar.gz"`
pub fn new<W: Write>(sink: W, format: &str) -> Result<ArchiveWriter<W>> {
    let format = format
        .parse()
        .map_err(|_| ArchiveError::InvalidFormat(format.to_string()))?;
    ArchiveWriter::new(sink, format)
}

/// Reopen an existing archive for appending, from a format identifier
pub fn copy<R: Read + Seek, W: Write>(
    source: R,
    sink: W,
    format: &str,
) -> Result<ArchiveWriter<W>> {
    let format = format
        .parse()
        .map_err(|_| ArchiveError::InvalidFormat(format.to_string()))?;
    ArchiveWriter::copy(source, sink, format)
}
