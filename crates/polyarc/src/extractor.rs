//! Archive extraction front-end

use crate::{
    error::{ArchiveError, Result},
    format::ArchiveFormat,
    options::ExtractOptions,
    progress::{NoProgressReporter, ProgressReader, ProgressReporter},
    unpack::{EntryKind, Unpacker},
};
use std::{
    borrow::Cow,
    io::{self, BufReader, Read, Seek},
    path::{Path, PathBuf},
};

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Builder for configuring archive extraction
pub struct ExtractorBuilder<P: ProgressReporter = NoProgressReporter> {
    options: ExtractOptions,
    progress_reporter: P,
    format: Option<ArchiveFormat>,
}

impl ExtractorBuilder<NoProgressReporter> {
    /// Create a new extractor builder
    pub fn new() -> Self {
        Self {
            options: ExtractOptions::default(),
            progress_reporter: NoProgressReporter,
            format: None,
        }
    }
}

impl<P: ProgressReporter> ExtractorBuilder<P> {
    /// Whether to drop the first path segment of every entry
    pub fn with_strip_top_dir(mut self, strip: bool) -> Self {
        self.options.strip_top_dir = strip;
        self
    }

    /// Whether existing files and symlinks may be replaced
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.options.overwrite = overwrite;
        self
    }

    /// Replace all extraction options at once
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Set a custom progress reporter
    pub fn with_progress_reporter<R: ProgressReporter>(self, reporter: R) -> ExtractorBuilder<R> {
        ExtractorBuilder {
            options: self.options,
            progress_reporter: reporter,
            format: self.format,
        }
    }

    /// Set the archive format explicitly (bypassing auto-detection)
    pub fn with_format(mut self, format: ArchiveFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Build the extractor
    pub fn build(self) -> Extractor<P> {
        Extractor {
            options: self.options,
            progress_reporter: self.progress_reporter,
            format: self.format,
        }
    }
}

impl Default for ExtractorBuilder<NoProgressReporter> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "progress")]
impl ExtractorBuilder<NoProgressReporter> {
    /// Set an indicatif progress bar
    pub fn with_progress_bar(
        self,
        progress_bar: indicatif::ProgressBar,
    ) -> ExtractorBuilder<crate::progress::IndicatifProgressReporter> {
        ExtractorBuilder {
            options: self.options,
            progress_reporter: crate::progress::IndicatifProgressReporter::new(progress_bar),
            format: self.format,
        }
    }
}

/// Archive extractor
pub struct Extractor<P: ProgressReporter = NoProgressReporter> {
    options: ExtractOptions,
    progress_reporter: P,
    format: Option<ArchiveFormat>,
}

impl<P: ProgressReporter> Extractor<P> {
    /// Extract an archive to the specified directory.
    ///
    /// Entries are written in archive order. The first failure stops the
    /// extraction and leaves whatever was already written in place.
    pub fn extract(&self, archive_path: &Path, destination: &Path) -> Result<()> {
        let format = resolve_format(self.format, archive_path)?;

        // Ensure destination directory exists
        fs_err::create_dir_all(destination)?;

        let file = fs_err::File::open(archive_path)?;
        let file_size = file.metadata().map(|m| m.len()).ok();
        self.progress_reporter.on_start(file_size);

        let reader = ProgressReader::new(BufReader::new(file), &self.progress_reporter);
        let unpacker = Unpacker::new(destination, self.options);

        match TarCompression::for_format(format) {
            Some(compression) => self.extract_tar(tar_reader(reader, compression)?, &unpacker)?,
            None if format == ArchiveFormat::Zip => self.extract_zip(reader, &unpacker)?,
            None => self.extract_gz(reader, archive_path, &unpacker)?,
        }

        self.progress_reporter
            .on_finish(&format!("Extracted {format} archive"));
        Ok(())
    }

    /// Extract a tar stream, whatever its compression
    fn extract_tar<R: Read>(&self, reader: R, unpacker: &Unpacker<'_>) -> Result<()> {
        let mut archive = tar::Archive::new(reader);

        for entry in archive.entries()? {
            let mut entry = entry?;
            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let header = entry.header();
            let mode = header.mode().ok();
            let entry_type = header.entry_type();

            let kind = if entry_type.is_dir() {
                EntryKind::Directory
            } else if entry_type.is_file() {
                EntryKind::File
            } else if entry_type.is_symlink() {
                EntryKind::Symlink(
                    entry
                        .link_name()?
                        .map(Cow::into_owned)
                        .unwrap_or_default(),
                )
            } else {
                EntryKind::Other
            };

            if let Some(path) = unpacker.unpack(&name, kind, mode, &mut entry)? {
                self.progress_reporter.on_entry(&path);
            }
        }

        Ok(())
    }

    /// Extract a ZIP archive
    fn extract_zip<R: Read + Seek>(&self, reader: R, unpacker: &Unpacker<'_>) -> Result<()> {
        let mut archive = zip::ZipArchive::new(reader)?;

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let name = file.name().to_string();
            let mode = file.unix_mode();

            let kind = if file.is_dir() {
                EntryKind::Directory
            } else if mode.is_some_and(|mode| mode & S_IFMT == S_IFLNK) {
                let mut target = String::new();
                file.read_to_string(&mut target)?;
                EntryKind::Symlink(PathBuf::from(target))
            } else {
                EntryKind::File
            };

            let mode = mode.map(|mode| mode & 0o7777);
            if let Some(path) = unpacker.unpack(&name, kind, mode, &mut file)? {
                self.progress_reporter.on_entry(&path);
            }
        }

        Ok(())
    }

    /// Extract the single member of a gzip stream.
    ///
    /// With the top directory strip only the file name of the member is kept.
    fn extract_gz<R: Read>(
        &self,
        reader: R,
        archive_path: &Path,
        unpacker: &Unpacker<'_>,
    ) -> Result<()> {
        let mut decoder = flate2::read::GzDecoder::new(reader);
        let name = gz_member_name(&decoder, archive_path)?;
        let name = if self.options.strip_top_dir {
            Path::new(&name)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or(name)
        } else {
            name
        };

        if let Some(path) = unpacker.unpack_at(&name, EntryKind::File, Some(0o644), &mut decoder)? {
            self.progress_reporter.on_entry(&path);
        }
        Ok(())
    }
}

/// Extract `src` into `dest` using a format identifier such as `"tar.gz"`
pub fn unarchive(
    src: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    format: &str,
    options: ExtractOptions,
) -> Result<()> {
    let format = format
        .parse()
        .map_err(|_| ArchiveError::UnsupportedFormat(format.to_string()))?;
    ExtractorBuilder::new()
        .with_format(format)
        .with_options(options)
        .build()
        .extract(src.as_ref(), dest.as_ref())
}

/// The explicit format, or the one detected from the archive's file name
pub(crate) fn resolve_format(
    format: Option<ArchiveFormat>,
    archive_path: &Path,
) -> Result<ArchiveFormat> {
    match format {
        Some(format) => Ok(format),
        None => ArchiveFormat::detect_from_path(archive_path)
            .ok_or_else(|| ArchiveError::UnsupportedFormat(archive_path.display().to_string())),
    }
}

/// Tar compression types
#[derive(Debug, Clone, Copy)]
pub(crate) enum TarCompression {
    Plain,
    Gzip,
    Xz,
    Zstd,
}

impl TarCompression {
    pub(crate) fn for_format(format: ArchiveFormat) -> Option<Self> {
        match format {
            ArchiveFormat::Tar => Some(Self::Plain),
            ArchiveFormat::TarGz => Some(Self::Gzip),
            ArchiveFormat::TarXz => Some(Self::Xz),
            ArchiveFormat::TarZst => Some(Self::Zstd),
            ArchiveFormat::Gz | ArchiveFormat::Zip => None,
        }
    }
}

/// Wrap `reader` in the decoder for `compression`
pub(crate) fn tar_reader<'r, R: Read + 'r>(
    reader: R,
    compression: TarCompression,
) -> Result<Box<dyn Read + 'r>> {
    Ok(match compression {
        TarCompression::Plain => Box::new(reader),
        TarCompression::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
        TarCompression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
        TarCompression::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
    })
}

/// The name stored in a gzip header, falling back to the archive's own name
pub(crate) fn gz_member_name<R: Read>(
    decoder: &flate2::read::GzDecoder<R>,
    archive_path: &Path,
) -> Result<String> {
    let header = decoder
        .header()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "invalid gzip header"))?;

    if let Some(name) = header.filename().filter(|name| !name.is_empty()) {
        return Ok(String::from_utf8_lossy(name).into_owned());
    }

    let base = archive_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(match base.strip_suffix(".gz") {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => format!("{base}.out"),
    })
}
