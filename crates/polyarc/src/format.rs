//! Archive format identification

use std::ffi::OsStr;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Supported archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// Plain tar archive
    Tar,
    /// Gzip-compressed tar archive (.tar.gz, .tgz)
    TarGz,
    /// XZ-compressed tar archive (.tar.xz, .txz)
    TarXz,
    /// Zstd-compressed tar archive (.tar.zst, .tzst)
    TarZst,
    /// A single gzip-compressed file (.gz)
    Gz,
    /// ZIP archive
    Zip,
}

/// Error returned when a format identifier is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown archive format: {0}")]
pub struct ParseFormatError(pub String);

impl ArchiveFormat {
    /// Every supported format, in identifier order
    pub const ALL: [ArchiveFormat; 6] = [
        Self::Tar,
        Self::TarGz,
        Self::TarXz,
        Self::TarZst,
        Self::Gz,
        Self::Zip,
    ];

    /// Detect archive format from filename
    pub fn detect_from_filename(filename: &str) -> Option<Self> {
        let filename = filename.to_lowercase();

        // Tar-based formats first, `.tar.gz` must win over `.gz`
        if filename.ends_with(".tar.gz") || filename.ends_with(".tgz") {
            return Some(Self::TarGz);
        }
        if filename.ends_with(".tar.xz") || filename.ends_with(".txz") {
            return Some(Self::TarXz);
        }
        if filename.ends_with(".tar.zst") || filename.ends_with(".tzst") {
            return Some(Self::TarZst);
        }
        if filename.ends_with(".tar") {
            return Some(Self::Tar);
        }
        if filename.ends_with(".gz") {
            return Some(Self::Gz);
        }
        if filename.ends_with(".zip") {
            return Some(Self::Zip);
        }

        None
    }

    /// Detect archive format from file path
    pub fn detect_from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .file_name()
            .and_then(OsStr::to_str)
            .and_then(Self::detect_from_filename)
    }

    /// The canonical identifier of this format
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::TarXz => "tar.xz",
            Self::TarZst => "tar.zst",
            Self::Gz => "gz",
            Self::Zip => "zip",
        }
    }

    /// Check if this is a tar-based format
    pub fn is_tar_based(&self) -> bool {
        matches!(self, Self::Tar | Self::TarGz | Self::TarXz | Self::TarZst)
    }

    /// Whether an existing archive of this format can be reopened and appended to
    pub fn supports_copy(&self) -> bool {
        matches!(self, Self::Tar | Self::TarGz | Self::Zip)
    }

    /// Get the typical file extensions for this format
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Tar => &[".tar"],
            Self::TarGz => &[".tar.gz", ".tgz"],
            Self::TarXz => &[".tar.xz", ".txz"],
            Self::TarZst => &[".tar.zst", ".tzst"],
            Self::Gz => &[".gz"],
            Self::Zip => &[".zip"],
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tar" => Ok(Self::Tar),
            "tar.gz" | "tgz" => Ok(Self::TarGz),
            "tar.xz" | "txz" => Ok(Self::TarXz),
            "tar.zst" | "tzst" => Ok(Self::TarZst),
            "gz" => Ok(Self::Gz),
            "zip" => Ok(Self::Zip),
            _ => Err(ParseFormatError(s.to_string())),
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}
