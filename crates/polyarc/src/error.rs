//! Error types for the polyarc crate

use std::path::PathBuf;

use crate::format::ArchiveFormat;

/// Result type for archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Error type for archive operations
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// An entry with the same destination was already written in this session
    #[error("{operation} {path}: file already exists")]
    DuplicateEntry {
        operation: &'static str,
        path: String,
    },

    /// The source of an entry could not be inspected or opened
    #[error("source {} is unavailable", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing an entry into the archive failed
    #[error("{}: {source}", path.display())]
    AddFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A second file was added to a single-member container
    #[error("gzip: failed to add {destination}, only one file can be archived in gz format")]
    SingleMemberViolation { destination: String },

    /// A regular file already exists at the extraction target
    #[error("file exists: {}", .0.display())]
    FileExists(PathBuf),

    /// A filesystem object already exists where a symlink should be created
    #[error("symlink exists: {}", .0.display())]
    SymlinkExists(PathBuf),

    /// Unknown format identifier passed to writer construction
    #[error("invalid archive format: {0}")]
    InvalidFormat(String),

    /// Unknown format identifier passed to extraction
    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    /// The container of this format cannot be reopened for appending
    #[error("cannot copy a {0} archive, only tar, tar.gz and zip archives can be appended to")]
    CopyUnsupported(ArchiveFormat),

    /// An archive entry would be written outside of the destination directory
    #[error("refusing to extract {name}: path escapes the destination directory")]
    UnsafePath { name: String },

    /// Writing an extracted entry to disk failed
    #[error("failed to extract {}: {source}", path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error during archive operations
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Error reported by the zip container
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

impl ArchiveError {
    /// Create a new duplicate entry error for the `add` operation
    pub fn duplicate_entry(destination: impl Into<String>) -> Self {
        Self::DuplicateEntry {
            operation: "add",
            path: destination.into(),
        }
    }

    /// Create a new source unavailable error
    pub fn source_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            source,
        }
    }

    /// Create a new add failure error
    pub fn add_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::AddFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a new extraction failure error
    pub fn extract(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Extract {
            path: path.into(),
            source,
        }
    }

    /// Create a new unsafe path error
    pub fn unsafe_path(name: impl Into<String>) -> Self {
        Self::UnsafePath { name: name.into() }
    }

    /// Returns true if this error reports a destination collision
    pub fn is_duplicate_entry(&self) -> bool {
        matches!(self, Self::DuplicateEntry { .. })
    }

    /// Returns true if extraction stopped because the target already exists
    pub fn is_target_exists(&self) -> bool {
        matches!(self, Self::FileExists(_) | Self::SymlinkExists(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            ArchiveError::duplicate_entry("link.txt").to_string(),
            "add link.txt: file already exists"
        );
        assert_eq!(
            ArchiveError::SingleMemberViolation {
                destination: "foo.txt".to_string()
            }
            .to_string(),
            "gzip: failed to add foo.txt, only one file can be archived in gz format"
        );
        assert_eq!(
            ArchiveError::InvalidFormat("7z".to_string()).to_string(),
            "invalid archive format: 7z"
        );
        assert_eq!(
            ArchiveError::UnsupportedFormat("rar".to_string()).to_string(),
            "unsupported archive format: rar"
        );
    }

    #[test]
    fn test_source_errors_name_the_path() {
        let err = ArchiveError::source_unavailable(
            "testdata/nope.txt",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert_eq!(err.to_string(), "source testdata/nope.txt is unavailable");
        assert!(std::error::Error::source(&err).is_some());
    }
}
