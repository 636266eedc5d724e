//! One interface for creating, appending to and extracting archives
//!
//! Supported containers are tar (plain, gzip, xz and zstd compressed), single
//! file gzip streams and zip. Every format goes through the same operations:
//!
//! - [`new`] / [`ArchiveWriter::new`] start an empty archive on a sink
//! - [`copy`] / [`ArchiveWriter::copy`] rewrite an existing tar, tar.gz or zip
//!   archive into a new sink and keep it open for more entries
//! - [`ArchiveWriter::add`] stores a [`FileEntry`], rejecting names that were
//!   already written
//! - [`ArchiveWriter::finish`] closes the container and then its compression
//!   layer, returning the sink
//! - [`unarchive`] / [`Extractor::extract`] unpack an archive into a directory
//!
//! # Examples
//!
//! ## Creating an archive
//!
//! ```no_run
//! use polyarc::{ArchiveFormat, ArchiveWriter, FileEntry, FileMetadata};
//!
//! let sink = fs_err::File::create("release.tar.gz")?;
//! let mut archive = ArchiveWriter::new(sink, ArchiveFormat::TarGz)?;
//! archive.add(&FileEntry::new("target/release/tool", "bin/tool"))?;
//! archive.add(
//!     &FileEntry::new("README.md", "README.md")
//!         .with_info(FileMetadata::default().with_owner("root").with_mode(0o644)),
//! )?;
//! archive.finish()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extracting an archive
//!
//! ```no_run
//! use polyarc::ExtractorBuilder;
//! use std::path::Path;
//!
//! let extractor = ExtractorBuilder::new()
//!     .with_strip_top_dir(true)
//!     .build();
//!
//! extractor.extract(
//!     Path::new("release.tar.gz"),
//!     Path::new("output_dir")
//! )?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod archive;
pub mod entry;
pub mod error;
pub mod extractor;
pub mod format;
pub mod list;
pub mod options;
pub mod progress;
pub mod writer;

mod unpack;

pub use archive::{copy, new, ArchiveWriter};
pub use entry::{FileEntry, FileMetadata};
pub use error::{ArchiveError, Result};
pub use extractor::{unarchive, Extractor, ExtractorBuilder};
pub use format::{ArchiveFormat, ParseFormatError};
pub use list::list_entries;
pub use options::ExtractOptions;
pub use progress::{NoProgressReporter, ProgressReporter};

#[cfg(feature = "progress")]
pub use progress::IndicatifProgressReporter;

/// Check if a filename has a known archive extension
pub fn is_archive(filename: &str) -> bool {
    ArchiveFormat::detect_from_filename(filename).is_some()
}
