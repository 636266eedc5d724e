//! Single-member gzip writer

use std::io::{self, Write};

use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};
use tracing::{debug, trace};

use super::entry_mtime;
use crate::entry::FileEntry;
use crate::error::{ArchiveError, Result};

/// Compresses exactly one file into a gzip stream.
///
/// The file's archive name and mtime live in the gzip header, so the member
/// is only started once the file is known.
pub struct GzWriter<W: Write> {
    sink: Option<W>,
    member: Option<GzEncoder<W>>,
}

impl<W: Write> GzWriter<W> {
    /// Create a writer that has not received its file yet
    pub fn new(sink: W) -> Self {
        Self {
            sink: Some(sink),
            member: None,
        }
    }

    /// Compress the source of `entry` as the single member of this stream.
    ///
    /// Directories are accepted and ignored.
    pub fn add(&mut self, entry: &FileEntry) -> Result<()> {
        if self.member.is_some() {
            return Err(single_member_violation(entry));
        }

        let mut file = fs_err::File::open(&entry.source)
            .map_err(|e| ArchiveError::source_unavailable(&entry.source, e))?;
        let metadata = file
            .metadata()
            .map_err(|e| ArchiveError::source_unavailable(&entry.source, e))?;
        if metadata.is_dir() {
            trace!("skipping directory {} in gz archive", entry.source.display());
            return Ok(());
        }
        if entry.destination.contains('\0') {
            return Err(ArchiveError::add_failed(
                &entry.source,
                io::Error::new(io::ErrorKind::InvalidInput, "file name contains a nul byte"),
            ));
        }

        let mtime = u32::try_from(entry_mtime(entry, &metadata)).unwrap_or(u32::MAX);
        let sink = self
            .sink
            .take()
            .ok_or_else(|| single_member_violation(entry))?;
        let member = self.member.insert(
            GzBuilder::new()
                .filename(entry.destination.as_bytes())
                .mtime(mtime)
                .write(sink, Compression::best()),
        );
        io::copy(&mut file, member).map_err(|e| ArchiveError::add_failed(&entry.source, e))?;

        debug!(
            "added {} to gz as {}",
            entry.source.display(),
            entry.destination
        );
        Ok(())
    }

    /// Write the gzip trailer and return the sink.
    ///
    /// A writer that never received a file produces an empty member.
    pub fn finish(self) -> Result<W> {
        match (self.member, self.sink) {
            (Some(member), _) => Ok(member.finish()?),
            (None, Some(sink)) => Ok(GzEncoder::new(sink, Compression::best()).finish()?),
            (None, None) => Err(io::Error::other("gzip stream has no sink").into()),
        }
    }
}

fn single_member_violation(entry: &FileEntry) -> ArchiveError {
    ArchiveError::SingleMemberViolation {
        destination: entry.destination.clone(),
    }
}
