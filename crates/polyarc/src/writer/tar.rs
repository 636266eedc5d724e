//! Tar container writer shared by the plain and compressed tar formats

use std::borrow::Cow;
use std::io::{self, Read};

use ::tar::{Archive, Builder, Header, HeaderMode};
use tracing::debug;

use super::{entry_mtime, stat_source, CompressionLayer, WrittenNames};
use crate::entry::FileEntry;
use crate::error::{ArchiveError, Result};

/// Writes entries into a tar stream on top of a compression layer.
pub struct TarWriter<E: CompressionLayer> {
    builder: Builder<E>,
    names: WrittenNames,
}

impl<E: CompressionLayer> TarWriter<E> {
    /// Start an empty tar stream
    pub fn new(layer: E) -> Self {
        Self {
            builder: Builder::new(layer),
            names: WrittenNames::default(),
        }
    }

    /// Start a tar stream holding every entry of `source`, unchanged.
    ///
    /// The names of the copied entries count as written, so adding one of
    /// them again is rejected.
    pub fn copy<R: Read>(source: R, layer: E) -> Result<Self> {
        let mut writer = Self::new(layer);
        let mut archive = Archive::new(source);

        for entry in archive.entries()? {
            let mut entry = entry?;
            let path = entry.path()?.into_owned();
            let mut header = entry.header().clone();
            let entry_type = header.entry_type();

            if entry_type.is_symlink() || entry_type.is_hard_link() {
                let target = entry
                    .link_name()?
                    .map(Cow::into_owned)
                    .unwrap_or_default();
                writer.builder.append_link(&mut header, &path, &target)?;
            } else {
                writer.builder.append_data(&mut header, &path, &mut entry)?;
            }

            debug!("copied tar entry {}", path.display());
            writer.names.insert(path.to_string_lossy().trim_end_matches('/'));
        }

        Ok(writer)
    }

    /// Add a file, directory or symlink under `entry.destination`
    pub fn add(&mut self, entry: &FileEntry) -> Result<()> {
        self.names.reserve(&entry.destination)?;

        let metadata = stat_source(entry)?;
        let file_type = metadata.file_type();
        let link_target = if file_type.is_symlink() {
            Some(
                fs_err::read_link(&entry.source)
                    .map_err(|e| ArchiveError::source_unavailable(&entry.source, e))?,
            )
        } else {
            None
        };

        let mut header = Header::new_gnu();
        header.set_metadata_in_mode(&metadata, HeaderMode::Complete);
        if !file_type.is_file() {
            header.set_size(0);
        }
        header.set_mtime(entry_mtime(entry, &metadata));
        if let Some(mode) = entry.info.mode() {
            header.set_mode(mode);
        }
        if let Some(owner) = entry.info.owner() {
            header.set_uid(0);
            header
                .set_username(owner)
                .map_err(|e| ArchiveError::add_failed(&entry.source, e))?;
        }
        if let Some(group) = entry.info.group() {
            header.set_gid(0);
            header
                .set_groupname(group)
                .map_err(|e| ArchiveError::add_failed(&entry.source, e))?;
        }

        let written = match link_target {
            Some(target) => self
                .builder
                .append_link(&mut header, &entry.destination, target),
            None if file_type.is_file() => {
                let file = fs_err::File::open(&entry.source)
                    .map_err(|e| ArchiveError::source_unavailable(&entry.source, e))?;
                self.builder
                    .append_data(&mut header, &entry.destination, file)
            }
            None => self
                .builder
                .append_data(&mut header, &entry.destination, io::empty()),
        };
        written.map_err(|e| ArchiveError::add_failed(&entry.source, e))?;

        debug!(
            "added {} to tar as {}",
            entry.source.display(),
            entry.destination
        );
        Ok(())
    }

    /// Write the tar trailer, then close the compression layer
    pub fn finish(self) -> Result<E::Inner> {
        let layer = self.builder.into_inner()?;
        Ok(layer.close()?)
    }
}
