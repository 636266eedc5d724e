//! Source-to-destination mappings for files added to an archive

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{ArchiveError, Result};

/// A file on disk and the name it gets inside an archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path of the file on disk
    #[serde(rename = "src")]
    pub source: PathBuf,

    /// Archive-relative name, unique within one archive
    #[serde(rename = "dst", default)]
    pub destination: String,

    /// Flatten directory sources into `destination/<file name>` when expanded
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub strip_parent: bool,

    /// Metadata overrides applied when the entry is written
    #[serde(default, skip_serializing_if = "FileMetadata::is_empty")]
    pub info: FileMetadata,
}

/// Optional metadata overrides for an archived file.
///
/// Unset fields fall back to whatever the source file has on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Owner name recorded instead of the numeric uid (the uid becomes 0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Group name recorded instead of the numeric gid (the gid becomes 0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Permission bits, `0` means "use the source file's mode"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,

    /// Modification time, RFC 3339 on the wire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<DateTime<Utc>>,
}

impl FileEntry {
    /// Create an entry that stores `source` under `destination`
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            strip_parent: false,
            info: FileMetadata::default(),
        }
    }

    /// Attach metadata overrides
    pub fn with_info(mut self, info: FileMetadata) -> Self {
        self.info = info;
        self
    }

    /// Whether directory sources are flattened on expansion
    pub fn with_strip_parent(mut self, strip_parent: bool) -> Self {
        self.strip_parent = strip_parent;
        self
    }

    /// Expand a directory source into one entry per file system object below it.
    ///
    /// Symlinks are not followed. A non-directory source expands to itself.
    pub fn expand(&self) -> Result<Vec<FileEntry>> {
        let metadata = fs_err::symlink_metadata(&self.source)
            .map_err(|e| ArchiveError::source_unavailable(&self.source, e))?;
        if !metadata.is_dir() {
            return Ok(vec![self.clone()]);
        }

        let mut entries = Vec::new();
        for item in WalkDir::new(&self.source)
            .follow_links(false)
            .sort_by_file_name()
        {
            let item = item.map_err(|e| {
                let path = e.path().unwrap_or(&self.source).to_path_buf();
                ArchiveError::source_unavailable(path, e.into())
            })?;

            let destination = if self.strip_parent {
                if item.file_type().is_dir() {
                    continue;
                }
                join_archive_path(&self.destination, &item.file_name().to_string_lossy())
            } else {
                let relative = item.path().strip_prefix(&self.source).unwrap_or(item.path());
                join_archive_path(&self.destination, &to_archive_path(relative))
            };
            if destination.is_empty() {
                continue;
            }

            entries.push(FileEntry {
                source: item.into_path(),
                destination,
                strip_parent: false,
                info: self.info.clone(),
            });
        }
        Ok(entries)
    }
}

impl FileMetadata {
    /// Override the owner name
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Override the group name
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Override the permission bits
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Override the modification time
    pub fn with_mtime(mut self, mtime: DateTime<Utc>) -> Self {
        self.mtime = Some(mtime);
        self
    }

    /// The owner override, if set to a non-empty name
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref().filter(|owner| !owner.is_empty())
    }

    /// The group override, if set to a non-empty name
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref().filter(|group| !group.is_empty())
    }

    /// The mode override, if set to something other than zero
    pub fn mode(&self) -> Option<u32> {
        self.mode.filter(|mode| *mode != 0)
    }

    fn is_empty(&self) -> bool {
        self.owner.is_none() && self.group.is_none() && self.mode.is_none() && self.mtime.is_none()
    }
}

/// Join two archive-relative names with `/`
pub(crate) fn join_archive_path(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    match (base.is_empty(), name.is_empty()) {
        (_, true) => base.to_string(),
        (true, false) => name.to_string(),
        (false, false) => format!("{base}/{name}"),
    }
}

/// Convert a relative file system path to an archive name
fn to_archive_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
