//! Per-entry extraction policy shared by every archive format

use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{ArchiveError, Result};
use crate::options::ExtractOptions;

const DEFAULT_DIR_MODE: u32 = 0o755;
const DEFAULT_FILE_MODE: u32 = 0o644;

/// What an archive entry turns into on disk
#[derive(Debug)]
pub(crate) enum EntryKind {
    Directory,
    File,
    Symlink(PathBuf),
    /// Hard links, devices, fifos and anything else; never extracted
    Other,
}

/// Writes archive entries below a destination directory.
pub(crate) struct Unpacker<'a> {
    destination: &'a Path,
    options: ExtractOptions,
}

impl<'a> Unpacker<'a> {
    pub(crate) fn new(destination: &'a Path, options: ExtractOptions) -> Self {
        Self {
            destination,
            options,
        }
    }

    /// Extract one entry named `name`, applying the top directory strip.
    ///
    /// Returns the path that was written, or `None` if the entry was skipped.
    pub(crate) fn unpack(
        &self,
        name: &str,
        kind: EntryKind,
        mode: Option<u32>,
        body: &mut dyn Read,
    ) -> Result<Option<PathBuf>> {
        let name = if self.options.strip_top_dir {
            match strip_top_dir(name) {
                Some(rest) => rest,
                None => {
                    trace!("skipping {name}, nothing left after stripping the top directory");
                    return Ok(None);
                }
            }
        } else {
            name
        };
        self.unpack_at(name, kind, mode, body)
    }

    /// Extract one entry at `name` exactly as given
    pub(crate) fn unpack_at(
        &self,
        name: &str,
        kind: EntryKind,
        mode: Option<u32>,
        body: &mut dyn Read,
    ) -> Result<Option<PathBuf>> {
        let relative = relative_path(name)?;
        if relative.as_os_str().is_empty() {
            return Ok(None);
        }
        if matches!(kind, EntryKind::Other) {
            trace!("skipping {name}, unsupported entry type");
            return Ok(None);
        }
        self.reject_symlinked_parents(&relative, name)?;
        let target = self.destination.join(relative);

        match kind {
            EntryKind::Directory => {
                fs_err::create_dir_all(&target)?;
                set_mode(&target, mode.unwrap_or(DEFAULT_DIR_MODE))?;
            }
            EntryKind::File => {
                self.make_room(&target, false)?;
                create_parent(&target)?;
                write_file(&target, mode.unwrap_or(DEFAULT_FILE_MODE), body)?;
            }
            EntryKind::Symlink(link) => {
                self.make_room(&target, true)?;
                create_parent(&target)?;
                create_symlink(&link, &target)?;
            }
            EntryKind::Other => return Ok(None),
        }

        debug!("extracted {}", target.display());
        Ok(Some(target))
    }

    /// Fail if any directory between the destination and the entry is a
    /// symlink, so an earlier entry cannot redirect later writes elsewhere.
    fn reject_symlinked_parents(&self, relative: &Path, name: &str) -> Result<()> {
        let Some(parent) = relative.parent() else {
            return Ok(());
        };

        let mut current = self.destination.to_path_buf();
        for component in parent.components() {
            current.push(component);
            match fs_err::symlink_metadata(&current) {
                Ok(metadata) if metadata.file_type().is_symlink() => {
                    return Err(ArchiveError::unsafe_path(name));
                }
                Ok(_) => {}
                // Nothing below a missing directory exists yet
                Err(_) => break,
            }
        }
        Ok(())
    }

    /// Fail if something exists at `target`, unless overwriting is allowed.
    ///
    /// When overwriting, existing symlinks are removed so writes never follow
    /// them, and anything but a directory is removed before a symlink is made.
    fn make_room(&self, target: &Path, for_symlink: bool) -> Result<()> {
        let Ok(existing) = fs_err::symlink_metadata(target) else {
            return Ok(());
        };

        if !self.options.overwrite {
            return Err(if for_symlink {
                ArchiveError::SymlinkExists(target.to_path_buf())
            } else {
                ArchiveError::FileExists(target.to_path_buf())
            });
        }

        if existing.file_type().is_symlink() || (for_symlink && !existing.is_dir()) {
            fs_err::remove_file(target)?;
        }
        Ok(())
    }
}

/// Drop everything up to and including the first `/`
fn strip_top_dir(name: &str) -> Option<&str> {
    name.split_once('/')
        .map(|(_, rest)| rest)
        .filter(|rest| !rest.is_empty())
}

/// Turn an archive name into a relative path that cannot leave the destination
fn relative_path(name: &str) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ArchiveError::unsafe_path(name));
            }
        }
    }
    Ok(relative)
}

fn create_parent(target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs_err::create_dir_all(parent)?;
    }
    Ok(())
}

/// Apply the archived permission bits, also to objects that already existed
fn set_mode(target: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs_err::set_permissions(target, std::fs::Permissions::from_mode(mode & 0o7777))?;
    }
    #[cfg(not(unix))]
    let _ = (target, mode);
    Ok(())
}

fn write_file(target: &Path, mode: u32, body: &mut dyn Read) -> Result<()> {
    let mut options = fs_err::OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use fs_err::os::unix::fs::OpenOptionsExt;
        options.mode(mode & 0o7777);
    }

    let mut file = options.open(target)?;
    io::copy(body, &mut file).map_err(|e| ArchiveError::extract(target, e))?;
    set_mode(target, mode)
}

#[cfg(unix)]
fn create_symlink(link: &Path, target: &Path) -> Result<()> {
    fs_err::os::unix::fs::symlink(link, target)?;
    Ok(())
}

#[cfg(windows)]
fn create_symlink(link: &Path, target: &Path) -> Result<()> {
    fs_err::os::windows::fs::symlink_file(link, target)?;
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(link: &Path, target: &Path) -> Result<()> {
    Err(ArchiveError::extract(
        target,
        io::Error::new(
            io::ErrorKind::Unsupported,
            format!("cannot create symlink to {}", link.display()),
        ),
    ))
}
