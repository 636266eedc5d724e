//! Zip container writer

use std::io::{self, Read, Seek, SeekFrom, Write};

use ::zip::write::SimpleFileOptions;
use ::zip::{CompressionMethod, ZipArchive};
use chrono::{DateTime, Datelike, Timelike};
use tempfile::SpooledTempFile;
use tracing::debug;

use super::{entry_mtime, source_mode, stat_source, WrittenNames};
use crate::entry::FileEntry;
use crate::error::{ArchiveError, Result};

/// Zip archives up to this size are assembled in memory before reaching the sink.
const SPOOL_LIMIT: usize = 16 * 1024 * 1024;

/// Writes entries into a zip archive.
///
/// The central directory needs a seekable stream, so the archive is spooled
/// and only copied into the sink when the writer finishes. Owner and group
/// overrides have no zip representation and are ignored.
pub struct ZipWriter<W: Write> {
    zip: ::zip::ZipWriter<SpooledTempFile>,
    sink: W,
    names: WrittenNames,
}

impl<W: Write> ZipWriter<W> {
    /// Start an empty zip archive
    pub fn new(sink: W) -> Self {
        Self {
            zip: ::zip::ZipWriter::new(SpooledTempFile::new(SPOOL_LIMIT)),
            sink,
            names: WrittenNames::default(),
        }
    }

    /// Start a zip archive holding every entry of `source`, copied without
    /// recompression
    pub fn copy<R: Read + Seek>(source: R, sink: W) -> Result<Self> {
        let mut archive = ZipArchive::new(source)?;
        let mut writer = Self::new(sink);

        for index in 0..archive.len() {
            let file = archive.by_index_raw(index)?;
            let name = file.name().to_string();
            writer.zip.raw_copy_file(file)?;
            debug!("copied zip entry {name}");
            writer.names.insert(name.trim_end_matches('/'));
        }

        Ok(writer)
    }

    /// Add a file, directory or symlink under `entry.destination`
    pub fn add(&mut self, entry: &FileEntry) -> Result<()> {
        self.names.reserve(&entry.destination)?;

        let metadata = stat_source(entry)?;
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip_datetime(entry_mtime(entry, &metadata)))
            .unix_permissions(entry.info.mode().unwrap_or_else(|| source_mode(&metadata)));

        if metadata.is_dir() {
            self.zip
                .add_directory(entry.destination.as_str(), options)?;
        } else if metadata.file_type().is_symlink() {
            let target = fs_err::read_link(&entry.source)
                .map_err(|e| ArchiveError::source_unavailable(&entry.source, e))?;
            self.zip.add_symlink(
                entry.destination.as_str(),
                target.to_string_lossy().replace('\\', "/"),
                options,
            )?;
        } else {
            let mut file = fs_err::File::open(&entry.source)
                .map_err(|e| ArchiveError::source_unavailable(&entry.source, e))?;
            self.zip.start_file(entry.destination.as_str(), options)?;
            io::copy(&mut file, &mut self.zip)
                .map_err(|e| ArchiveError::add_failed(&entry.source, e))?;
        }

        debug!(
            "added {} to zip as {}",
            entry.source.display(),
            entry.destination
        );
        Ok(())
    }

    /// Write the central directory, copy the archive into the sink and
    /// return it
    pub fn finish(self) -> Result<W> {
        let Self { zip, mut sink, .. } = self;
        let mut spool = zip.finish()?;
        spool.seek(SeekFrom::Start(0))?;
        io::copy(&mut spool, &mut sink)?;
        sink.flush()?;
        Ok(sink)
    }
}

/// MS-DOS timestamp for the given epoch seconds, clamped to the zip epoch
fn zip_datetime(seconds: u64) -> ::zip::DateTime {
    let Some(time) = i64::try_from(seconds)
        .ok()
        .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
    else {
        return ::zip::DateTime::default();
    };

    u16::try_from(time.year())
        .ok()
        .and_then(|year| {
            ::zip::DateTime::from_date_and_time(
                year,
                time.month() as u8,
                time.day() as u8,
                time.hour() as u8,
                time.minute() as u8,
                time.second() as u8,
            )
            .ok()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::FileMetadata;
    use std::io::Cursor;

    fn testdata() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("foo.txt"), "foo\n").unwrap();
        std::fs::write(dir.path().join("regular.txt"), "regular\n").unwrap();
        std::fs::create_dir_all(dir.path().join("sub1")).unwrap();
        std::fs::write(dir.path().join("sub1/executable"), "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(
                dir.path().join("sub1/executable"),
                std::fs::Permissions::from_mode(0o755),
            )
            .unwrap();
        }
        dir
    }

    fn open(bytes: Vec<u8>) -> ZipArchive<Cursor<Vec<u8>>> {
        ZipArchive::new(Cursor::new(bytes)).unwrap()
    }

    fn names(archive: &mut ZipArchive<Cursor<Vec<u8>>>) -> Vec<String> {
        (0..archive.len())
            .map(|index| archive.by_index(index).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_zip_file() {
        let data = testdata();
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let add = |zip: &mut ZipWriter<Cursor<Vec<u8>>>, src: &str, dst: &str| {
            zip.add(&FileEntry::new(data.path().join(src), dst))
        };

        assert!(add(&mut zip, "nope.txt", "nope.txt").is_err());
        add(&mut zip, "foo.txt", "foo.txt").unwrap();
        add(&mut zip, "sub1", "sub1").unwrap();
        add(&mut zip, "sub1/executable", "sub1/executable").unwrap();
        add(&mut zip, "regular.txt", "regular.txt").unwrap();
        assert!(add(&mut zip, "foo.txt", "regular.txt")
            .unwrap_err()
            .is_duplicate_entry());

        let mut archive = open(zip.finish().unwrap().into_inner());
        assert_eq!(
            names(&mut archive),
            ["foo.txt", "sub1/", "sub1/executable", "regular.txt"]
        );
        assert!(archive.by_name("sub1/").unwrap().is_dir());

        #[cfg(unix)]
        {
            let executable = archive.by_name("sub1/executable").unwrap();
            assert_ne!(executable.unix_mode().unwrap() & 0o111, 0);
        }

        let mut content = String::new();
        archive
            .by_name("regular.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "regular\n");
    }

    #[test]
    fn test_zip_file_info() {
        let data = testdata();
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.add(
            &FileEntry::new(data.path().join("foo.txt"), "nope.txt").with_info(
                FileMetadata::default()
                    .with_mode(0o755)
                    .with_owner("carlos")
                    .with_group("root"),
            ),
        )
        .unwrap();

        let mut archive = open(zip.finish().unwrap().into_inner());
        assert_eq!(archive.len(), 1);
        let file = archive.by_index(0).unwrap();
        assert_eq!(file.name(), "nope.txt");
        assert_eq!(file.unix_mode().unwrap() & 0o7777, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn test_zip_symlink() {
        let data = testdata();
        std::os::unix::fs::symlink("regular.txt", data.path().join("link.txt")).unwrap();
        std::os::unix::fs::symlink("missing.txt", data.path().join("badlink.txt")).unwrap();

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.add(&FileEntry::new(data.path().join("link.txt"), "link.txt"))
            .unwrap();
        zip.add(&FileEntry::new(data.path().join("badlink.txt"), "badlink.txt"))
            .unwrap();

        let mut archive = open(zip.finish().unwrap().into_inner());
        let mut link = archive.by_name("link.txt").unwrap();
        assert_eq!(link.unix_mode().unwrap() & 0o170000, 0o120000);
        let mut target = String::new();
        link.read_to_string(&mut target).unwrap();
        assert_eq!(target, "regular.txt");
    }

    #[test]
    fn test_zip_copy_then_add() {
        let data = testdata();
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.add(&FileEntry::new(data.path().join("foo.txt"), "foo.txt"))
            .unwrap();
        let original = zip.finish().unwrap();

        let mut copied = ZipWriter::copy(original, Cursor::new(Vec::new())).unwrap();
        assert!(copied
            .add(&FileEntry::new(data.path().join("regular.txt"), "foo.txt"))
            .unwrap_err()
            .is_duplicate_entry());
        copied
            .add(&FileEntry::new(data.path().join("regular.txt"), "added_later.txt"))
            .unwrap();

        let mut archive = open(copied.finish().unwrap().into_inner());
        assert_eq!(names(&mut archive), ["foo.txt", "added_later.txt"]);
        let mut content = String::new();
        archive
            .by_name("foo.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "foo\n");
    }

    #[test]
    fn test_zip_directory_into_plain_writer() {
        let data = testdata();
        let mut zip = ZipWriter::new(Vec::new());
        zip.add(
            &FileEntry::new(data.path().join("sub1"), "empty")
                .with_info(FileMetadata::default().with_mode(0o750)),
        )
        .unwrap();
        assert!(zip
            .add(&FileEntry::new(data.path().join("foo.txt"), "empty"))
            .unwrap_err()
            .is_duplicate_entry());

        let mut archive = open(zip.finish().unwrap());
        assert_eq!(names(&mut archive), ["empty/"]);
        let directory = archive.by_index(0).unwrap();
        assert!(directory.is_dir());
        assert_eq!(directory.unix_mode().unwrap() & 0o7777, 0o750);
    }
}
