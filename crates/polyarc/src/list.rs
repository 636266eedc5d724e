//! Listing the entries of an archive without extracting it

use std::io::BufReader;
use std::path::Path;

use crate::error::Result;
use crate::extractor::{gz_member_name, resolve_format, tar_reader, TarCompression};
use crate::format::ArchiveFormat;

/// Names of the entries stored in `path`, in archive order.
///
/// Directory names are listed without their trailing `/`. A gz archive lists
/// the single member name it decompresses to. When `format` is `None` it is
/// detected from the file name.
pub fn list_entries(path: impl AsRef<Path>, format: Option<ArchiveFormat>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let format = resolve_format(format, path)?;
    let reader = BufReader::new(fs_err::File::open(path)?);

    match TarCompression::for_format(format) {
        Some(compression) => {
            let mut archive = tar::Archive::new(tar_reader(reader, compression)?);
            let mut names = Vec::new();
            for entry in archive.entries()? {
                let entry = entry?;
                let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
                names.push(directory_name(name));
            }
            Ok(names)
        }
        None if format == ArchiveFormat::Zip => {
            let mut archive = zip::ZipArchive::new(reader)?;
            (0..archive.len())
                .map(|index| Ok(directory_name(archive.by_index_raw(index)?.name().to_string())))
                .collect()
        }
        None => {
            let decoder = flate2::read::GzDecoder::new(reader);
            Ok(vec![gz_member_name(&decoder, path)?])
        }
    }
}

fn directory_name(name: String) -> String {
    match name.trim_end_matches('/') {
        "" => name,
        trimmed => trimmed.to_string(),
    }
}
