//! Where the entries of a `create` or `append` come from

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use polyarc::{FileEntry, FileMetadata};
use serde::Deserialize;

/// A YAML file listing the entries to archive.
///
/// ```yaml
/// files:
///   - src: target/release/tool
///     dst: bin/tool
///     info:
///       mode: 0o755
///       owner: root
///   - src: docs
///     dst: share/doc
///     strip_parent: true
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct FilesConfig {
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

impl FilesConfig {
    /// Read a config file
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = fs_err::read_to_string(path)?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))
    }
}

/// Parse a `PATH[=DEST]` argument. Without a destination the path itself is
/// used as the archive name.
pub fn parse_entry_arg(arg: &str) -> Result<FileEntry, String> {
    let (source, destination) = match arg.split_once('=') {
        Some((source, destination)) => (source, destination.to_string()),
        None => (arg, archive_name(Path::new(arg))),
    };
    if source.is_empty() {
        return Err(format!("missing source path in '{arg}'"));
    }
    Ok(FileEntry::new(source, destination))
}

/// Parse an octal permission string such as `755` or `0o644`
pub fn parse_mode(mode: &str) -> Result<u32, String> {
    let digits = mode.strip_prefix("0o").unwrap_or(mode);
    u32::from_str_radix(digits, 8).map_err(|e| format!("invalid mode '{mode}': {e}"))
}

/// Parse an RFC 3339 timestamp
pub fn parse_mtime(mtime: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(mtime)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{mtime}': {e}"))
}

/// Metadata overrides given on the command line
#[derive(Debug, Default, Clone, clap::Args)]
pub struct MetadataArgs {
    /// Owner name recorded for every entry given on the command line
    #[arg(long)]
    pub owner: Option<String>,

    /// Group name recorded for every entry given on the command line
    #[arg(long)]
    pub group: Option<String>,

    /// Octal permission bits for every entry given on the command line
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<u32>,

    /// RFC 3339 modification time for every entry given on the command line
    #[arg(long, value_parser = parse_mtime)]
    pub mtime: Option<DateTime<Utc>>,
}

impl MetadataArgs {
    fn to_metadata(&self) -> FileMetadata {
        FileMetadata {
            owner: self.owner.clone(),
            group: self.group.clone(),
            mode: self.mode,
            mtime: self.mtime,
        }
    }
}

/// Collect the command line entries followed by the ones from `config`,
/// expanding directories into their contents.
pub fn collect_entries(
    args: &[FileEntry],
    metadata: &MetadataArgs,
    config: Option<&Path>,
) -> anyhow::Result<Vec<FileEntry>> {
    let overrides = metadata.to_metadata();
    let mut entries: Vec<FileEntry> = args
        .iter()
        .map(|entry| entry.clone().with_info(overrides.clone()))
        .collect();

    if let Some(config) = config {
        entries.extend(FilesConfig::from_path(config)?.files);
    }

    let mut expanded = Vec::new();
    for entry in &entries {
        expanded.extend(entry.expand()?);
    }
    Ok(expanded)
}

/// Archive name for a path given without an explicit destination
fn archive_name(path: &Path) -> String {
    let name: PathBuf = path
        .components()
        .filter(|component| matches!(component, std::path::Component::Normal(_)))
        .collect();
    name.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry_arg() {
        let entry = parse_entry_arg("target/release/tool=bin/tool").unwrap();
        assert_eq!(entry.source, PathBuf::from("target/release/tool"));
        assert_eq!(entry.destination, "bin/tool");

        let entry = parse_entry_arg("./docs/README.md").unwrap();
        assert_eq!(entry.destination, "docs/README.md");

        assert!(parse_entry_arg("=dest").is_err());
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("755").unwrap(), 0o755);
        assert_eq!(parse_mode("0o644").unwrap(), 0o644);
        assert!(parse_mode("9").is_err());
    }

    #[test]
    fn test_parse_mtime() {
        let mtime = parse_mtime("2008-01-02T15:04:05+00:00").unwrap();
        assert_eq!(mtime.timestamp(), 1_199_286_245);
        assert!(parse_mtime("yesterday").is_err());
    }

    #[test]
    fn test_files_config() {
        let config: FilesConfig = serde_yaml::from_str(
            r#"
files:
  - src: bin/tool
    dst: usr/bin/tool
    info:
      mode: 493
      owner: root
  - src: docs
    dst: share/doc
    strip_parent: true
"#,
        )
        .unwrap();

        assert_eq!(config.files.len(), 2);
        assert_eq!(config.files[0].destination, "usr/bin/tool");
        assert_eq!(config.files[0].info.mode(), Some(0o755));
        assert_eq!(config.files[0].info.owner(), Some("root"));
        assert!(config.files[1].strip_parent);
    }

    #[test]
    fn test_collect_entries_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        fs_err::write(dir.path().join("a.txt"), "a").unwrap();
        let config_path = dir.path().join("files.yaml");
        fs_err::write(
            &config_path,
            format!(
                "files:\n  - src: {}\n    dst: from-config.txt\n",
                dir.path().join("a.txt").display()
            ),
        )
        .unwrap();

        let metadata = MetadataArgs {
            owner: Some("carlos".to_string()),
            ..MetadataArgs::default()
        };
        let entries = collect_entries(
            &[FileEntry::new(dir.path().join("a.txt"), "a.txt")],
            &metadata,
            Some(&config_path),
        )
        .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].info.owner(), Some("carlos"));
        assert_eq!(entries[1].destination, "from-config.txt");
        assert_eq!(entries[1].info.owner(), None);
    }
}
