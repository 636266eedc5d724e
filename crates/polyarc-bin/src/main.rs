use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use polyarc::{ArchiveFormat, ArchiveWriter, ExtractOptions, ExtractorBuilder, FileEntry};
use tracing_subscriber::{filter::LevelFilter, util::SubscriberInitExt, EnvFilter};

mod config;

use config::{collect_entries, parse_entry_arg, MetadataArgs};

/// Create, append to, extract and list tar, tar.gz, tar.xz, tar.zst, gz and
/// zip archives.
#[derive(Debug, Parser)]
#[command(name = "polyarc", version, about)]
struct Opt {
    #[command(subcommand)]
    command: Command,

    /// Log verbosity, repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a new archive
    Create(CreateOpt),

    /// Rewrite an existing archive with additional entries
    Append(AppendOpt),

    /// Extract an archive into a directory
    Extract(ExtractOpt),

    /// Print the names stored in an archive
    List(ListOpt),
}

#[derive(Debug, clap::Args)]
struct EntryArgs {
    /// Files or directories to add, as `PATH` or `PATH=DEST`
    #[arg(value_name = "PATH[=DEST]", value_parser = parse_entry_arg)]
    entries: Vec<FileEntry>,

    /// YAML file with a `files` list of entries
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    #[command(flatten)]
    metadata: MetadataArgs,
}

#[derive(Debug, clap::Args)]
struct CreateOpt {
    /// The archive to write
    #[arg(long, short)]
    output: PathBuf,

    /// Archive format, detected from the output name when omitted
    #[arg(long, short)]
    format: Option<ArchiveFormat>,

    #[command(flatten)]
    entries: EntryArgs,
}

#[derive(Debug, clap::Args)]
struct AppendOpt {
    /// The archive to extend, only tar, tar.gz and zip are supported
    archive: PathBuf,

    /// Write the result here instead of replacing the archive
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Archive format, detected from the archive name when omitted
    #[arg(long, short)]
    format: Option<ArchiveFormat>,

    #[command(flatten)]
    entries: EntryArgs,
}

#[derive(Debug, clap::Args)]
struct ExtractOpt {
    /// The archive to extract
    archive: PathBuf,

    /// Target directory, created when missing
    #[arg(default_value = ".")]
    destination: PathBuf,

    /// Archive format, detected from the archive name when omitted
    #[arg(long, short)]
    format: Option<ArchiveFormat>,

    /// Drop the first path segment of every entry
    #[arg(long)]
    strip_top_dir: bool,

    /// Replace files and symlinks that already exist
    #[arg(long)]
    overwrite: bool,

    /// Do not show a progress bar
    #[arg(long)]
    no_progress: bool,
}

#[derive(Debug, clap::Args)]
struct ListOpt {
    /// The archive to list
    archive: PathBuf,

    /// Archive format, detected from the archive name when omitted
    #[arg(long, short)]
    format: Option<ArchiveFormat>,
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();

    let default_filter = match opt.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_filter.into())
        .from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .finish()
        .try_init()?;

    match opt.command {
        Command::Create(opt) => create(opt),
        Command::Append(opt) => append(opt),
        Command::Extract(opt) => extract(opt),
        Command::List(opt) => list(opt),
    }
}

fn format_for(format: Option<ArchiveFormat>, path: &Path) -> anyhow::Result<ArchiveFormat> {
    format
        .or_else(|| ArchiveFormat::detect_from_path(path))
        .with_context(|| {
            format!(
                "cannot determine the archive format of {}, pass --format",
                path.display()
            )
        })
}

fn add_all<W: std::io::Write>(
    writer: &mut ArchiveWriter<W>,
    entries: &[FileEntry],
) -> anyhow::Result<()> {
    for entry in entries {
        writer.add(entry)?;
        tracing::info!("added {}", entry.destination);
    }
    Ok(())
}

fn create(opt: CreateOpt) -> anyhow::Result<()> {
    let format = format_for(opt.format, &opt.output)?;
    let entries = collect_entries(
        &opt.entries.entries,
        &opt.entries.metadata,
        opt.entries.config.as_deref(),
    )?;

    let sink = fs_err::File::create(&opt.output)?;
    let mut writer = ArchiveWriter::new(sink, format)?;
    add_all(&mut writer, &entries)?;
    writer.finish()?;

    tracing::info!(
        "wrote {} entries to {}",
        entries.len(),
        opt.output.display()
    );
    Ok(())
}

fn append(opt: AppendOpt) -> anyhow::Result<()> {
    let format = format_for(opt.format, &opt.archive)?;
    let entries = collect_entries(
        &opt.entries.entries,
        &opt.entries.metadata,
        opt.entries.config.as_deref(),
    )?;
    let output = opt.output.unwrap_or_else(|| opt.archive.clone());

    // Write next to the output so the final rename stays on one file system
    let parent = output
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let sink = tempfile::NamedTempFile::new_in(parent)?;

    let source = fs_err::File::open(&opt.archive)?;
    let mut writer = ArchiveWriter::copy(source, sink, format)?;
    add_all(&mut writer, &entries)?;
    writer
        .finish()?
        .persist(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    tracing::info!("appended {} entries to {}", entries.len(), output.display());
    Ok(())
}

fn extract(opt: ExtractOpt) -> anyhow::Result<()> {
    let options = ExtractOptions::new()
        .with_strip_top_dir(opt.strip_top_dir)
        .with_overwrite(opt.overwrite);

    let mut builder = ExtractorBuilder::new().with_options(options);
    if let Some(format) = opt.format {
        builder = builder.with_format(format);
    }

    if opt.no_progress || !std::io::stderr().is_terminal() {
        builder.build().extract(&opt.archive, &opt.destination)?;
    } else {
        let progress_bar = ProgressBar::new(0).with_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {wide_msg}",
            )?
            .progress_chars("#>-"),
        );
        builder
            .with_progress_bar(progress_bar)
            .build()
            .extract(&opt.archive, &opt.destination)?;
    }

    tracing::info!(
        "extracted {} into {}",
        opt.archive.display(),
        opt.destination.display()
    );
    Ok(())
}

fn list(opt: ListOpt) -> anyhow::Result<()> {
    for name in polyarc::list_entries(&opt.archive, opt.format)? {
        println!("{name}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Opt::command().debug_assert();
    }

    #[test]
    fn test_parse_extract() {
        let opt = Opt::try_parse_from([
            "polyarc",
            "extract",
            "dist.tgz",
            "out",
            "--strip-top-dir",
            "-f",
            "tar.gz",
        ])
        .unwrap();
        let Command::Extract(extract) = opt.command else {
            panic!("expected the extract command");
        };
        assert_eq!(extract.destination, PathBuf::from("out"));
        assert_eq!(extract.format, Some(ArchiveFormat::TarGz));
        assert!(extract.strip_top_dir);
        assert!(!extract.overwrite);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(Opt::try_parse_from(["polyarc", "list", "a.rar", "--format", "rar"]).is_err());
    }

    #[test]
    fn test_create_then_append() {
        let dir = tempfile::tempdir().unwrap();
        fs_err::write(dir.path().join("a.txt"), "A").unwrap();
        fs_err::write(dir.path().join("b.txt"), "B").unwrap();
        let archive = dir.path().join("out.zip");

        create(CreateOpt {
            output: archive.clone(),
            format: None,
            entries: EntryArgs {
                entries: vec![FileEntry::new(dir.path().join("a.txt"), "a.txt")],
                config: None,
                metadata: MetadataArgs::default(),
            },
        })
        .unwrap();

        append(AppendOpt {
            archive: archive.clone(),
            output: None,
            format: None,
            entries: EntryArgs {
                entries: vec![FileEntry::new(dir.path().join("b.txt"), "b.txt")],
                config: None,
                metadata: MetadataArgs::default(),
            },
        })
        .unwrap();

        assert_eq!(
            polyarc::list_entries(&archive, None).unwrap(),
            ["a.txt", "b.txt"]
        );
    }
}
