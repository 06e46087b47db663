//! # contextgen CLI - Snapshot a codebase into one verifiable file
//!
//! ## Usage
//! ```bash
//! # Markdown snapshot of the current directory into ./__aicontextgen.md
//! contextgen snapshot -i .
//!
//! # Compressed snapshot at maximum compression
//! contextgen snapshot -i ./project --cryptic --level 9
//!
//! # Check a snapshot without writing anything
//! contextgen restore __aicontextgen.cryptic --verify-only
//!
//! # Restore into another directory
//! contextgen restore __aicontextgen.md -o ./restored
//!
//! # Inspect a cryptic header
//! contextgen validate __aicontextgen.cryptic
//! ```

use clap::{Parser, Subcommand};
use colored::*;
use contextgen::admission::DEFAULT_MAX_SIZE;
use contextgen::compression::DEFAULT_COMPRESSION_LEVEL;
use contextgen::cryptic::{self, VERSION_TAG};
use contextgen::snapshot::{DEFAULT_CRYPTIC_OUTPUT, DEFAULT_MARKDOWN_OUTPUT};
use contextgen::utils::format_bytes;
use contextgen::{
    markdown, restore_cryptic, restore_markdown, ContextGenBuilder, ContextGenError,
    DecodeOptions, Progress, Result,
};
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Generate and restore AI-friendly snapshots of a project folder
#[derive(Parser)]
#[command(name = "contextgen")]
#[command(version)]
#[command(about = "Snapshot a project folder into a single verifiable Markdown or cryptic file")]
#[command(long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a folder into a snapshot file
    #[command(alias = "snap")]
    Snapshot {
        /// Input folder to scan
        #[arg(short, long, default_value = ".")]
        input: PathBuf,

        /// Output filename, relative to the input folder
        #[arg(short, long)]
        output: Option<String>,

        /// Write the compressed cryptic format instead of Markdown
        #[arg(long)]
        cryptic: bool,

        /// Gzip level for the cryptic format (1-9)
        #[arg(long, default_value_t = DEFAULT_COMPRESSION_LEVEL)]
        level: u32,

        /// Skip files larger than this many bytes (0 = no limit)
        #[arg(long, default_value_t = DEFAULT_MAX_SIZE)]
        max_size: u64,

        /// Extra ignore patterns (gitignore syntax)
        #[arg(long)]
        ignore: Vec<String>,

        /// Show progress
        #[arg(long)]
        progress: bool,
    },

    /// Verify a snapshot and restore its files
    #[command(alias = "rs")]
    Restore {
        /// Snapshot file (Markdown or cryptic, detected automatically)
        archive: PathBuf,

        /// Directory to restore into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Verify every checksum but write nothing
        #[arg(long)]
        verify_only: bool,

        /// Show progress
        #[arg(long)]
        progress: bool,
    },

    /// Check a cryptic snapshot's header without decompressing it
    Validate {
        /// Cryptic snapshot file
        archive: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e.user_message());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let verbose = cli.verbose;
    match cli.command {
        Commands::Snapshot {
            input,
            output,
            cryptic,
            level,
            max_size,
            ignore,
            progress,
        } => cmd_snapshot(input, output, cryptic, level, max_size, ignore, progress, verbose),
        Commands::Restore {
            archive,
            output,
            verify_only,
            progress,
        } => cmd_restore(&archive, &output, verify_only, progress),
        Commands::Validate { archive } => cmd_validate(&archive),
    }
}

/// Capture a folder
///
/// Lists candidates (honouring `.gitignore`, `.ai-ignore`, `.git/` and the
/// output file), captures each under the size and extension rules, and
/// writes the snapshot into the input folder.
#[allow(clippy::too_many_arguments)]
fn cmd_snapshot(
    input: PathBuf,
    output: Option<String>,
    cryptic: bool,
    level: u32,
    max_size: u64,
    ignore: Vec<String>,
    show_progress: bool,
    verbose: bool,
) -> Result<()> {
    let output = output.unwrap_or_else(|| {
        if cryptic {
            DEFAULT_CRYPTIC_OUTPUT.to_string()
        } else {
            DEFAULT_MARKDOWN_OUTPUT.to_string()
        }
    });

    let generator = ContextGenBuilder::new()
        .output_filename(output)
        .max_file_size(max_size)
        .compression_level(level)
        .ignore_patterns(ignore)
        .build(input)?;

    let root = generator
        .root()
        .canonicalize()
        .unwrap_or_else(|_| generator.root().to_path_buf());
    println!(
        "{} {}",
        "Scanning files in".blue().bold(),
        root.display().to_string().cyan()
    );

    let start = Instant::now();
    let listing = show_progress.then(|| spinner("Listing files..."));
    let paths = generator.list_files(listing.as_ref().map(|pb| pb as &dyn Progress))?;
    if let Some(pb) = listing {
        pb.finish_and_clear();
    }

    let format = if cryptic { "cryptic" } else { "Markdown" };
    println!("Generating {} output for {} files...", format, paths.len());

    let bar = show_progress.then(|| progress_bar(paths.len() as u64));
    let sink = bar.as_ref().map(|pb| pb as &dyn Progress);
    let encoded = if cryptic {
        generator.render_cryptic(&paths, sink)?
    } else {
        generator.render_markdown(&paths, sink)
    };
    if let Some(pb) = bar {
        pb.finish_and_clear();
    }

    let summary = generator.save(encoded)?;

    println!("{} Snapshot saved", "✓".green().bold());
    if let Some(path) = &summary.output_path {
        println!("  Output: {}", path.display().to_string().cyan());
    }
    println!("  Files: {}", summary.files_admitted.to_string().cyan());
    println!("  Size: {}", format_bytes(summary.total_size).cyan());
    println!("  Checksum: {}", summary.global_checksum.yellow());
    println!("  Time: {}", format_duration(start.elapsed()).to_string().cyan());

    if !summary.skipped.is_empty() {
        println!("  Skipped: {} files", summary.skipped.len().to_string().yellow());
        if verbose {
            for (path, reason) in &summary.skipped {
                println!("    - {} ({})", path, reason.to_string().dimmed());
            }
        }
    }

    Ok(())
}

/// Verify and restore a snapshot
///
/// The format is chosen from the first line: `CRYPTIC-SNAPSHOT-V1` selects
/// the cryptic decoder, anything else is read as Markdown.
fn cmd_restore(
    archive: &Path,
    output: &Path,
    verify_only: bool,
    show_progress: bool,
) -> Result<()> {
    if !archive.exists() {
        return Err(ContextGenError::NotFound(archive.to_path_buf()));
    }
    let content = fs::read_to_string(archive)?;
    let is_cryptic = content
        .lines()
        .next()
        .is_some_and(|line| line.trim_end() == VERSION_TAG);

    let action = if verify_only { "Verifying" } else { "Restoring" };
    println!(
        "{} {}",
        format!("{} snapshot", action).blue().bold(),
        archive.display().to_string().yellow()
    );

    let start = Instant::now();
    let bar = show_progress.then(|| {
        if is_cryptic {
            match cryptic::validate_str(&content).file_count {
                Some(count) => progress_bar(count as u64),
                None => spinner("Writing files..."),
            }
        } else {
            spinner("Writing files...")
        }
    });
    let sink = bar.as_ref().map(|pb| pb as &dyn Progress);

    let (file_count, files_restored, global_checksum) = if is_cryptic {
        let report = restore_cryptic(&content, output, DecodeOptions { verify_only }, sink)?;
        (report.file_count, report.files_restored, report.global_checksum)
    } else if verify_only {
        let archive = markdown::decode(&content)?;
        (archive.len(), 0, archive.global_checksum().to_string())
    } else {
        let archive = restore_markdown(&content, output, sink)?;
        (archive.len(), archive.len(), archive.global_checksum().to_string())
    };

    if let Some(pb) = bar {
        pb.finish_and_clear();
    }

    if verify_only {
        println!("{} Snapshot verified, nothing written", "✓".green().bold());
        println!("  Files: {}", file_count.to_string().cyan());
    } else {
        println!("{} Restoration complete", "✓".green().bold());
        println!("  Files restored: {}", files_restored.to_string().cyan());
        println!("  Target: {}", output.display().to_string().cyan());
    }
    println!("  Checksum: {}", global_checksum.yellow());
    println!("  Time: {}", format_duration(start.elapsed()).to_string().cyan());

    Ok(())
}

/// Inspect a cryptic snapshot header
fn cmd_validate(archive: &Path) -> Result<()> {
    let report = cryptic::validate_format(archive);

    if !report.is_valid {
        let reason = report.error.unwrap_or_else(|| "unknown error".to_string());
        eprintln!("{}: {}", "Error".red().bold(), reason);
        std::process::exit(1);
    }

    println!("{} Valid cryptic snapshot", "✓".green().bold());
    if let Some(count) = report.file_count {
        println!("  Files: {}", count.to_string().cyan());
    }
    if let Some(level) = report.compression_level {
        println!("  Compression level: {}", level.to_string().cyan());
    }
    if let Some(checksum) = &report.global_checksum {
        println!("  Checksum: {}", checksum.yellow());
    }
    println!(
        "  Encoded data: {}",
        if report.has_encoded_data { "present".green() } else { "missing".red() }
    );

    Ok(())
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} {pos}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb
}
