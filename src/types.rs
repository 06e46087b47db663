//! Core data types shared by both container formats
//!
//! ## Overview
//!
//! - **Captured state**: [`FileRecord`], [`Archive`], [`ArchiveMetadata`]
//! - **Capture decisions**: [`Outcome`], [`SkipReason`]
//! - **Operation results**: [`DecodeReport`], [`FormatReport`], [`SnapshotSummary`]
//! - **Progress**: the [`Progress`] sink passed explicitly into encode/decode
//!
//! ```rust
//! use contextgen::types::{Archive, FileRecord};
//!
//! let archive = Archive::new(vec![
//!     FileRecord::new("src/main.rs", "fn main() {}\n"),
//!     FileRecord::new("README.md", "# Demo\n"),
//! ]);
//! assert_eq!(archive.len(), 2);
//! archive.verify().unwrap();
//! ```

use crate::checksum;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Schema version written into cryptic payload metadata
pub const PAYLOAD_VERSION: &str = "1.0";

/// A captured file: its relative path, text content and content checksum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Relative, forward-slash path; the restore target
    pub path: String,
    /// Text content exactly as read
    pub content: String,
    /// SHA-256 hex digest of `content`
    pub checksum: String,
    /// Size in bytes as reported by the filesystem at capture time
    pub size: u64,
}

impl FileRecord {
    /// Create a record, computing the checksum and size from `content`
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            checksum: checksum::digest(content.as_bytes()),
            size: content.len() as u64,
            content,
        }
    }

    /// Language tag for a Markdown fence: the extension without its dot
    pub fn language_tag(&self) -> &str {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[idx + 1..],
            _ => "",
        }
    }

    /// Verify that the content still hashes to the recorded checksum
    pub fn verify(&self) -> Result<()> {
        checksum::verify_content(&self.path, &self.checksum, &self.content)
    }
}

/// Ordered set of captured records plus their global checksum
///
/// Record order is significant: it is part of the global checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    files: Vec<FileRecord>,
    global_checksum: String,
}

impl Archive {
    /// Build an archive from records, preserving their order
    pub fn new(files: Vec<FileRecord>) -> Self {
        let global_checksum = checksum::global_checksum(
            files.iter().map(|f| (f.path.as_str(), f.checksum.as_str())),
        );
        Self { files, global_checksum }
    }

    /// Build an archive from capture outcomes, keeping admitted records in order
    ///
    /// Returns the archive and the skipped paths with their reasons.
    pub fn from_outcomes(outcomes: Vec<Outcome>) -> (Self, Vec<(String, SkipReason)>) {
        let mut files = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                Outcome::Admitted(record) => files.push(record),
                Outcome::Skipped { path, reason } => skipped.push((path, reason)),
            }
        }
        (Self::new(files), skipped)
    }

    /// Records in archive order
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// Archive-level checksum over every `path:checksum` pair
    pub fn global_checksum(&self) -> &str {
        &self.global_checksum
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the archive holds no records
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sum of the captured sizes
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Re-verify every record and then the global checksum
    pub fn verify(&self) -> Result<()> {
        for file in &self.files {
            file.verify()?;
        }
        checksum::verify_global(
            &self.global_checksum,
            self.files.iter().map(|f| (f.path.as_str(), f.checksum.as_str())),
        )
    }
}

/// Why a path was left out of an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// File is larger than the configured limit
    TooLarge {
        /// Actual size in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },
    /// Extension is on the skip list (stored with its leading dot, lowercased)
    ExcludedExtension(String),
    /// File could not be stat'ed or read as UTF-8 text
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooLarge { size, limit } => write!(
                f,
                "file too large, {} bytes exceeds limit of {} bytes",
                size, limit
            ),
            SkipReason::ExcludedExtension(ext) => write!(f, "extension `{}` not supported", ext),
            SkipReason::Unreadable(reason) => write!(f, "unreadable, {}", reason),
        }
    }
}

/// Result of capturing one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// File was read and checksummed
    Admitted(FileRecord),
    /// File was left out
    Skipped {
        /// Relative path of the skipped file
        path: String,
        /// Why it was skipped
        reason: SkipReason,
    },
}

impl Outcome {
    /// Relative path this outcome refers to
    pub fn path(&self) -> &str {
        match self {
            Outcome::Admitted(record) => &record.path,
            Outcome::Skipped { path, .. } => path,
        }
    }
}

/// Archive-level metadata stored inside the cryptic payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    /// Payload schema version
    #[serde(default = "default_version")]
    pub version: String,
    /// Capture timestamp
    pub generated: DateTime<Utc>,
    /// Absolute source directory at capture time (informational)
    pub source_directory: String,
    /// Number of file records
    pub file_count: usize,
    /// Gzip level the payload was compressed with
    pub compression_level: u32,
    /// Sum of admitted file sizes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size_original: Option<u64>,
    /// Size in bytes of the gzip stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size_compressed: Option<u64>,
}

fn default_version() -> String {
    PAYLOAD_VERSION.to_string()
}

/// Options for decoding a cryptic archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Run every integrity check but write nothing
    pub verify_only: bool,
}

/// Result of decoding a cryptic archive
#[derive(Debug, Clone)]
pub struct DecodeReport {
    /// Whether this was a verify-only run
    pub verify_only: bool,
    /// Number of records in the archive
    pub file_count: usize,
    /// Number of files written (0 in verify-only mode)
    pub files_restored: usize,
    /// Metadata carried by the payload
    pub metadata: ArchiveMetadata,
    /// Verified global checksum
    pub global_checksum: String,
}

/// Result of a header-only format check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatReport {
    /// Whether the header parsed and a payload is present
    pub is_valid: bool,
    /// `FILE-COUNT` header value
    pub file_count: Option<usize>,
    /// `COMPRESSION-LEVEL` header value
    pub compression_level: Option<u32>,
    /// `GLOBAL-CHECKSUM` header value
    pub global_checksum: Option<String>,
    /// Whether a non-empty payload follows the header
    pub has_encoded_data: bool,
    /// Why validation failed
    pub error: Option<String>,
}

/// A rendered container together with the archive it carries
#[derive(Debug, Clone)]
pub struct Encoded {
    /// The container text (Markdown document or cryptic blob)
    pub document: String,
    /// Admitted records, in container order
    pub archive: Archive,
    /// Paths left out, with reasons
    pub skipped: Vec<(String, SkipReason)>,
}

/// Result of writing a snapshot
#[derive(Debug, Clone)]
pub struct SnapshotSummary {
    /// Where the snapshot was written, if it was written
    pub output_path: Option<PathBuf>,
    /// Number of files captured
    pub files_admitted: usize,
    /// Paths left out, with reasons
    pub skipped: Vec<(String, SkipReason)>,
    /// Archive-level checksum
    pub global_checksum: String,
    /// Sum of captured file sizes
    pub total_size: u64,
}

/// Sink receiving one signal per processed item
///
/// Encoders signal once per path (admitted or skipped); decoders signal once
/// per file written.
pub trait Progress {
    /// Record one completed unit of work
    fn increment(&self);
}

impl Progress for indicatif::ProgressBar {
    fn increment(&self) {
        self.inc(1);
    }
}

impl<F: Fn()> Progress for F {
    fn increment(&self) {
        self()
    }
}

/// Signal one unit on an optional sink
pub(crate) fn tick(progress: Option<&dyn Progress>) {
    if let Some(progress) = progress {
        progress.increment();
    }
}
