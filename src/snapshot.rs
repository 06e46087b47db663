//! Top-level snapshot and restore drivers
//!
//! [`ContextGen`] ties the pieces together for one source directory: it lists
//! files with [`FileWalker`], captures them under an [`AdmissionPolicy`],
//! renders either container, and writes the result next to the sources.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use contextgen::{ContextGenBuilder, restore_markdown};
//! use std::path::Path;
//!
//! # fn main() -> contextgen::Result<()> {
//! let generator = ContextGenBuilder::new()
//!     .max_file_size(512 * 1024)
//!     .ignore_patterns(vec!["target/".to_string()])
//!     .build("./my_project")?;
//!
//! let summary = generator.snapshot_markdown(None)?;
//! println!("Captured {} files", summary.files_admitted);
//!
//! let document = std::fs::read_to_string(generator.output_path())?;
//! restore_markdown(&document, Path::new("./restored"), None)?;
//! # Ok(())
//! # }
//! ```

use crate::admission::AdmissionPolicy;
use crate::compression::DEFAULT_COMPRESSION_LEVEL;
use crate::cryptic;
use crate::error::{ContextGenError, Result};
use crate::markdown;
use crate::types::{Archive, DecodeOptions, DecodeReport, Encoded, Progress, SnapshotSummary};
use crate::utils;
use crate::walker::FileWalker;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default output file for Markdown snapshots
pub const DEFAULT_MARKDOWN_OUTPUT: &str = "__aicontextgen.md";
/// Default output file for cryptic snapshots
pub const DEFAULT_CRYPTIC_OUTPUT: &str = "__aicontextgen.cryptic";

/// Snapshot generator for one source directory
///
/// Created through [`ContextGenBuilder`].
#[derive(Debug, Clone)]
pub struct ContextGen {
    root: PathBuf,
    output_filename: String,
    policy: AdmissionPolicy,
    compression_level: u32,
    walker: FileWalker,
}

impl ContextGen {
    /// Source directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where snapshots are written: the output filename under the root
    pub fn output_path(&self) -> PathBuf {
        self.root.join(&self.output_filename)
    }

    /// Admission policy applied while capturing
    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    /// List snapshot candidates under the root in walk order
    pub fn list_files(&self, progress: Option<&dyn Progress>) -> Result<Vec<String>> {
        self.walker.list(&self.root, progress)
    }

    /// Capture `paths` in the order given and render a Markdown snapshot
    pub fn render_markdown(&self, paths: &[String], progress: Option<&dyn Progress>) -> Encoded {
        markdown::encode(&self.root, paths, &self.policy, progress)
    }

    /// Capture `paths` in lexicographic order and render a cryptic snapshot
    pub fn render_cryptic(
        &self,
        paths: &[String],
        progress: Option<&dyn Progress>,
    ) -> Result<Encoded> {
        let mut sorted = paths.to_vec();
        sorted.sort();
        cryptic::encode(
            &self.root,
            &sorted,
            &self.policy,
            self.compression_level,
            progress,
        )
    }

    /// Write a rendered snapshot to [`output_path`](Self::output_path)
    pub fn save(&self, encoded: Encoded) -> Result<SnapshotSummary> {
        let output_path = self.output_path();
        utils::atomic_write(&output_path, encoded.document.as_bytes())?;
        info!(
            "Snapshot saved to {:?}: {} files, {} skipped",
            output_path,
            encoded.archive.len(),
            encoded.skipped.len()
        );
        Ok(SnapshotSummary {
            output_path: Some(output_path),
            files_admitted: encoded.archive.len(),
            global_checksum: encoded.archive.global_checksum().to_string(),
            total_size: encoded.archive.total_size(),
            skipped: encoded.skipped,
        })
    }

    /// List, capture and write a Markdown snapshot
    ///
    /// One progress unit is signalled per captured path.
    pub fn snapshot_markdown(&self, progress: Option<&dyn Progress>) -> Result<SnapshotSummary> {
        let paths = self.list_files(None)?;
        let encoded = self.render_markdown(&paths, progress);
        self.save(encoded)
    }

    /// List, capture and write a cryptic snapshot
    ///
    /// One progress unit is signalled per captured path.
    pub fn snapshot_cryptic(&self, progress: Option<&dyn Progress>) -> Result<SnapshotSummary> {
        let paths = self.list_files(None)?;
        let encoded = self.render_cryptic(&paths, progress)?;
        self.save(encoded)
    }
}

/// Builder for [`ContextGen`]
///
/// Defaults: output `__aicontextgen.md`, 1 MiB size limit, the standard
/// binary extension skip list, gzip level 6, no extra ignore patterns.
#[derive(Debug, Clone)]
pub struct ContextGenBuilder {
    output_filename: String,
    policy: AdmissionPolicy,
    compression_level: u32,
    ignore_patterns: Vec<String>,
}

impl Default for ContextGenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextGenBuilder {
    /// Create a builder with default settings
    ///
    /// ```rust
    /// use contextgen::ContextGenBuilder;
    ///
    /// let builder = ContextGenBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            output_filename: DEFAULT_MARKDOWN_OUTPUT.to_string(),
            policy: AdmissionPolicy::default(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            ignore_patterns: Vec::new(),
        }
    }

    /// Set the output filename, relative to the source directory
    ///
    /// The output file is always excluded from the listing.
    pub fn output_filename(mut self, name: impl Into<String>) -> Self {
        self.output_filename = name.into();
        self
    }

    /// Replace the whole admission policy
    pub fn policy(mut self, policy: AdmissionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the maximum captured file size in bytes (0 = no limit)
    pub fn max_file_size(mut self, size: u64) -> Self {
        self.policy.max_size = size;
        self
    }

    /// Set the extensions to skip
    ///
    /// ```rust
    /// use contextgen::ContextGenBuilder;
    ///
    /// let builder = ContextGenBuilder::new()
    ///     .skip_extensions(vec!["png".to_string(), ".lock".to_string()]);
    /// ```
    pub fn skip_extensions(mut self, extensions: Vec<String>) -> Self {
        self.policy = AdmissionPolicy::new(self.policy.max_size, extensions);
        self
    }

    /// Set the gzip level for cryptic snapshots (1-9)
    ///
    /// Markdown snapshots ignore it.
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = level;
        self
    }

    /// Exclude extra gitignore-style patterns from the listing
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Build a generator for `root`
    ///
    /// # Errors
    ///
    /// [`ContextGenError::NotFound`] if `root` is not an existing directory.
    /// The compression level is only checked when a cryptic snapshot is
    /// rendered.
    pub fn build(self, root: impl Into<PathBuf>) -> Result<ContextGen> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ContextGenError::NotFound(root));
        }

        let walker = FileWalker::new()
            .with_output_filename(self.output_filename.clone())
            .with_ignore_patterns(self.ignore_patterns);

        Ok(ContextGen {
            root,
            output_filename: self.output_filename,
            policy: self.policy,
            compression_level: self.compression_level,
            walker,
        })
    }
}

/// Verify a Markdown snapshot and restore it under `target`
///
/// Returns the verified archive; every record in it was written.
pub fn restore_markdown(
    document: &str,
    target: &Path,
    progress: Option<&dyn Progress>,
) -> Result<Archive> {
    markdown::restore(document, target, progress)
}

/// Verify a cryptic snapshot and restore it under `target`, unless
/// `options.verify_only` is set
pub fn restore_cryptic(
    blob: &str,
    target: &Path,
    options: DecodeOptions,
    progress: Option<&dyn Progress>,
) -> Result<DecodeReport> {
    cryptic::decode(blob, target, options, progress)
}
