//! Directory traversal for snapshots
//!
//! Lists the regular files under a root directory using the `ignore` crate:
//!
//! - `.gitignore` files are honoured at the root and below, inside or outside
//!   a git repository (ignore files above the root, the global gitignore and
//!   `.git/info/exclude` are not read)
//! - `.ai-ignore` files use gitignore syntax and apply the same way
//! - hidden files are included
//! - `.git/`, the snapshot's own output file and any extra patterns are
//!   always excluded
//!
//! The walk is single-threaded and sorted by file name at every level, so the
//! listing is deterministic for a given tree.
//!
//! ```rust,no_run
//! use contextgen::walker::FileWalker;
//! use std::path::Path;
//!
//! # fn main() -> contextgen::Result<()> {
//! let files = FileWalker::new()
//!     .with_output_filename("__aicontextgen.md")
//!     .with_ignore_patterns(vec!["*.log".to_string()])
//!     .list(Path::new("./my_project"), None)?;
//! for path in files {
//!     println!("{}", path);
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{ContextGenError, Result};
use crate::types::{tick, Progress};
use crate::utils;
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, warn};

/// Name of the per-directory ignore file read alongside `.gitignore`
pub const AI_IGNORE_FILENAME: &str = ".ai-ignore";

/// Lists snapshot candidates under a root directory
#[derive(Debug, Clone, Default)]
pub struct FileWalker {
    output_filename: Option<String>,
    ignore_patterns: Vec<String>,
}

impl FileWalker {
    /// Create a walker with no extra exclusions
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude the snapshot output file from the listing
    pub fn with_output_filename(mut self, name: impl Into<String>) -> Self {
        self.output_filename = Some(name.into());
        self
    }

    /// Exclude paths matching extra gitignore-style patterns
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// List regular files under `root` as relative, forward-slash paths
    ///
    /// Signals one progress unit per listed file. Entries that cannot be read
    /// during the walk are logged and skipped.
    ///
    /// # Errors
    ///
    /// [`ContextGenError::NotFound`] if `root` is not a directory, or
    /// [`ContextGenError::Walk`] if an exclusion pattern cannot be compiled.
    pub fn list(&self, root: &Path, progress: Option<&dyn Progress>) -> Result<Vec<String>> {
        if !root.is_dir() {
            return Err(ContextGenError::NotFound(root.to_path_buf()));
        }
        let start = Instant::now();

        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .parents(false)
            .ignore(false)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(false)
            .require_git(false)
            .follow_links(false)
            .threads(1)
            .sort_by_file_name(|a, b| a.cmp(b));
        builder.add_custom_ignore_filename(AI_IGNORE_FILENAME);

        // Override globs prefixed with `!` exclude matches.
        let mut overrides = OverrideBuilder::new(root);
        overrides.add("!.git/")?;
        if let Some(output) = &self.output_filename {
            overrides.add(&format!("!{}", output))?;
        }
        for pattern in &self.ignore_patterns {
            let pattern = pattern.trim_start_matches('!');
            if pattern.is_empty() {
                continue;
            }
            overrides.add(&format!("!{}", pattern))?;
        }
        builder.overrides(overrides.build()?);

        let mut files = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Walk error: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            match utils::to_archive_path(entry.path(), root) {
                Some(relative) => {
                    files.push(relative);
                    tick(progress);
                }
                None => warn!("Skipping non UTF-8 path {:?}", entry.path()),
            }
        }

        debug!("Listed {} files under {:?} in {:?}", files.len(), root, start.elapsed());
        Ok(files)
    }
}
