//! File admission policy
//!
//! Decides, per path, whether a file is captured into a snapshot. Files are
//! rejected when they exceed the size limit or carry an extension on the skip
//! list (binary formats by default). Files that cannot be read as UTF-8 text
//! are skipped as unreadable rather than aborting the whole snapshot.

use crate::types::{tick, FileRecord, Outcome, Progress, SkipReason};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, trace};

/// Default size limit: 1 MiB
pub const DEFAULT_MAX_SIZE: u64 = 1024 * 1024;

/// Extensions skipped by default (binary and media formats)
pub const DEFAULT_SKIP_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".exe", ".dll", ".zip", ".tar", ".gz",
    ".mp4", ".mp3", ".ogg", ".mov", ".pdf", ".webp", ".woff", ".woff2", ".ttf", ".eot", ".otf",
];

/// Admission decision for a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Capture the file
    Admit,
    /// Leave the file out
    Reject(SkipReason),
}

/// Size and extension rules for capturing files
///
/// # Examples
///
/// ```rust
/// use contextgen::admission::{Admission, AdmissionPolicy};
///
/// let policy = AdmissionPolicy::new(1024, vec![".png".to_string()]);
/// assert_eq!(policy.check("notes.txt", 1024), Admission::Admit);
/// assert!(matches!(policy.check("notes.txt", 1025), Admission::Reject(_)));
/// assert!(matches!(policy.check("logo.PNG", 10), Admission::Reject(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionPolicy {
    /// Maximum file size in bytes (0 = unlimited)
    pub max_size: u64,
    /// Extensions to skip, with leading dot (e.g. `.png`)
    pub skip_extensions: Vec<String>,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            skip_extensions: DEFAULT_SKIP_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AdmissionPolicy {
    /// Create a policy from a size limit and skip list
    ///
    /// Extensions are normalized to lowercase with a leading dot, so `PNG`,
    /// `.png` and `.PNG` are equivalent.
    pub fn new(max_size: u64, skip_extensions: Vec<String>) -> Self {
        let skip_extensions = skip_extensions
            .into_iter()
            .map(|ext| {
                let ext = ext.to_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{}", ext)
                }
            })
            .collect();
        Self { max_size, skip_extensions }
    }

    /// Decide whether a file of `size` bytes at `path` is admitted
    pub fn check(&self, path: &str, size: u64) -> Admission {
        if self.max_size > 0 && size > self.max_size {
            return Admission::Reject(SkipReason::TooLarge {
                size,
                limit: self.max_size,
            });
        }

        if let Some(ext) = extension_of(path) {
            if self.skip_extensions.iter().any(|skip| *skip == ext) {
                return Admission::Reject(SkipReason::ExcludedExtension(ext));
            }
        }

        Admission::Admit
    }

    /// Stat, check and read one file under `root`
    ///
    /// Never fails: unreadable files come back as [`Outcome::Skipped`].
    pub fn capture(&self, root: &Path, relative: &str) -> Outcome {
        let full_path = root.join(relative);

        let size = match fs::metadata(&full_path) {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                debug!("Cannot stat {:?}: {}", full_path, e);
                return skipped(relative, SkipReason::Unreadable(e.to_string()));
            }
        };

        if let Admission::Reject(reason) = self.check(relative, size) {
            trace!("Skipping {}: {}", relative, reason);
            return skipped(relative, reason);
        }

        match fs::read_to_string(&full_path) {
            Ok(content) => {
                let mut record = FileRecord::new(relative, content);
                record.size = size;
                Outcome::Admitted(record)
            }
            Err(e) => {
                debug!("Cannot read {:?} as text: {}", full_path, e);
                skipped(relative, SkipReason::Unreadable(e.to_string()))
            }
        }
    }

    /// Capture every path in the order given, signalling one progress unit per path
    pub fn capture_all(
        &self,
        root: &Path,
        paths: &[String],
        progress: Option<&dyn Progress>,
    ) -> Vec<Outcome> {
        paths
            .iter()
            .map(|path| {
                let outcome = self.capture(root, path);
                tick(progress);
                outcome
            })
            .collect()
    }
}

fn skipped(path: &str, reason: SkipReason) -> Outcome {
    Outcome::Skipped {
        path: path.to_string(),
        reason,
    }
}

/// Lowercased extension with its leading dot, if the file name has one
fn extension_of(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}
