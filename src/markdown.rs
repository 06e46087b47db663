//! Markdown snapshot container
//!
//! Human-readable format: every captured file becomes a fenced code block
//! under a heading that carries its path and SHA-256 checksum, records are
//! separated by delimiter lines, and the document ends with the global
//! checksum.
//!
//! ```rust
//! use contextgen::markdown;
//! use contextgen::types::{FileRecord, Outcome};
//!
//! let outcomes = vec![Outcome::Admitted(FileRecord::new("hello.txt", "hi\n"))];
//! let document = markdown::render(&outcomes);
//!
//! let archive = markdown::decode(&document).unwrap();
//! assert_eq!(archive.files()[0].content, "hi\n");
//! ```
//!
//! Restoring verifies every record checksum and the global checksum before
//! the first file is written. Content is written exactly as captured, so a
//! document whose line endings were converted to CRLF restores CRLF files.

use crate::admission::AdmissionPolicy;
use crate::checksum;
use crate::error::{ContextGenError, Result};
use crate::markdown_parser::{self, DELIMITER, FENCE, GLOBAL_PREFIX, TITLE};
use crate::types::{tick, Archive, Encoded, FileRecord, Outcome, Progress};
use crate::utils;
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, info};

/// Capture `paths` under `root` and render them as a Markdown snapshot
///
/// Paths are captured in the order given. One progress unit is signalled per
/// path, admitted or skipped.
pub fn encode(
    root: &Path,
    paths: &[String],
    policy: &AdmissionPolicy,
    progress: Option<&dyn Progress>,
) -> Encoded {
    let outcomes = policy.capture_all(root, paths, progress);
    let document = render(&outcomes);
    let (archive, skipped) = Archive::from_outcomes(outcomes);
    debug!(
        "Rendered Markdown snapshot: {} files, {} skipped",
        archive.len(),
        skipped.len()
    );
    Encoded {
        document,
        archive,
        skipped,
    }
}

/// Render capture outcomes as a Markdown snapshot
///
/// Skipped paths get a note instead of a code block and do not contribute to
/// the global checksum.
pub fn render(outcomes: &[Outcome]) -> String {
    let mut out = String::new();
    let _ = write!(out, "{}\n\n", TITLE);

    for outcome in outcomes {
        let _ = write!(out, "{}\n\n", DELIMITER);
        match outcome {
            Outcome::Admitted(record) => {
                let _ = write!(
                    out,
                    "{}\n\n{}{}\n{}\n{}\n\n",
                    markdown_parser::heading(&record.path, Some(&record.checksum)),
                    FENCE,
                    record.language_tag(),
                    record.content,
                    FENCE
                );
            }
            Outcome::Skipped { path, reason } => {
                let _ = write!(
                    out,
                    "{}\n\n_(Skipped: {})_\n\n",
                    markdown_parser::heading(path, None),
                    reason
                );
            }
        }
    }

    let global = checksum::global_checksum(outcomes.iter().filter_map(|o| match o {
        Outcome::Admitted(record) => Some((record.path.as_str(), record.checksum.as_str())),
        Outcome::Skipped { .. } => None,
    }));
    let _ = write!(out, "{}\n\n{}{}\n", DELIMITER, GLOBAL_PREFIX, global);
    out
}

/// Parse and verify a Markdown snapshot
///
/// Records carrying a heading checksum are verified against their content
/// (as captured, or with CRLF normalized to LF). The global checksum, when
/// present, is verified over the `path:checksum` pairs in document order.
/// Documents without any checksum are accepted as-is.
///
/// # Errors
///
/// - [`ContextGenError::InvalidDocument`] for an unterminated code block
/// - [`ContextGenError::ChecksumMismatch`] naming the first corrupt record
/// - [`ContextGenError::GlobalChecksumMismatch`] if the trailing line disagrees
pub fn decode(document: &str) -> Result<Archive> {
    let parsed = markdown_parser::parse(document)?;
    let verify = parsed.has_checksums();
    if !verify {
        debug!("Snapshot carries no checksums, skipping verification");
    }

    let mut files = Vec::with_capacity(parsed.records.len());
    for record in parsed.records {
        let checksum = match record.checksum {
            Some(expected) => {
                checksum::verify_content(&record.path, &expected, &record.content)?;
                expected
            }
            None => checksum::digest(record.content.as_bytes()),
        };
        files.push(FileRecord {
            size: record.content.len() as u64,
            path: record.path,
            content: record.content,
            checksum,
        });
    }

    let archive = Archive::new(files);
    if let Some(expected) = parsed.global_checksum.as_deref() {
        if expected != archive.global_checksum() {
            return Err(ContextGenError::GlobalChecksumMismatch {
                expected: expected.to_string(),
                actual: archive.global_checksum().to_string(),
            });
        }
    }

    Ok(archive)
}

/// Verify a Markdown snapshot and write its files under `target_dir`
///
/// Nothing is written unless the whole document parses and verifies, and
/// every path stays inside `target_dir`. Existing files are overwritten. One
/// progress unit is signalled per file written.
///
/// Returns the verified archive that was written.
pub fn restore(
    document: &str,
    target_dir: &Path,
    progress: Option<&dyn Progress>,
) -> Result<Archive> {
    let archive = decode(document)?;

    let targets = archive
        .files()
        .iter()
        .map(|file| utils::safe_join(target_dir, &file.path))
        .collect::<Result<Vec<_>>>()?;

    for (file, target) in archive.files().iter().zip(&targets) {
        utils::write_creating_parents(target, file.content.as_bytes())?;
        tick(progress);
    }

    info!("Restored {} files into {:?}", targets.len(), target_dir);
    Ok(archive)
}
