//! Checksum primitives shared by both container formats
//!
//! Integrity is layered:
//!
//! 1. **File level**: every record carries the SHA-256 of its content.
//! 2. **Archive level**: the global checksum hashes the ordered listing of
//!    `path:checksum` pairs, one per line, each line newline-terminated.
//!
//! Reordering records, renaming a path, or changing any content checksum all
//! change the global checksum.
//!
//! ```rust
//! use contextgen::checksum;
//!
//! let sum = checksum::digest(b"Hello World");
//! assert_eq!(sum.len(), 64);
//!
//! let global = checksum::global_checksum([("a.txt", sum.as_str())]);
//! assert_ne!(global, sum);
//! ```

use crate::error::{ContextGenError, Result};
use sha2::{Digest, Sha256};
use tracing::trace;

/// Hash arbitrary data using SHA-256
///
/// Returns the digest as a 64-character lowercase hexadecimal string.
pub fn digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute the archive-level checksum over ordered `(path, checksum)` pairs
///
/// Each pair contributes `"{path}:{checksum}\n"` to the hashed input. An empty
/// archive hashes the empty string.
pub fn global_checksum<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut hasher = Sha256::new();
    for (path, checksum) in pairs {
        hasher.update(path.as_bytes());
        hasher.update(b":");
        hasher.update(checksum.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// Verify captured content against its recorded checksum
///
/// The content is accepted if either its exact bytes or its bytes with CRLF
/// normalized to LF hash to `expected`. Editors and Markdown pipelines rewrite
/// line endings; any other change is still detected.
///
/// # Errors
///
/// [`ContextGenError::ChecksumMismatch`] naming `path`, with the digest of the
/// content as captured.
pub fn verify_content(path: &str, expected: &str, content: &str) -> Result<()> {
    let actual = digest(content.as_bytes());
    if actual == expected {
        return Ok(());
    }

    if content.contains("\r\n") {
        let normalized = content.replace("\r\n", "\n");
        if digest(normalized.as_bytes()) == expected {
            trace!("Checksum for {} matched after CRLF normalization", path);
            return Ok(());
        }
    }

    Err(ContextGenError::ChecksumMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        actual,
    })
}

/// Verify a recorded global checksum against ordered `(path, checksum)` pairs
pub fn verify_global<'a, I>(expected: &str, pairs: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let actual = global_checksum(pairs);
    if actual != expected {
        return Err(ContextGenError::GlobalChecksumMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}
