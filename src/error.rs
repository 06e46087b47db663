//! Error types for the contextgen library
//!
//! Every failure that can occur while capturing or restoring a snapshot is a
//! variant of [`ContextGenError`]. Variants are grouped into broad categories
//! ([`ErrorKind`]) so callers can tell a corrupt file apart from an archive
//! whose framing was tampered with, without matching every variant.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the contextgen library
pub type Result<T> = std::result::Result<T, ContextGenError>;

/// Broad category of a [`ContextGenError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed container: bad version tag, missing markers or fields
    Format,
    /// Base64, decompression or payload parsing failure
    Decode,
    /// Checksum, file count or header/payload disagreement
    Integrity,
    /// Invalid encode-time settings
    Policy,
    /// Filesystem failures
    Io,
}

/// Main error type for all contextgen operations
#[derive(Debug, Error)]
pub enum ContextGenError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors serializing the cryptic payload
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input directory or archive does not exist
    #[error("Not found: {0:?}")]
    NotFound(PathBuf),

    /// Directory traversal error from the ignore crate
    #[error("Walk directory error: {0}")]
    Walk(String),

    /// Malformed container
    #[error("Invalid cryptic file format: {0}")]
    InvalidFormat(String),

    /// Malformed Markdown snapshot
    #[error("Invalid Markdown snapshot: {0}")]
    InvalidDocument(String),

    /// Record path would escape the restore directory
    #[error("Unsafe path in archive: {0}")]
    UnsafePath(String),

    /// Payload is not valid base64
    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(String),

    /// Payload decoded but is not a gzip stream
    #[error("Invalid compressed data: not a valid gzip stream ({0})")]
    InvalidCompressedStream(String),

    /// Decompressed payload is not the expected JSON structure
    #[error("Invalid JSON data after decompression: {0}")]
    InvalidPayload(String),

    /// Any other decoding failure
    #[error("Decoding failed: {0}")]
    DecodeFailed(String),

    /// Number of records disagrees with the metadata
    #[error("File count mismatch: expected {expected}, got {actual}")]
    FileCountMismatch {
        /// Count declared by the metadata
        expected: usize,
        /// Number of records actually present
        actual: usize,
    },

    /// A record's content does not hash to its recorded checksum
    #[error("File checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Path of the offending record
        path: String,
        /// Checksum recorded in the archive
        expected: String,
        /// Checksum computed from the captured content
        actual: String,
    },

    /// The archive-level checksum does not match its records
    #[error("Global checksum verification failed: expected {expected}, got {actual}")]
    GlobalChecksumMismatch {
        /// Checksum recorded in the archive
        expected: String,
        /// Checksum recomputed from the records
        actual: String,
    },

    /// The plaintext header disagrees with the compressed payload
    #[error("Header {field} mismatch: header says {header}, data says {payload}")]
    HeaderMismatch {
        /// Header field that disagrees
        field: &'static str,
        /// Value found in the header
        header: String,
        /// Value found in the payload
        payload: String,
    },

    /// Compression level outside 1-9
    #[error("Compression level must be between 1 and 9, got {0}")]
    InvalidCompressionLevel(u32),
}

impl From<ignore::Error> for ContextGenError {
    fn from(err: ignore::Error) -> Self {
        ContextGenError::Walk(err.to_string())
    }
}

impl ContextGenError {
    /// Create a format error with a custom message
    pub fn format(msg: impl Into<String>) -> Self {
        ContextGenError::InvalidFormat(msg.into())
    }

    /// Category this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContextGenError::InvalidFormat(_)
            | ContextGenError::InvalidDocument(_)
            | ContextGenError::UnsafePath(_) => ErrorKind::Format,
            ContextGenError::InvalidBase64(_)
            | ContextGenError::InvalidCompressedStream(_)
            | ContextGenError::InvalidPayload(_)
            | ContextGenError::DecodeFailed(_) => ErrorKind::Decode,
            ContextGenError::FileCountMismatch { .. }
            | ContextGenError::ChecksumMismatch { .. }
            | ContextGenError::GlobalChecksumMismatch { .. }
            | ContextGenError::HeaderMismatch { .. } => ErrorKind::Integrity,
            ContextGenError::InvalidCompressionLevel(_) => ErrorKind::Policy,
            ContextGenError::Io(_)
            | ContextGenError::Json(_)
            | ContextGenError::NotFound(_)
            | ContextGenError::Walk(_) => ErrorKind::Io,
        }
    }

    /// Check if this error means a single file's content is corrupt
    pub fn is_corruption(&self) -> bool {
        matches!(self, ContextGenError::ChecksumMismatch { .. })
    }

    /// Check if this error means the archive as a whole was altered or mismatched
    pub fn is_tampering(&self) -> bool {
        matches!(
            self,
            ContextGenError::GlobalChecksumMismatch { .. }
                | ContextGenError::FileCountMismatch { .. }
                | ContextGenError::HeaderMismatch { .. }
        )
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            ContextGenError::ChecksumMismatch { path, .. } => {
                format!(
                    "File '{}' is corrupt: its content does not match the recorded checksum. \
                     The archive was modified after it was generated.",
                    path
                )
            }
            ContextGenError::GlobalChecksumMismatch { .. }
            | ContextGenError::FileCountMismatch { .. } => {
                format!(
                    "The archive was tampered with or truncated ({}). Regenerate the snapshot.",
                    self
                )
            }
            ContextGenError::HeaderMismatch { field, .. } => {
                format!(
                    "The archive header ({}) was edited independently of its payload. \
                     Regenerate the snapshot.",
                    field
                )
            }
            ContextGenError::NotFound(path) => {
                format!("{:?} does not exist. Check the path and try again.", path)
            }
            _ => self.to_string(),
        }
    }
}
