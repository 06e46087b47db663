//! # contextgen - Portable, verifiable codebase snapshots
//!
//! Packs a directory tree of source files into a single text artifact and
//! restores it bit-for-bit, for moving a codebase through channels with no
//! filesystem access (chat windows, issue trackers, clipboards).
//!
//! ## Overview
//!
//! Two container formats share one integrity model:
//!
//! - **Markdown** ([`markdown`]): one fenced code block per file under a
//!   heading carrying its SHA-256 checksum, readable by humans and language
//!   models alike
//! - **Cryptic** ([`cryptic`]): a short plaintext header followed by a
//!   gzip-compressed, base64-encoded JSON payload
//!
//! Every file carries a SHA-256 content checksum, and the archive carries a
//! global checksum over the ordered `path:checksum` pairs. Decoding verifies
//! both levels before the first file is written.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use contextgen::{ContextGenBuilder, DecodeOptions, restore_cryptic};
//! use std::path::Path;
//!
//! # fn main() -> contextgen::Result<()> {
//! let generator = ContextGenBuilder::new()
//!     .output_filename("__aicontextgen.cryptic")
//!     .compression_level(9)
//!     .build("./my_project")?;
//! let summary = generator.snapshot_cryptic(None)?;
//! println!("{} files, checksum {}", summary.files_admitted, summary.global_checksum);
//!
//! let blob = std::fs::read_to_string(generator.output_path())?;
//! let report = restore_cryptic(&blob, Path::new("./restored"), DecodeOptions::default(), None)?;
//! println!("Restored {} files", report.files_restored);
//! # Ok(())
//! # }
//! ```
//!
//! ## Capture rules
//!
//! Files are listed by [`walker::FileWalker`], honouring `.gitignore` and
//! `.ai-ignore` and always skipping `.git/` and the snapshot itself. Each
//! listed file then passes through an [`AdmissionPolicy`]: files over the size
//! limit (1 MiB by default), files with a binary extension and files that are
//! not valid UTF-8 are skipped and reported, never fatal.
//!
//! ## Error Handling
//!
//! All operations return `Result<T, ContextGenError>`. Errors are grouped by
//! [`ErrorKind`]; [`ContextGenError::is_corruption`] and
//! [`ContextGenError::is_tampering`] separate damaged file content from an
//! archive whose framing disagrees with its payload.
//!
//! ## Module Organization
//!
//! - [`snapshot`]: top-level drivers and builder
//! - [`markdown`] / [`markdown_parser`]: Markdown container
//! - [`cryptic`] / [`compression`]: cryptic container and its payload codec
//! - [`checksum`]: per-file and global checksums
//! - [`admission`]: size and extension rules
//! - [`walker`]: directory traversal
//! - [`types`]: shared data types
//! - [`error`]: error types

pub mod admission;
pub mod checksum;
pub mod compression;
pub mod cryptic;
pub mod error;
pub mod markdown;
pub mod markdown_parser;
pub mod snapshot;
pub mod types;
pub mod utils;
pub mod walker;

pub use admission::{Admission, AdmissionPolicy};
pub use error::{ContextGenError, ErrorKind, Result};
pub use snapshot::{restore_cryptic, restore_markdown, ContextGen, ContextGenBuilder};
pub use types::*;
