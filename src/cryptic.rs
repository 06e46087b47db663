//! Cryptic snapshot container
//!
//! Machine-oriented format: a five-line plaintext header followed by a single
//! base64 payload holding every record and the archive metadata.
//!
//! ```text
//! CRYPTIC-SNAPSHOT-V1
//! GLOBAL-CHECKSUM: <hex64>
//! COMPRESSION-LEVEL: <1-9>
//! FILE-COUNT: <n>
//! ---HEADER-END---
//! <base64 of gzip of JSON {metadata, files, global_checksum}>
//! ```
//!
//! Each file in the payload carries its path, checksum, size and base64
//! content. The header duplicates the checksum, level and count so a reader
//! can size a progress bar without decompressing ([`validate_format`]), and
//! decoding rejects a header edited independently of its payload.
//!
//! ## Decoding
//!
//! Decoding is strictly sequential: parse header, extract payload, decode and
//! decompress, verify every checksum, check the header against the payload,
//! and only then write files. A failure at any stage leaves the filesystem
//! untouched.

use crate::admission::AdmissionPolicy;
use crate::checksum;
use crate::compression::{self, decode_base64};
use crate::error::{ContextGenError, Result};
use crate::types::{
    tick, Archive, ArchiveMetadata, DecodeOptions, DecodeReport, Encoded, FileRecord,
    FormatReport, Progress, PAYLOAD_VERSION,
};
use crate::utils;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// First line of every cryptic snapshot
pub const VERSION_TAG: &str = "CRYPTIC-SNAPSHOT-V1";
/// Line terminating the header
pub const HEADER_END: &str = "---HEADER-END---";

const KEY_GLOBAL_CHECKSUM: &str = "GLOBAL-CHECKSUM";
const KEY_COMPRESSION_LEVEL: &str = "COMPRESSION-LEVEL";
const KEY_FILE_COUNT: &str = "FILE-COUNT";

/// Parsed plaintext header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrypticHeader {
    /// `GLOBAL-CHECKSUM` value
    pub global_checksum: String,
    /// `COMPRESSION-LEVEL` value
    pub compression_level: u32,
    /// `FILE-COUNT` value
    pub file_count: usize,
}

impl CrypticHeader {
    fn render(&self) -> String {
        format!(
            "{}\n{}: {}\n{}: {}\n{}: {}\n{}",
            VERSION_TAG,
            KEY_GLOBAL_CHECKSUM,
            self.global_checksum,
            KEY_COMPRESSION_LEVEL,
            self.compression_level,
            KEY_FILE_COUNT,
            self.file_count,
            HEADER_END
        )
    }
}

/// A file record as stored in the payload
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PayloadFile {
    path: String,
    checksum: String,
    #[serde(default)]
    size: u64,
    /// Base64 of the raw content bytes
    content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Payload {
    metadata: ArchiveMetadata,
    files: Vec<PayloadFile>,
    global_checksum: String,
}

/// A fully verified cryptic snapshot
#[derive(Debug, Clone)]
pub struct DecodedArchive {
    /// Plaintext header
    pub header: CrypticHeader,
    /// Payload metadata
    pub metadata: ArchiveMetadata,
    /// Verified records in payload order
    pub archive: Archive,
}

/// Capture `paths` under `root` and render them as a cryptic snapshot
///
/// Paths are captured in the order given; unreadable, oversized and excluded
/// files are skipped. One progress unit is signalled per path.
///
/// # Errors
///
/// [`ContextGenError::InvalidCompressionLevel`] if `compression_level` is
/// outside 1-9.
pub fn encode(
    root: &Path,
    paths: &[String],
    policy: &AdmissionPolicy,
    compression_level: u32,
    progress: Option<&dyn Progress>,
) -> Result<Encoded> {
    let outcomes = policy.capture_all(root, paths, progress);
    let (archive, skipped) = Archive::from_outcomes(outcomes);

    let source_directory = root
        .canonicalize()
        .unwrap_or_else(|_| root.to_path_buf())
        .display()
        .to_string();
    let document = render(&archive, &source_directory, compression_level, Utc::now())?;

    Ok(Encoded {
        document,
        archive,
        skipped,
    })
}

/// Render an archive as a cryptic snapshot
///
/// The payload is generated twice: once to measure the compressed size, and
/// again with that size recorded in the metadata.
pub fn render(
    archive: &Archive,
    source_directory: &str,
    compression_level: u32,
    generated: DateTime<Utc>,
) -> Result<String> {
    let mut payload = Payload {
        metadata: ArchiveMetadata {
            version: PAYLOAD_VERSION.to_string(),
            generated,
            source_directory: source_directory.to_string(),
            file_count: archive.len(),
            compression_level,
            total_size_original: Some(archive.total_size()),
            total_size_compressed: None,
        },
        files: archive
            .files()
            .iter()
            .map(|file| PayloadFile {
                path: file.path.clone(),
                checksum: file.checksum.clone(),
                size: file.size,
                content: STANDARD.encode(file.content.as_bytes()),
            })
            .collect(),
        global_checksum: archive.global_checksum().to_string(),
    };

    let first = compression::compress_and_encode(&payload, compression_level)?;
    payload.metadata.total_size_compressed = Some(first.compressed_len);
    let encoded = compression::compress_and_encode(&payload, compression_level)?;

    let header = CrypticHeader {
        global_checksum: archive.global_checksum().to_string(),
        compression_level,
        file_count: archive.len(),
    };

    debug!(
        "Rendered cryptic snapshot: {} files, payload {} bytes",
        archive.len(),
        encoded.text.len()
    );
    Ok(format!("{}\n{}", header.render(), encoded.text))
}

/// Split a cryptic snapshot into its header and payload text
///
/// # Errors
///
/// [`ContextGenError::InvalidFormat`] for a wrong version tag, a missing
/// header end marker, missing or non-numeric header fields, or an empty
/// payload.
pub fn parse_container(content: &str) -> Result<(CrypticHeader, String)> {
    let lines: Vec<&str> = content
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();

    if lines.first() != Some(&VERSION_TAG) {
        return Err(ContextGenError::format("missing or incorrect version header"));
    }

    let end = lines
        .iter()
        .position(|l| *l == HEADER_END)
        .ok_or_else(|| ContextGenError::format("missing header end marker"))?;

    let mut global_checksum = None;
    let mut compression_level = None;
    let mut file_count = None;

    for line in &lines[1..end] {
        let Some((key, value)) = line.split_once(": ") else {
            continue;
        };
        match key {
            KEY_GLOBAL_CHECKSUM if !value.is_empty() => global_checksum = Some(value.to_string()),
            KEY_COMPRESSION_LEVEL => {
                compression_level = Some(value.trim().parse::<u32>().map_err(|_| {
                    ContextGenError::format(format!("invalid {} value '{}'", key, value))
                })?)
            }
            KEY_FILE_COUNT => {
                file_count = Some(value.trim().parse::<usize>().map_err(|_| {
                    ContextGenError::format(format!("invalid {} value '{}'", key, value))
                })?)
            }
            _ => {}
        }
    }

    let (Some(global_checksum), Some(compression_level), Some(file_count)) =
        (global_checksum.clone(), compression_level, file_count)
    else {
        let missing: Vec<&str> = [
            (KEY_GLOBAL_CHECKSUM, global_checksum.is_none()),
            (KEY_COMPRESSION_LEVEL, compression_level.is_none()),
            (KEY_FILE_COUNT, file_count.is_none()),
        ]
        .iter()
        .filter(|(_, missing)| *missing)
        .map(|(key, _)| *key)
        .collect();
        return Err(ContextGenError::format(format!(
            "missing required header fields: {}",
            missing.join(", ")
        )));
    };

    let payload = lines[end + 1..].join("\n").trim().to_string();
    if payload.is_empty() {
        return Err(ContextGenError::format("missing encoded data"));
    }

    Ok((
        CrypticHeader {
            global_checksum,
            compression_level,
            file_count,
        },
        payload,
    ))
}

/// Decode, verify and cross-check a cryptic snapshot without writing anything
pub fn decode_archive(content: &str) -> Result<DecodedArchive> {
    let (header, payload_text) = parse_container(content)?;
    let payload: Payload = compression::decode_and_decompress(&payload_text)?;

    let contents = verify_integrity(&payload)?;
    verify_header_consistency(&header, &payload)?;

    let mut files = Vec::with_capacity(payload.files.len());
    for (file, bytes) in payload.files.into_iter().zip(contents) {
        let content = String::from_utf8(bytes).map_err(|e| {
            ContextGenError::DecodeFailed(format!("content of {} is not UTF-8: {}", file.path, e))
        })?;
        files.push(FileRecord {
            path: file.path,
            content,
            checksum: file.checksum,
            size: file.size,
        });
    }

    Ok(DecodedArchive {
        header,
        metadata: payload.metadata,
        archive: Archive::new(files),
    })
}

/// Check the file count, every file checksum and the global checksum
///
/// Returns the decoded content bytes of each file, in order.
fn verify_integrity(payload: &Payload) -> Result<Vec<Vec<u8>>> {
    if payload.files.len() != payload.metadata.file_count {
        return Err(ContextGenError::FileCountMismatch {
            expected: payload.metadata.file_count,
            actual: payload.files.len(),
        });
    }

    let mut contents = Vec::with_capacity(payload.files.len());
    for file in &payload.files {
        let bytes = decode_base64(&file.content).map_err(|e| {
            ContextGenError::InvalidBase64(format!("content of {}: {}", file.path, e))
        })?;
        let actual = checksum::digest(&bytes);
        if actual != file.checksum {
            return Err(ContextGenError::ChecksumMismatch {
                path: file.path.clone(),
                expected: file.checksum.clone(),
                actual,
            });
        }
        contents.push(bytes);
    }

    checksum::verify_global(
        &payload.global_checksum,
        payload.files.iter().map(|f| (f.path.as_str(), f.checksum.as_str())),
    )?;
    Ok(contents)
}

fn verify_header_consistency(header: &CrypticHeader, payload: &Payload) -> Result<()> {
    if header.file_count != payload.files.len() {
        return Err(ContextGenError::HeaderMismatch {
            field: "file count",
            header: header.file_count.to_string(),
            payload: payload.files.len().to_string(),
        });
    }
    if header.global_checksum != payload.global_checksum {
        return Err(ContextGenError::HeaderMismatch {
            field: "global checksum",
            header: header.global_checksum.clone(),
            payload: payload.global_checksum.clone(),
        });
    }
    if header.compression_level != payload.metadata.compression_level {
        return Err(ContextGenError::HeaderMismatch {
            field: "compression level",
            header: header.compression_level.to_string(),
            payload: payload.metadata.compression_level.to_string(),
        });
    }
    Ok(())
}

/// Decode a cryptic snapshot and restore its files under `output_dir`
///
/// Every integrity check runs before anything is written, even in
/// verify-only mode. In verify-only mode the filesystem is never touched.
/// Otherwise `output_dir` is created if needed and one progress unit is
/// signalled per file written.
pub fn decode(
    content: &str,
    output_dir: &Path,
    options: DecodeOptions,
    progress: Option<&dyn Progress>,
) -> Result<DecodeReport> {
    let decoded = decode_archive(content)?;
    let file_count = decoded.archive.len();
    let global_checksum = decoded.archive.global_checksum().to_string();

    if options.verify_only {
        debug!("Verified {} files, nothing written", file_count);
        return Ok(DecodeReport {
            verify_only: true,
            file_count,
            files_restored: 0,
            metadata: decoded.metadata,
            global_checksum,
        });
    }

    let targets = decoded
        .archive
        .files()
        .iter()
        .map(|file| utils::safe_join(output_dir, &file.path))
        .collect::<Result<Vec<_>>>()?;

    fs::create_dir_all(output_dir)?;
    let mut files_restored = 0;
    for (file, target) in decoded.archive.files().iter().zip(&targets) {
        utils::write_creating_parents(target, file.content.as_bytes())?;
        files_restored += 1;
        tick(progress);
    }

    info!("Restored {} files into {:?}", files_restored, output_dir);
    Ok(DecodeReport {
        verify_only: false,
        file_count,
        files_restored,
        metadata: decoded.metadata,
        global_checksum,
    })
}

/// Read a cryptic snapshot from disk and [`decode`] it
///
/// # Errors
///
/// [`ContextGenError::NotFound`] if `path` does not exist, plus everything
/// [`decode`] reports.
pub fn decode_file(
    path: &Path,
    output_dir: &Path,
    options: DecodeOptions,
    progress: Option<&dyn Progress>,
) -> Result<DecodeReport> {
    if !path.exists() {
        return Err(ContextGenError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    decode(&content, output_dir, options, progress)
}

/// Check a snapshot's header without decompressing its payload
///
/// Never fails; problems are reported in [`FormatReport::error`].
pub fn validate_str(content: &str) -> FormatReport {
    match parse_container(content) {
        Ok((header, payload)) => FormatReport {
            is_valid: true,
            file_count: Some(header.file_count),
            compression_level: Some(header.compression_level),
            global_checksum: Some(header.global_checksum),
            has_encoded_data: !payload.is_empty(),
            error: None,
        },
        Err(e) => FormatReport {
            error: Some(e.to_string()),
            ..Default::default()
        },
    }
}

/// Check a snapshot file's header without decompressing its payload
pub fn validate_format(path: &Path) -> FormatReport {
    match fs::read_to_string(path) {
        Ok(content) => validate_str(&content),
        Err(e) => {
            warn!("Cannot read {:?}: {}", path, e);
            let error = if e.kind() == std::io::ErrorKind::NotFound {
                "File not found".to_string()
            } else {
                e.to_string()
            };
            FormatReport {
                error: Some(error),
                ..Default::default()
            }
        }
    }
}
