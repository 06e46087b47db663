//! Gzip + base64 payload encoding for cryptic snapshots
//!
//! A payload value is serialized as compact JSON, gzip-compressed at a level
//! between 1 and 9, and base64-encoded (standard alphabet, padded) so that it
//! survives any text channel.
//!
//! Decoding reverses the pipeline and reports which stage failed:
//!
//! | Stage        | Error                                        |
//! |--------------|----------------------------------------------|
//! | base64       | [`ContextGenError::InvalidBase64`]           |
//! | gzip header  | [`ContextGenError::InvalidCompressedStream`] |
//! | inflate/UTF-8| [`ContextGenError::DecodeFailed`]            |
//! | JSON         | [`ContextGenError::InvalidPayload`]          |
//!
//! ```rust
//! use contextgen::compression::{compress_and_encode, decode_and_decompress};
//!
//! let encoded = compress_and_encode(&vec!["a", "b"], 6).unwrap();
//! let decoded: Vec<String> = decode_and_decompress(&encoded.text).unwrap();
//! assert_eq!(decoded, vec!["a", "b"]);
//! ```

use crate::error::{ContextGenError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};
use std::time::Instant;
use tracing::{debug, trace};

/// Lowest accepted gzip level
pub const MIN_LEVEL: u32 = 1;
/// Highest accepted gzip level
pub const MAX_LEVEL: u32 = 9;
/// Default gzip level (balanced speed/ratio)
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// An encoded payload and its sizes
#[derive(Debug, Clone)]
pub struct EncodedPayload {
    /// Base64 text of the gzip stream
    pub text: String,
    /// Length of the serialized JSON in bytes
    pub original_len: u64,
    /// Length of the gzip stream in bytes
    pub compressed_len: u64,
}

/// Check that `level` is a valid gzip level
///
/// # Errors
///
/// [`ContextGenError::InvalidCompressionLevel`] outside 1-9.
pub fn validate_level(level: u32) -> Result<()> {
    if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
        return Err(ContextGenError::InvalidCompressionLevel(level));
    }
    Ok(())
}

/// Serialize `value` as JSON, gzip it at `level`, and base64-encode the result
pub fn compress_and_encode<T: Serialize>(value: &T, level: u32) -> Result<EncodedPayload> {
    validate_level(level)?;
    let start = Instant::now();

    let json = serde_json::to_vec(value)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;

    debug!(
        "Compressed payload at level {}: {} -> {} bytes in {:?}",
        level,
        json.len(),
        compressed.len(),
        start.elapsed()
    );

    Ok(EncodedPayload {
        text: STANDARD.encode(&compressed),
        original_len: json.len() as u64,
        compressed_len: compressed.len() as u64,
    })
}

/// Decode base64 text, tolerating whitespace introduced by line wrapping
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ContextGenError::InvalidBase64(e.to_string()))
}

/// Gunzip `compressed`, classifying failures
pub fn decompress(compressed: &[u8]) -> Result<Vec<u8>> {
    if !compressed.starts_with(&GZIP_MAGIC) {
        return Err(ContextGenError::InvalidCompressedStream(
            "incorrect header check".to_string(),
        ));
    }

    let mut decoder = GzDecoder::new(compressed);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(_) => {
            trace!("Decompressed {} -> {} bytes", compressed.len(), out.len());
            Ok(out)
        }
        Err(e) if decoder.header().is_none() => {
            Err(ContextGenError::InvalidCompressedStream(e.to_string()))
        }
        Err(e) => Err(ContextGenError::DecodeFailed(format!("corrupt gzip data: {}", e))),
    }
}

/// Reverse [`compress_and_encode`]
pub fn decode_and_decompress<T: DeserializeOwned>(encoded: &str) -> Result<T> {
    let compressed = decode_base64(encoded)?;
    let json = decompress(&compressed)?;
    let text = String::from_utf8(json)
        .map_err(|e| ContextGenError::DecodeFailed(format!("payload is not UTF-8: {}", e)))?;
    serde_json::from_str(&text).map_err(|e| ContextGenError::InvalidPayload(e.to_string()))
}
