//! Utility functions for contextgen
//!
//! Path handling for restore targets, file writing, and display helpers.

use crate::error::{ContextGenError, Result};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::trace;

/// Convert a path relative to `base` into the forward-slash form stored in archives
///
/// Returns `None` if `path` is not under `base` or is not valid UTF-8.
pub fn to_archive_path(path: &Path, base: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Option<Vec<&str>> = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();
    let parts = parts?;
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Resolve an archive path under `target`, refusing anything that escapes it
///
/// # Errors
///
/// [`ContextGenError::UnsafePath`] for empty paths, absolute paths, drive
/// prefixes, and `..` components.
pub fn safe_join(target: &Path, archive_path: &str) -> Result<PathBuf> {
    let relative = Path::new(archive_path);
    let mut joined = target.to_path_buf();
    let mut depth = 0usize;

    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                joined.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ContextGenError::UnsafePath(archive_path.to_string()));
            }
        }
    }

    if depth == 0 {
        return Err(ContextGenError::UnsafePath(archive_path.to_string()));
    }
    Ok(joined)
}

/// Write `content` to `path` verbatim, creating parent directories first
///
/// Existing files are overwritten.
pub fn write_creating_parents(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    trace!("Wrote {} bytes to {:?}", content.len(), path);
    Ok(())
}

/// Atomically replace `path` with `content`
///
/// The content is written to a temporary file in the same directory and then
/// renamed over the destination, so readers never observe a half-written
/// snapshot.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.persist(path).map_err(|e| ContextGenError::Io(e.error))?;
    Ok(())
}

/// Format bytes in human-readable form
///
/// ```rust
/// use contextgen::utils::format_bytes;
///
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
