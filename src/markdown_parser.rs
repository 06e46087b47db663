//! Line scanner and grammar for Markdown snapshots
//!
//! A snapshot is split into lines, each line is classified once, and records
//! are then read between delimiter lines:
//!
//! ````text
//! ###==AICG_FILE==###
//!
//! ## `src/lib.rs` (checksum: <hex64>)
//!
//! ```rs
//! <content lines>
//! ```
//!
//! ###==AICG_FILE==###
//! ````
//!
//! The closing fence of a record is a bare ```` ``` ```` line that is followed,
//! after optional blank lines, by a delimiter line which is itself followed by
//! another heading, the global checksum line, or the end of the document.
//! Content may therefore contain fences, headings and even delimiter lines.
//! When more than one closing line has that shape, the first one whose content
//! matches the heading checksum is chosen.
//!
//! Lines are classified with one trailing `\r` removed, so documents whose
//! line endings were converted to CRLF still parse.
//!
//! Documents without any delimiter line use the legacy layout: a heading, a
//! blank line, and a fenced block ending at the first closing fence.

use crate::error::{ContextGenError, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

/// First line of every snapshot
pub const TITLE: &str = "# AI-ContextGen Snapshot";
/// Line separating records
pub const DELIMITER: &str = "###==AICG_FILE==###";
/// Markdown code fence
pub const FENCE: &str = "```";
/// Prefix of the trailing archive checksum line
pub const GLOBAL_PREFIX: &str = "Global checksum: ";

const HEADING_PREFIX: &str = "## `";
const CHECKSUM_INFIX: &str = "` (checksum: ";

/// Classification of one document line
#[derive(Debug, Clone, PartialEq, Eq)]
enum LineKind<'a> {
    Blank,
    Delimiter,
    Heading {
        path: &'a str,
        checksum: Option<&'a str>,
    },
    /// A fence line; `tag` is empty for a bare fence
    Fence {
        tag: &'a str,
    },
    Global(&'a str),
    Text,
}

#[derive(Debug, Clone)]
struct Line<'a> {
    /// Line text without its `\n`, trailing `\r` kept
    raw: &'a str,
    kind: LineKind<'a>,
}

impl<'a> Line<'a> {
    fn has_cr(&self) -> bool {
        self.raw.ends_with('\r')
    }

    fn is_bare_fence(&self) -> bool {
        self.kind == LineKind::Fence { tag: "" }
    }
}

/// One record read from a document, before verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    /// Path from the heading
    pub path: String,
    /// Checksum from the heading, if present
    pub checksum: Option<String>,
    /// Content between the fences, line endings as captured
    pub content: String,
}

/// Result of parsing a whole document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Fenced records in document order
    pub records: Vec<ParsedRecord>,
    /// Headings without a fenced block (skipped-file notes)
    pub notes: Vec<String>,
    /// Value of the `Global checksum:` line, if present
    pub global_checksum: Option<String>,
    /// Whether the document used the legacy, delimiter-less layout
    pub legacy: bool,
}

impl ParsedDocument {
    /// Whether any checksum metadata is present at all
    pub fn has_checksums(&self) -> bool {
        self.global_checksum.is_some() || self.records.iter().any(|r| r.checksum.is_some())
    }
}

/// Format a record heading
pub fn heading(path: &str, checksum: Option<&str>) -> String {
    match checksum {
        Some(sum) => format!("{}{}{}{})", HEADING_PREFIX, path, CHECKSUM_INFIX, sum),
        None => format!("{}{}`", HEADING_PREFIX, path),
    }
}

fn classify(raw: &str) -> LineKind<'_> {
    let line = raw.strip_suffix('\r').unwrap_or(raw);

    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    if line == DELIMITER {
        return LineKind::Delimiter;
    }
    if let Some(tag) = line.strip_prefix(FENCE) {
        if !tag.contains('`') {
            return LineKind::Fence { tag: tag.trim() };
        }
    }
    if let Some(value) = line.strip_prefix(GLOBAL_PREFIX) {
        return LineKind::Global(value.trim());
    }
    if let Some(rest) = line.strip_prefix(HEADING_PREFIX) {
        if let Some(inner) = rest.strip_suffix(')') {
            if let Some((path, sum)) = inner.rsplit_once(CHECKSUM_INFIX) {
                if !path.is_empty() && !sum.is_empty() {
                    return LineKind::Heading {
                        path,
                        checksum: Some(sum),
                    };
                }
            }
        }
        if let Some(path) = rest.strip_suffix('`') {
            if !path.is_empty() {
                return LineKind::Heading { path, checksum: None };
            }
        }
    }
    LineKind::Text
}

fn tokenize(document: &str) -> Vec<Line<'_>> {
    document
        .split('\n')
        .map(|raw| Line { raw, kind: classify(raw) })
        .collect()
}

/// Join content lines; drop the separator `\r` of a CRLF closing fence
fn extract_content(lines: &[Line<'_>], start: usize, close: usize) -> String {
    let mut content = lines[start..close]
        .iter()
        .map(|l| l.raw)
        .collect::<Vec<_>>()
        .join("\n");
    if lines[close].has_cr() && content.ends_with('\r') {
        content.pop();
    }
    content
}

fn skip_blank(lines: &[Line<'_>], mut idx: usize) -> usize {
    while idx < lines.len() && lines[idx].kind == LineKind::Blank {
        idx += 1;
    }
    idx
}

/// If a record may end at the bare fence `close`, return where the next
/// section starts: the following delimiter, or the end of the document
fn boundary_after(lines: &[Line<'_>], close: usize) -> Option<usize> {
    let next = skip_blank(lines, close + 1);
    if next >= lines.len() {
        return Some(lines.len());
    }
    if lines[next].kind != LineKind::Delimiter {
        return None;
    }
    let after = skip_blank(lines, next + 1);
    if after >= lines.len() {
        return Some(next);
    }
    match lines[after].kind {
        LineKind::Heading { .. } | LineKind::Global(_) => Some(next),
        _ => None,
    }
}

fn next_delimiter(lines: &[Line<'_>], from: usize) -> Option<usize> {
    (from..lines.len()).find(|&i| lines[i].kind == LineKind::Delimiter)
}

/// Parse a snapshot document into records
///
/// # Errors
///
/// [`ContextGenError::InvalidDocument`] if a fenced block is never closed.
pub fn parse(document: &str) -> Result<ParsedDocument> {
    let lines = tokenize(document);

    let Some(first) = next_delimiter(&lines, 0) else {
        debug!("No record delimiters found, reading legacy layout");
        return parse_legacy(&lines);
    };

    let mut parsed = ParsedDocument::default();
    let mut idx = first;

    while idx < lines.len() {
        let start = skip_blank(&lines, idx + 1);
        if start >= lines.len() {
            break;
        }

        match lines[start].kind {
            LineKind::Global(sum) => {
                parsed.global_checksum = Some(sum.to_string());
                break;
            }
            LineKind::Heading { path, checksum } => {
                let open = skip_blank(&lines, start + 1);
                if open < lines.len() && matches!(lines[open].kind, LineKind::Fence { .. }) {
                    let (record, next) = read_fenced(&lines, path, checksum, open)?;
                    trace!("Parsed record {} ({} bytes)", record.path, record.content.len());
                    parsed.records.push(record);
                    idx = next;
                    continue;
                }
                parsed.notes.push(path.to_string());
            }
            _ => trace!("Ignoring stray text at line {}", start + 1),
        }

        match next_delimiter(&lines, start + 1) {
            Some(next) => idx = next,
            None => break,
        }
    }

    if parsed.global_checksum.is_none() {
        parsed.global_checksum = lines.iter().rev().find_map(|l| match l.kind {
            LineKind::Global(sum) => Some(sum.to_string()),
            _ => None,
        });
    }

    Ok(parsed)
}

/// Running digests of a record's content while the closing fence is searched
///
/// Content is the candidate lines joined with `\n`. Each line is fed once,
/// minus a trailing `\r` that is held back until the next line arrives: the
/// raw digest gets it back, the normalized one drops it because it precedes a
/// `\n`. Finalizing clones both hashers, so trying every candidate fence
/// stays linear in the length of the record.
#[derive(Clone, Default)]
struct ContentDigest {
    raw: Sha256,
    normalized: Sha256,
    started: bool,
    pending_cr: bool,
}

impl ContentDigest {
    fn push(&mut self, line: &str) {
        if self.started {
            if self.pending_cr {
                self.raw.update(b"\r");
            }
            self.raw.update(b"\n");
            self.normalized.update(b"\n");
        }
        let body = line.strip_suffix('\r').unwrap_or(line);
        self.raw.update(body.as_bytes());
        self.normalized.update(body.as_bytes());
        self.started = true;
        self.pending_cr = body.len() != line.len();
    }

    /// Whether the content closed by a fence line matches `expected`
    fn matches(&self, expected: &str, close_has_cr: bool) -> bool {
        let mut raw = self.raw.clone();
        let mut normalized = self.normalized.clone();
        if self.pending_cr && !close_has_cr {
            raw.update(b"\r");
            normalized.update(b"\r");
        }
        hex::encode(raw.finalize()) == expected || hex::encode(normalized.finalize()) == expected
    }
}

/// Read a fenced record whose opening fence is at `open`
///
/// Returns the record and the index where the next section starts.
fn read_fenced(
    lines: &[Line<'_>],
    path: &str,
    checksum: Option<&str>,
    open: usize,
) -> Result<(ParsedRecord, usize)> {
    let mut fallback: Option<(usize, usize)> = None;
    let mut digest = ContentDigest::default();

    for close in open + 1..lines.len() {
        if !lines[close].is_bare_fence() {
            digest.push(lines[close].raw);
            continue;
        }
        if let Some(next) = boundary_after(lines, close) {
            let verified = match checksum {
                Some(sum) => digest.matches(sum, lines[close].has_cr()),
                None => true,
            };
            if verified {
                let content = extract_content(lines, open + 1, close);
                return Ok((record(path, checksum, content), next));
            }
            if fallback.is_none() {
                fallback = Some((close, next));
            }
        }
        digest.push(lines[close].raw);
    }

    // Nothing verified: keep the first well-formed candidate so the checksum
    // mismatch is reported against it.
    match fallback {
        Some((close, next)) => {
            let content = extract_content(lines, open + 1, close);
            Ok((record(path, checksum, content), next))
        }
        None => Err(ContextGenError::InvalidDocument(format!(
            "unterminated code block for `{}`",
            path
        ))),
    }
}

fn record(path: &str, checksum: Option<&str>, content: String) -> ParsedRecord {
    ParsedRecord {
        path: path.to_string(),
        checksum: checksum.map(str::to_string),
        content,
    }
}

fn parse_legacy(lines: &[Line<'_>]) -> Result<ParsedDocument> {
    let mut parsed = ParsedDocument {
        legacy: true,
        ..Default::default()
    };

    let mut idx = 0;
    while idx < lines.len() {
        let LineKind::Heading { path, checksum } = lines[idx].kind else {
            if let LineKind::Global(sum) = lines[idx].kind {
                parsed.global_checksum = Some(sum.to_string());
            }
            idx += 1;
            continue;
        };

        let open = skip_blank(lines, idx + 1);
        if open >= lines.len() || !matches!(lines[open].kind, LineKind::Fence { .. }) {
            parsed.notes.push(path.to_string());
            idx += 1;
            continue;
        }

        let close = (open + 1..lines.len())
            .find(|&i| matches!(lines[i].kind, LineKind::Fence { .. }))
            .ok_or_else(|| {
                ContextGenError::InvalidDocument(format!("unterminated code block for `{}`", path))
            })?;

        parsed
            .records
            .push(record(path, checksum, extract_content(lines, open + 1, close)));
        idx = close + 1;
    }

    Ok(parsed)
}
