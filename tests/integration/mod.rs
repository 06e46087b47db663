//! Integration tests for contextgen
//!
//! Real directory trees through the public API: capture rules, tampering in
//! both containers, and documents that went through a lossy text channel.

use ::contextgen::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// A project directory plus a generator configured for it
pub struct SnapshotHarness {
    pub project: TempDir,
    pub generator: ContextGen,
}

impl SnapshotHarness {
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self::with_builder(files, ContextGenBuilder::new())
    }

    pub fn with_builder(files: &[(&str, &str)], builder: ContextGenBuilder) -> Self {
        let project = TempDir::new().unwrap();
        for (path, content) in files {
            write_file(project.path(), path, content);
        }
        let generator = builder.build(project.path()).unwrap();
        Self { project, generator }
    }

    pub fn markdown(&self) -> String {
        let paths = self.generator.list_files(None).unwrap();
        self.generator.render_markdown(&paths, None).document
    }

    pub fn cryptic(&self) -> String {
        let paths = self.generator.list_files(None).unwrap();
        self.generator.render_cryptic(&paths, None).unwrap().document
    }
}

fn write_file(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(full, content).unwrap();
}

fn is_empty_dir(path: &Path) -> bool {
    !path.exists() || fs::read_dir(path).unwrap().next().is_none()
}

#[test]
fn test_admission_excludes_from_archive_and_checksum() {
    let big = "x".repeat(1025);
    let harness = SnapshotHarness::with_builder(
        &[("small.txt", "ok"), ("big.txt", &big), ("pic.png", "png")],
        ContextGenBuilder::new()
            .max_file_size(1024)
            .skip_extensions(vec![".png".to_string()]),
    );

    let paths = harness.generator.list_files(None).unwrap();
    let encoded = harness.generator.render_markdown(&paths, None);
    assert_eq!(encoded.archive.len(), 1);
    assert_eq!(encoded.archive.files()[0].path, "small.txt");

    let expected_global = checksum::global_checksum([(
        "small.txt",
        checksum::digest(b"ok").as_str(),
    )]);
    assert_eq!(encoded.archive.global_checksum(), expected_global);
    assert!(encoded
        .document
        .contains("_(Skipped: file too large, 1025 bytes exceeds limit of 1024 bytes)_"));
    assert!(encoded
        .document
        .contains("_(Skipped: extension `.png` not supported)_"));

    let blob = harness.generator.render_cryptic(&paths, None).unwrap();
    assert!(blob.document.contains("FILE-COUNT: 1\n"));
    assert_eq!(blob.archive.global_checksum(), expected_global);
}

#[test]
fn test_content_resembling_the_container() {
    let tricky = "Example snapshot:\n\n###==AICG_FILE==###\n\n## `fake.rs` (checksum: abc)\n\n```rs\nfn fake() {}\n```\n\n###==AICG_FILE==###\n\nGlobal checksum: 0000\n";
    let harness = SnapshotHarness::new(&[
        ("docs/format.md", tricky),
        ("src/lib.rs", "pub fn real() {}\n"),
    ]);

    let document = harness.markdown();
    let restored = TempDir::new().unwrap();
    assert_eq!(restore_markdown(&document, restored.path(), None).unwrap().len(), 2);
    assert_eq!(
        fs::read_to_string(restored.path().join("docs/format.md")).unwrap(),
        tricky
    );
    assert!(!restored.path().join("fake.rs").exists());
}

#[test]
fn test_markdown_tampering_aborts_without_writes() {
    let harness = SnapshotHarness::new(&[("a.txt", "alpha\n"), ("b.txt", "beta\n")]);
    let document = harness.markdown();
    let restored = TempDir::new().unwrap();

    let edited_content = document.replace("beta", "BETA");
    let err = restore_markdown(&edited_content, restored.path(), None).unwrap_err();
    assert!(err.is_corruption());
    assert!(matches!(err, ContextGenError::ChecksumMismatch { ref path, .. } if path == "b.txt"));
    assert!(is_empty_dir(restored.path()));

    let real_sum = checksum::digest(b"alpha\n");
    let edited_checksum = document.replace(&real_sum, &checksum::digest(b"other"));
    assert!(matches!(
        restore_markdown(&edited_checksum, restored.path(), None),
        Err(ContextGenError::ChecksumMismatch { .. })
    ));

    let (body, _) = document.rsplit_once("Global checksum: ").unwrap();
    let edited_global = format!("{}Global checksum: {}\n", body, "f".repeat(64));
    let err = restore_markdown(&edited_global, restored.path(), None).unwrap_err();
    assert!(err.is_tampering());
    assert!(is_empty_dir(restored.path()));
}

#[test]
fn test_markdown_reordering_is_detected() {
    let harness = SnapshotHarness::new(&[("a.txt", "alpha"), ("b.txt", "beta")]);
    let document = harness.markdown();

    let sections: Vec<&str> = document.split("###==AICG_FILE==###\n\n").collect();
    // title, a.txt, b.txt, global
    assert_eq!(sections.len(), 4);
    let swapped =
        [sections[0], sections[2], sections[1], sections[3]].join("###==AICG_FILE==###\n\n");

    assert!(matches!(
        markdown::decode(&swapped),
        Err(ContextGenError::GlobalChecksumMismatch { .. })
    ));
}

#[test]
fn test_markdown_through_crlf_channel() {
    let harness = SnapshotHarness::new(&[
        ("notes.txt", "line one\nline two\n"),
        ("src/main.rs", "fn main() {}\n"),
    ]);
    let crlf = harness.markdown().replace('\n', "\r\n");

    let restored = TempDir::new().unwrap();
    assert_eq!(restore_markdown(&crlf, restored.path(), None).unwrap().len(), 2);
    assert_eq!(
        fs::read(restored.path().join("notes.txt")).unwrap(),
        b"line one\r\nline two\r\n"
    );
}

#[test]
fn test_cryptic_header_and_payload_tampering() {
    let harness = SnapshotHarness::new(&[("a.txt", "alpha"), ("b.txt", "beta")]);
    let blob = harness.cryptic();
    let restored = TempDir::new().unwrap();

    let header_only = blob.replace("FILE-COUNT: 2", "FILE-COUNT: 7");
    let err = restore_cryptic(&header_only, restored.path(), DecodeOptions::default(), None)
        .unwrap_err();
    assert!(matches!(err, ContextGenError::HeaderMismatch { .. }));
    assert_eq!(err.kind(), ErrorKind::Integrity);

    let (header, payload) = blob.split_once("---HEADER-END---\n").unwrap();
    let mut chars: Vec<char> = payload.chars().collect();
    let mid = chars.len() / 2;
    chars[mid] = if chars[mid] == 'A' { 'B' } else { 'A' };
    let payload: String = chars.into_iter().collect();
    let corrupted = format!("{}---HEADER-END---\n{}", header, payload);
    let err = restore_cryptic(&corrupted, restored.path(), DecodeOptions::default(), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);

    assert!(is_empty_dir(restored.path()));
}

#[test]
fn test_cryptic_through_wrapping_channel() {
    let harness = SnapshotHarness::new(&[("a.txt", "alpha")]);
    let blob = harness.cryptic();
    let (header, payload) = blob.split_once("---HEADER-END---\n").unwrap();

    let wrapped: Vec<String> = payload
        .as_bytes()
        .chunks(76)
        .map(|c| String::from_utf8(c.to_vec()).unwrap())
        .collect();
    let rewrapped = format!(
        "{}---HEADER-END---\r\n{}\r\n",
        header.replace('\n', "\r\n"),
        wrapped.join("\r\n")
    );

    let restored = TempDir::new().unwrap();
    let report = restore_cryptic(&rewrapped, restored.path(), DecodeOptions::default(), None)
        .unwrap();
    assert_eq!(report.files_restored, 1);
    assert_eq!(fs::read_to_string(restored.path().join("a.txt")).unwrap(), "alpha");
}

#[test]
fn test_verify_only_creates_nothing() {
    let harness = SnapshotHarness::new(&[("deep/tree/file.txt", "x")]);
    let blob = harness.cryptic();
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("never-created");

    let report = restore_cryptic(&blob, &target, DecodeOptions { verify_only: true }, None)
        .unwrap();
    assert_eq!(report.file_count, 1);
    assert!(!target.exists());
}

#[test]
fn test_validate_format_on_disk() {
    let harness = SnapshotHarness::with_builder(
        &[("a.txt", "alpha"), ("b.txt", "beta")],
        ContextGenBuilder::new()
            .output_filename("snap.cryptic")
            .compression_level(3),
    );
    harness.generator.snapshot_cryptic(None).unwrap();

    let report = cryptic::validate_format(&harness.generator.output_path());
    assert!(report.is_valid);
    assert_eq!(report.file_count, Some(2));
    assert_eq!(report.compression_level, Some(3));

    let md_path = harness.project.path().join("a.txt");
    let report = cryptic::validate_format(&md_path);
    assert!(!report.is_valid);
    assert!(report.error.is_some());
}

#[test]
fn test_progress_counts() {
    let harness = SnapshotHarness::new(&[
        ("a.txt", "a"),
        ("b.png", "b"),
        ("c/d.txt", "d"),
    ]);
    let paths = harness.generator.list_files(None).unwrap();

    let ticks = std::cell::Cell::new(0);
    let sink = || ticks.set(ticks.get() + 1);
    let encoded = harness.generator.render_markdown(&paths, Some(&sink));
    assert_eq!(ticks.get(), 3);

    ticks.set(0);
    let restored = TempDir::new().unwrap();
    restore_markdown(&encoded.document, restored.path(), Some(&sink)).unwrap();
    assert_eq!(ticks.get(), 2);
}

#[test]
fn test_many_embedded_fence_candidates_decode_quickly() {
    let block = "```\n\n###==AICG_FILE==###\n\n## `x`\n";
    let content = block.repeat(6000);
    assert!(content.len() > 190_000);

    let outcomes = vec![Outcome::Admitted(FileRecord::new("crafted.md", content.clone()))];
    let document = markdown::render(&outcomes);

    let start = std::time::Instant::now();
    let archive = markdown::decode(&document).unwrap();
    let elapsed = start.elapsed();

    assert_eq!(archive.len(), 1);
    assert_eq!(archive.files()[0].content, content);
    assert!(
        elapsed < std::time::Duration::from_secs(5),
        "decoding took {:?}",
        elapsed
    );
}
