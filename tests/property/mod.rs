//! Property-based testing for contextgen
//!
//! Uses proptest to check round-trip identity and checksum invariants over
//! randomly generated file sets, including content that imitates the
//! Markdown container itself.

use ::contextgen::*;
use chrono::Utc;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

/// Generate relative, forward-slash file paths
fn path_strategy() -> impl Strategy<Value = String> {
    let dirs = prop::collection::vec("[a-z]{1,8}", 0..=3);
    let name = prop_oneof![
        "[a-z]{1,8}\\.(txt|rs|md|js)",
        "file[0-9]{1,3}",
        "[A-Z][a-z]{2,6}",
    ];
    (dirs, name).prop_map(|(mut parts, name)| {
        parts.push(name);
        parts.join("/")
    })
}

/// Generate text content, biased towards container look-alikes
fn content_strategy() -> impl Strategy<Value = String> {
    let line = prop_oneof![
        4 => "[ -~]{0,40}",
        1 => Just("```".to_string()),
        1 => Just("```rust".to_string()),
        1 => Just("###==AICG_FILE==###".to_string()),
        1 => Just("## `other.rs` (checksum: deadbeef)".to_string()),
        1 => Just("Global checksum: 0".to_string()),
        1 => Just(String::new()),
        1 => "[a-zé中\\t]{0,10}",
    ];
    (prop::collection::vec(line, 0..12), any::<bool>(), any::<bool>()).prop_map(
        |(lines, trailing_newline, crlf)| {
            let sep = if crlf { "\r\n" } else { "\n" };
            let mut text = lines.join(sep);
            if trailing_newline {
                text.push_str(sep);
            }
            text
        },
    )
}

/// Generate a file set with unique paths; no path may be a directory of another
fn file_set_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(path_strategy(), content_strategy(), 0..8).prop_map(|files| {
        let paths: Vec<String> = files.keys().cloned().collect();
        files
            .into_iter()
            .filter(|(path, _)| {
                !paths
                    .iter()
                    .any(|other| other.starts_with(&format!("{}/", path)))
            })
            .collect()
    })
}

fn records(files: &BTreeMap<String, String>) -> Vec<FileRecord> {
    files
        .iter()
        .map(|(path, content)| FileRecord::new(path.clone(), content.clone()))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_markdown_round_trip(files in file_set_strategy()) {
        let outcomes: Vec<Outcome> = records(&files).into_iter().map(Outcome::Admitted).collect();
        let document = markdown::render(&outcomes);
        let archive = markdown::decode(&document).unwrap();
        let expected = records(&files);
        prop_assert_eq!(archive.files(), expected.as_slice());
    }

    #[test]
    fn prop_cryptic_round_trip(files in file_set_strategy(), level in 1u32..=9) {
        let archive = Archive::new(records(&files));
        let blob = cryptic::render(&archive, "/src", level, Utc::now()).unwrap();
        let decoded = cryptic::decode_archive(&blob).unwrap();
        prop_assert_eq!(decoded.archive, archive);
        prop_assert_eq!(decoded.header.compression_level, level);
    }

    #[test]
    fn prop_restore_reproduces_tree(files in file_set_strategy()) {
        let project = TempDir::new().unwrap();
        for (path, content) in &files {
            let full = project.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(&full, content).unwrap();
        }
        let generator = ContextGenBuilder::new()
            .skip_extensions(vec![])
            .build(project.path())
            .unwrap();
        let paths = generator.list_files(None).unwrap();
        prop_assert_eq!(paths.len(), files.len());

        let md = generator.render_markdown(&paths, None).document;
        let out = TempDir::new().unwrap();
        restore_markdown(&md, out.path(), None).unwrap();
        for (path, content) in &files {
            prop_assert_eq!(&fs::read_to_string(out.path().join(path)).unwrap(), content);
        }
    }

    #[test]
    fn prop_global_checksum_depends_on_order(files in file_set_strategy()) {
        prop_assume!(files.len() >= 2);
        let forward = records(&files);
        let mut reversed = forward.clone();
        reversed.reverse();
        prop_assert_ne!(
            Archive::new(forward).global_checksum().to_string(),
            Archive::new(reversed).global_checksum().to_string()
        );
    }

    #[test]
    fn prop_digest_is_deterministic(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let a = checksum::digest(&data);
        prop_assert_eq!(a.len(), 64);
        prop_assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        prop_assert_eq!(a, checksum::digest(&data));
    }

    #[test]
    fn prop_single_character_edit_is_detected(
        files in file_set_strategy(),
        pick in any::<prop::sample::Index>(),
    ) {
        let nonempty: Vec<_> = files.iter().filter(|(_, c)| c.contains('a')).collect();
        prop_assume!(!nonempty.is_empty());
        let (target, _) = nonempty[pick.index(nonempty.len())];

        let outcomes: Vec<Outcome> = records(&files).into_iter().map(Outcome::Admitted).collect();
        let archive_records = records(&files);
        let record = archive_records.iter().find(|r| &r.path == target).unwrap();
        let tampered = record.content.replacen('a', "b", 1);
        let document = markdown::render(&outcomes).replace(
            &format!("\n{}\n```", record.content),
            &format!("\n{}\n```", tampered),
        );
        prop_assume!(document != markdown::render(&outcomes));

        let err = markdown::decode(&document).unwrap_err();
        prop_assert!(err.is_corruption(), "unexpected error: {}", err);
    }
}
