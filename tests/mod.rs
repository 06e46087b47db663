//! Main test module for contextgen
//!
//! This module includes all test suites:
//! - Integration tests for snapshot/restore scenarios and tampering
//! - Property-based tests for round-trip and checksum invariants

pub mod integration;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::contextgen::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_empty_directory() {
        let project = TempDir::new().unwrap();
        let generator = ContextGenBuilder::new().build(project.path()).unwrap();

        let summary = generator.snapshot_markdown(None).unwrap();
        assert_eq!(summary.files_admitted, 0);
        assert_eq!(summary.global_checksum, checksum::digest(b""));

        let document = fs::read_to_string(generator.output_path()).unwrap();
        assert_eq!(
            document,
            format!(
                "# AI-ContextGen Snapshot\n\n###==AICG_FILE==###\n\nGlobal checksum: {}\n",
                checksum::digest(b"")
            )
        );

        let restored = TempDir::new().unwrap();
        assert!(restore_markdown(&document, restored.path(), None).unwrap().is_empty());
    }

    #[test]
    fn test_empty_directory_cryptic() {
        let project = TempDir::new().unwrap();
        let generator = ContextGenBuilder::new()
            .output_filename("snap.cryptic")
            .build(project.path())
            .unwrap();
        generator.snapshot_cryptic(None).unwrap();

        let blob = fs::read_to_string(generator.output_path()).unwrap();
        assert!(blob.contains("FILE-COUNT: 0\n"));
        let report =
            restore_cryptic(&blob, &project.path().join("out"), DecodeOptions::default(), None)
                .unwrap();
        assert_eq!(report.files_restored, 0);
        assert!(project.path().join("out").is_dir());
    }

    #[test]
    fn test_special_filenames() {
        let project = TempDir::new().unwrap();
        let names = [
            "file with spaces.txt",
            "file-with-dashes.txt",
            "file_with_underscores.txt",
            "file.multiple.dots.txt",
            "UPPERCASE.TXT",
            "unicode_文件.txt",
            "`backtick`.md",
        ];
        for name in &names {
            fs::write(project.path().join(name), format!("content of {}", name)).unwrap();
        }

        let generator = ContextGenBuilder::new().build(project.path()).unwrap();
        generator.snapshot_markdown(None).unwrap();
        let document = fs::read_to_string(generator.output_path()).unwrap();

        let restored = TempDir::new().unwrap();
        assert_eq!(
            restore_markdown(&document, restored.path(), None).unwrap().len(),
            names.len()
        );
        for name in &names {
            assert_eq!(
                fs::read_to_string(restored.path().join(name)).unwrap(),
                format!("content of {}", name)
            );
        }
    }

    #[test]
    fn test_deeply_nested_paths() {
        let project = TempDir::new().unwrap();
        let deep = (0..12).map(|i| format!("level{}", i)).collect::<Vec<_>>().join("/");
        fs::create_dir_all(project.path().join(&deep)).unwrap();
        fs::write(project.path().join(&deep).join("leaf.rs"), "// leaf\n").unwrap();

        let generator = ContextGenBuilder::new()
            .output_filename("out.cryptic")
            .build(project.path())
            .unwrap();
        let paths = generator.list_files(None).unwrap();
        assert_eq!(paths, vec![format!("{}/leaf.rs", deep)]);

        let blob = generator.render_cryptic(&paths, None).unwrap().document;
        let restored = TempDir::new().unwrap();
        restore_cryptic(&blob, restored.path(), DecodeOptions::default(), None).unwrap();
        assert_eq!(
            fs::read_to_string(restored.path().join(&deep).join("leaf.rs")).unwrap(),
            "// leaf\n"
        );
    }

    #[test]
    fn test_restore_overwrites_existing_files() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("config.toml"), "new = true\n").unwrap();
        let generator = ContextGenBuilder::new().build(project.path()).unwrap();
        let paths = generator.list_files(None).unwrap();
        let document = generator.render_markdown(&paths, None).document;

        let target = TempDir::new().unwrap();
        fs::write(target.path().join("config.toml"), "old = true\n").unwrap();
        fs::write(target.path().join("unrelated.txt"), "stays").unwrap();
        restore_markdown(&document, target.path(), None).unwrap();

        assert_eq!(
            fs::read_to_string(target.path().join("config.toml")).unwrap(),
            "new = true\n"
        );
        assert_eq!(
            fs::read_to_string(target.path().join("unrelated.txt")).unwrap(),
            "stays"
        );
    }

    #[test]
    fn test_unlimited_size() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("big.txt"), "x".repeat(2 * 1024 * 1024)).unwrap();

        let limited = ContextGenBuilder::new().build(project.path()).unwrap();
        let paths = limited.list_files(None).unwrap();
        assert_eq!(limited.render_markdown(&paths, None).archive.len(), 0);

        let unlimited = ContextGenBuilder::new()
            .max_file_size(0)
            .build(project.path())
            .unwrap();
        assert_eq!(unlimited.render_markdown(&paths, None).archive.len(), 1);
    }
}
