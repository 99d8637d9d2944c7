use camino::Utf8PathBuf;
use fixgen_core::fixture::{ensure_fixture, verify_fixture};
use fixgen_core::{FixgenError, FixtureOutcome, GenerateOptions, Layout, Manifest};
use std::fs;
use tempfile::TempDir;

/// 1024 lines with a sentinel every 64 lines
fn small_layout() -> Layout {
    Layout::new(10, 2048)
}

fn scratch(name: &str) -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::try_from(dir.path().join(name)).unwrap();
    (dir, path)
}

#[test]
fn test_creates_fixture_with_pattern() {
    let (_dir, path) = scratch("small_file.txt");
    let layout = small_layout();

    let outcome = ensure_fixture(&path, &layout, &GenerateOptions::default()).unwrap();
    let FixtureOutcome::Created { len, sha256 } = outcome else {
        panic!("expected a fresh fixture, got {outcome:?}");
    };
    assert_eq!(len, layout.expected_len());
    assert_eq!(sha256.len(), 64);

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1024);
    for (idx, line) in lines[..1023].iter().enumerate() {
        let byte = (idx as u64 + 1) * 32;
        if byte % 2048 == 0 {
            assert_eq!(*line, format!("hello{byte}"), "line {}", idx + 1);
        } else {
            assert_eq!(*line, "abcdefghijklmnopqrstuvwxyz01234", "line {}", idx + 1);
        }
    }
    assert_eq!(lines[1023], "hello");
    assert!(!path.with_extension("txt.tmp").exists());
}

#[test]
fn test_writes_manifest() {
    let (_dir, path) = scratch("small_file.txt");
    let layout = small_layout();

    ensure_fixture(&path, &layout, &GenerateOptions::default()).unwrap();

    let manifest = Manifest::load(&path).unwrap().expect("manifest written");
    assert_eq!(manifest.layout, layout);
    assert_eq!(manifest.len, fs::metadata(&path).unwrap().len());
}

#[test]
fn test_manifest_can_be_disabled() {
    let (_dir, path) = scratch("small_file.txt");
    let options = GenerateOptions {
        manifest: false,
        ..GenerateOptions::default()
    };

    ensure_fixture(&path, &small_layout(), &options).unwrap();
    assert!(path.exists());
    assert!(!Manifest::path_for(&path).exists());
}

#[test]
fn test_regeneration_is_deterministic() {
    let (_dir, first) = scratch("first.txt");
    let second = first.with_file_name("second.txt");
    let layout = small_layout();
    let options = GenerateOptions {
        buffer_size: 100,
        manifest: false,
    };

    ensure_fixture(&first, &layout, &GenerateOptions::default()).unwrap();
    ensure_fixture(&second, &layout, &options).unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_second_run_reuses_file() {
    let (_dir, path) = scratch("small_file.txt");
    let layout = small_layout();

    ensure_fixture(&path, &layout, &GenerateOptions::default()).unwrap();
    let before = fs::read(&path).unwrap();
    let modified = fs::metadata(&path).unwrap().modified().unwrap();

    let outcome = ensure_fixture(&path, &layout, &GenerateOptions::default()).unwrap();
    assert_eq!(
        outcome,
        FixtureOutcome::Reused {
            len: layout.expected_len()
        }
    );
    assert_eq!(fs::read(&path).unwrap(), before);
    assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), modified);
}

#[test]
fn test_existing_file_with_wrong_size_is_left_alone() {
    let (_dir, path) = scratch("small_file.txt");
    fs::write(&path, "not a fixture\n").unwrap();

    let err = ensure_fixture(&path, &small_layout(), &GenerateOptions::default()).unwrap_err();
    assert!(matches!(err, FixgenError::Stale { .. }), "got {err}");
    assert_eq!(fs::read_to_string(&path).unwrap(), "not a fixture\n");
}

#[test]
fn test_manifest_layout_change_is_stale() {
    let (_dir, path) = scratch("small_file.txt");
    let layout = small_layout();
    ensure_fixture(&path, &layout, &GenerateOptions::default()).unwrap();

    // Same size, different marker
    let mut other = layout.clone();
    other.marker = "HELLO".to_owned();
    assert_eq!(other.expected_len(), layout.expected_len());

    let err = ensure_fixture(&path, &other, &GenerateOptions::default()).unwrap_err();
    match err {
        FixgenError::Stale { reason, .. } => assert!(reason.contains("manifest")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_directory_propagates_io_error() {
    let (_dir, base) = scratch("missing");
    let path = base.join("small_file.txt");

    let err = ensure_fixture(&path, &small_layout(), &GenerateOptions::default()).unwrap_err();
    assert!(matches!(err, FixgenError::Io(_)), "got {err}");
    assert!(!path.exists());
}

#[test]
fn test_invalid_layout_rejected_before_io() {
    let (_dir, path) = scratch("small_file.txt");
    let layout = Layout::new(10, 0);

    let err = ensure_fixture(&path, &layout, &GenerateOptions::default()).unwrap_err();
    assert!(matches!(err, FixgenError::Layout(_)));
    assert!(!path.exists());
}

#[test]
fn test_verify_generated_fixture() {
    let (_dir, path) = scratch("small_file.txt");
    let layout = small_layout();
    let outcome = ensure_fixture(&path, &layout, &GenerateOptions::default()).unwrap();

    let report = verify_fixture(&path, &layout).unwrap();
    assert_eq!(report.lines, 1024);
    assert_eq!(report.sentinels, 15);
    assert_eq!(report.bytes, layout.expected_len());
    if let FixtureOutcome::Created { sha256, .. } = outcome {
        assert_eq!(report.sha256, sha256);
    }
}

#[test]
fn test_verify_detects_in_place_edit() {
    let (_dir, path) = scratch("small_file.txt");
    let layout = small_layout();
    ensure_fixture(&path, &layout, &GenerateOptions::default()).unwrap();

    // Swap one filler byte, keeping the size
    let mut content = fs::read(&path).unwrap();
    content[40] = b'?';
    fs::write(&path, &content).unwrap();

    // Size still matches, so the cheap check passes
    assert!(ensure_fixture(&path, &layout, &GenerateOptions::default()).is_ok());

    let err = verify_fixture(&path, &layout).unwrap_err();
    assert!(matches!(err, FixgenError::Mismatch { line: 2, .. }), "got {err}");
}

#[test]
fn test_verify_checks_manifest_digest() {
    let (_dir, path) = scratch("small_file.txt");
    let layout = small_layout();
    ensure_fixture(&path, &layout, &GenerateOptions::default()).unwrap();

    let mut manifest = Manifest::load(&path).unwrap().unwrap();
    manifest.sha256 = "0".repeat(64);
    manifest.save(&path).unwrap();

    let err = verify_fixture(&path, &layout).unwrap_err();
    assert!(matches!(err, FixgenError::Manifest(_)), "got {err}");
}

#[test]
fn test_regenerating_without_manifest_drops_old_sidecar() {
    let (_dir, path) = scratch("out.txt");
    ensure_fixture(&path, &Layout::new(10, 2048), &GenerateOptions::default()).unwrap();
    fs::remove_file(&path).unwrap();

    let layout = Layout::new(10, 4096);
    let options = GenerateOptions {
        manifest: false,
        ..GenerateOptions::default()
    };
    ensure_fixture(&path, &layout, &options).unwrap();
    assert!(!Manifest::path_for(&path).exists());

    let outcome = ensure_fixture(&path, &layout, &options).unwrap();
    assert!(matches!(outcome, FixtureOutcome::Reused { .. }));
    verify_fixture(&path, &layout).unwrap();
}

#[test]
fn test_regenerating_replaces_old_manifest() {
    let (_dir, path) = scratch("out.txt");
    ensure_fixture(&path, &Layout::new(10, 2048), &GenerateOptions::default()).unwrap();
    fs::remove_file(&path).unwrap();

    let layout = Layout::new(10, 4096);
    ensure_fixture(&path, &layout, &GenerateOptions::default()).unwrap();

    assert_eq!(Manifest::load(&path).unwrap().unwrap().layout, layout);
    verify_fixture(&path, &layout).unwrap();
}

#[test]
fn test_failed_manifest_save_leaves_no_fixture() {
    let (_dir, path) = scratch("out.txt");
    // A directory where the manifest's temp file would go makes the save fail
    let manifest_temp = format!("{}.tmp", Manifest::path_for(&path));
    fs::create_dir(&manifest_temp).unwrap();

    let err = ensure_fixture(&path, &small_layout(), &GenerateOptions::default()).unwrap_err();
    assert!(matches!(err, FixgenError::Io(_)), "got {err}");
    assert!(!path.exists());
    assert!(!Utf8PathBuf::from(format!("{path}.tmp")).exists());

    // Once the obstacle is gone the next run generates normally
    fs::remove_dir(&manifest_temp).unwrap();
    let outcome = ensure_fixture(&path, &small_layout(), &GenerateOptions::default()).unwrap();
    assert!(matches!(outcome, FixtureOutcome::Created { .. }));
    assert!(Manifest::load(&path).unwrap().is_some());
}
