use std::fs;
use std::path::Path;

use tempfile::tempdir;

use vault_core::hashing::sha256_file;
use vault_core::model::{RelocationMethod, Verdict};
use vault_core::quarantine::QuarantineManager;
use vault_core::scan::{FileStatus, QuarantineStatus, Scanner};
use vault_core::services::backends::MzHeaderDetector;
use vault_core::services::detection::UnconfiguredBridge;
use vault_core::signatures::SignatureStore;

fn scanner_with(quarantine: &Path, bad: &[&Path]) -> Scanner {
    let digests: Vec<String> = bad.iter().map(|p| sha256_file(p).unwrap()).collect();
    Scanner::new(
        SignatureStore::from_digests(digests),
        Box::new(MzHeaderDetector),
        Box::new(UnconfiguredBridge),
        QuarantineManager::new(quarantine),
    )
}

#[test]
fn known_file_is_quarantined_and_unknown_file_stays() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("scan");
    fs::create_dir_all(&root).unwrap();
    let a = root.join("a.txt");
    let b = root.join("b.txt");
    fs::write(&a, "known bad content").unwrap();
    fs::write(&b, "harmless").unwrap();

    let quarantine = dir.path().join("quarantine");
    let scanner = scanner_with(&quarantine, &[&a]);
    let report = scanner.scan(&root).unwrap();

    assert_eq!(report.files.len(), 2);
    assert!(!a.exists());
    assert!(b.exists());

    let a_report = report.files.iter().find(|f| f.record.path == a).unwrap();
    assert_eq!(a_report.status(), FileStatus::Quarantined);
    let Some(QuarantineStatus::Isolated(record)) = &a_report.quarantine else {
        panic!("a.txt was not isolated: {a_report:?}");
    };
    assert_eq!(record.method, RelocationMethod::Rename);
    let name = record.destination.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("a_") && name.ends_with(".txt"), "unexpected name {name}");
    assert_eq!(fs::read_to_string(&record.destination).unwrap(), "known bad content");

    let b_report = report.files.iter().find(|f| f.record.path == b).unwrap();
    assert_eq!(b_report.record.verdict, Verdict::Clean);
    assert!(b_report.record.digest.is_some());

    let summary = report.summary();
    assert_eq!(summary.clean, 1);
    assert_eq!(summary.quarantined, 1);
}

#[test]
fn same_named_files_get_distinct_quarantine_names() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("scan");
    fs::create_dir_all(root.join("one")).unwrap();
    fs::create_dir_all(root.join("two")).unwrap();
    let first = root.join("one/payload.bin");
    let second = root.join("two/payload.bin");
    fs::write(&first, "same bytes").unwrap();
    fs::write(&second, "same bytes").unwrap();

    let quarantine = dir.path().join("q");
    let scanner = scanner_with(&quarantine, &[&first]);
    let report = scanner.scan(&root).unwrap();

    assert_eq!(report.summary().quarantined, 2);
    let held = QuarantineManager::new(&quarantine).list().unwrap();
    assert_eq!(held.len(), 2);
    assert_ne!(held[0].file_name, held[1].file_name);
}

#[test]
fn rerun_after_quarantine_is_a_no_op() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("scan");
    fs::create_dir_all(&root).unwrap();
    let bad = root.join("bad.txt");
    fs::write(&bad, "evil").unwrap();

    let scanner = scanner_with(&dir.path().join("q"), &[&bad]);
    assert_eq!(scanner.scan(&root).unwrap().summary().quarantined, 1);

    let again = scanner.scan(&root).unwrap();
    assert!(again.files.is_empty());
    assert!(again.traversal_errors.is_empty());
}

#[test]
fn every_file_in_a_deep_tree_is_visited_once() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("scan");
    let mut current = root.clone();
    for depth in 0..200 {
        current = current.join("d");
        fs::create_dir_all(&current).unwrap();
        fs::write(current.join(format!("f{depth}.txt")), format!("{depth}")).unwrap();
    }

    let scanner = scanner_with(&dir.path().join("q"), &[]);
    let report = scanner.scan(&root).unwrap();
    assert_eq!(report.files.len(), 200);

    let mut paths: Vec<_> = report.files.iter().map(|f| f.record.path.clone()).collect();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 200);
}

#[test]
fn parallel_scan_matches_sequential_outcome() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("scan");
    fs::create_dir_all(&root).unwrap();
    for i in 0..40 {
        let body = if i % 10 == 0 { "bad".to_string() } else { format!("good {i}") };
        fs::write(root.join(format!("file{i}.txt")), body).unwrap();
    }
    let sample = root.join("file0.txt");

    let scanner = scanner_with(&dir.path().join("q"), &[&sample]).with_workers(4);
    assert_eq!(scanner.workers(), 4);
    let report = scanner.scan(&root).unwrap();

    let summary = report.summary();
    assert_eq!(summary.files, 40);
    assert_eq!(summary.quarantined, 4);
    assert_eq!(summary.clean, 36);
    assert_eq!(QuarantineManager::new(dir.path().join("q")).list().unwrap().len(), 4);
}

#[test]
fn callback_sees_every_file() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("scan");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("x.txt"), "x").unwrap();
    fs::write(root.join("y.txt"), "y").unwrap();

    let seen = std::sync::Mutex::new(Vec::new());
    let scanner = scanner_with(&dir.path().join("q"), &[]);
    scanner.scan_with(&root, |r| seen.lock().unwrap().push(r.record.path.clone())).unwrap();
    assert_eq!(seen.into_inner().unwrap().len(), 2);
}

#[cfg(unix)]
#[test]
fn unreadable_file_does_not_stop_siblings() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let root = dir.path().join("scan");
    fs::create_dir_all(&root).unwrap();
    let locked = root.join("locked.txt");
    let open = root.join("open.txt");
    fs::write(&locked, "secret").unwrap();
    fs::write(&open, "fine").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read(&locked).is_ok() {
        // Running with privileges that ignore file modes.
        return;
    }

    let scanner = scanner_with(&dir.path().join("q"), &[]);
    let report = scanner.scan(&root).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    let locked_report = report.files.iter().find(|f| f.record.path == locked).unwrap();
    assert_eq!(locked_report.status(), FileStatus::Indeterminate);
    assert!(locked_report.quarantine.is_none());
    let open_report = report.files.iter().find(|f| f.record.path == open).unwrap();
    assert_eq!(open_report.status(), FileStatus::Clean);
}

#[cfg(unix)]
#[test]
fn symlinks_are_not_followed() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("scan");
    fs::create_dir_all(&root).unwrap();
    let outside = dir.path().join("outside.txt");
    fs::write(&outside, "bad").unwrap();
    std::os::unix::fs::symlink(&outside, root.join("link.txt")).unwrap();

    let scanner = scanner_with(&dir.path().join("q"), &[&outside]);
    let report = scanner.scan(&root).unwrap();
    assert!(report.files.is_empty());
    assert!(outside.exists());
}

#[cfg(unix)]
#[test]
fn failed_quarantine_is_flagged_not_isolated() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("scan");
    fs::create_dir_all(&root).unwrap();
    let bad = root.join("bad.txt");
    fs::write(&bad, "evil").unwrap();

    // A regular file where the quarantine directory should be.
    let blocker = dir.path().join("q");
    fs::write(&blocker, "not a directory").unwrap();

    let scanner = scanner_with(&blocker, &[&bad]);
    let report = scanner.scan(&root).unwrap();
    let file = &report.files[0];
    assert_eq!(file.status(), FileStatus::MaliciousNotIsolated);
    assert!(matches!(file.quarantine, Some(QuarantineStatus::Failed { .. })));
    assert!(file.describe().contains("NOT ISOLATED"));
    assert!(bad.exists());
    assert_eq!(report.summary().not_isolated, 1);
}
