use std::fs;

use rusqlite::Connection;
use tempfile::tempdir;

use vault_core::db::{DbError, HistoryDb, QuarantineLogRecord, ScanRunRecord, CURRENT_SCHEMA_VERSION};
use vault_core::hashing::sha256_file;
use vault_core::quarantine::QuarantineManager;
use vault_core::scan::{ScanSummary, Scanner};
use vault_core::services::backends::MzHeaderDetector;
use vault_core::services::detection::UnconfiguredBridge;
use vault_core::signatures::SignatureStore;

#[test]
fn fresh_database_is_at_current_schema() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("state/history.db");
    let db = HistoryDb::open(&path).expect("open db");
    let version: i32 =
        db.connection().query_row("PRAGMA user_version;", [], |row| row.get(0)).unwrap();
    assert_eq!(version, CURRENT_SCHEMA_VERSION);
    assert!(db.list_scan_runs().unwrap().is_empty());
}

#[test]
fn newer_schema_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("history.db");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("PRAGMA user_version = 99;").unwrap();
    }
    let err = HistoryDb::open(&path).unwrap_err();
    assert!(matches!(err, DbError::UnsupportedSchemaVersion { found: 99, .. }));
}

#[test]
fn manual_inserts_round_trip() {
    let db = HistoryDb::open_in_memory().expect("open db");
    let run_id = db
        .insert_scan_run(&ScanRunRecord {
            id: None,
            root: "/srv/share".into(),
            started_at: "t0".into(),
            finished_at: "t1".into(),
            summary: ScanSummary { files: 3, clean: 2, malicious: 1, quarantined: 1, ..Default::default() },
        })
        .unwrap();
    db.insert_quarantine_record(&QuarantineLogRecord {
        id: None,
        run_id: Some(run_id),
        original_path: "/srv/share/a.txt".into(),
        destination: "/q/a_x.txt".into(),
        sha256: Some("abc".into()),
        method: "rename".into(),
        quarantined_at: "t0".into(),
    })
    .unwrap();
    db.insert_quarantine_record(&QuarantineLogRecord {
        id: None,
        run_id: None,
        original_path: "/elsewhere/b.txt".into(),
        destination: "/q/b_y.txt".into(),
        sha256: None,
        method: "copy_then_delete".into(),
        quarantined_at: "t2".into(),
    })
    .unwrap();

    let runs = db.list_scan_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].id, Some(run_id));
    assert_eq!(runs[0].summary.quarantined, 1);

    assert_eq!(db.list_quarantine_records(None).unwrap().len(), 2);
    let for_run = db.list_quarantine_records(Some(run_id)).unwrap();
    assert_eq!(for_run.len(), 1);
    assert_eq!(for_run[0].sha256.as_deref(), Some("abc"));
}

#[test]
fn scan_report_is_recorded_with_its_quarantine_actions() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path().join("scan");
    fs::create_dir_all(&root).unwrap();
    let bad = root.join("bad.doc");
    fs::write(&bad, "macro payload").unwrap();
    fs::write(root.join("ok.doc"), "letter").unwrap();
    let digest = sha256_file(&bad).unwrap();

    let scanner = Scanner::new(
        SignatureStore::from_digests([digest.clone()]),
        Box::new(MzHeaderDetector),
        Box::new(UnconfiguredBridge),
        QuarantineManager::new(dir.path().join("q")),
    );
    let report = scanner.scan(&root).unwrap();

    let db = HistoryDb::open(&dir.path().join("history.db")).unwrap();
    let run_id = db.record_report(&report).unwrap();

    let runs = db.list_scan_runs().unwrap();
    assert_eq!(runs[0].root, root.display().to_string());
    assert_eq!(runs[0].summary, report.summary());

    let records = db.list_quarantine_records(Some(run_id)).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].original_path, bad.display().to_string());
    assert_eq!(records[0].sha256.as_deref(), Some(digest.as_str()));
    assert_eq!(records[0].method, "rename");
}
