use std::fs;
use std::path::Path;

use rusqlite::{params, Connection, Row};
use thiserror::Error;

use crate::db::{QuarantineLogRecord, ScanRunRecord};
use crate::scan::{ScanReport, ScanSummary};

/// `0` means "no schema yet" (fresh DB).
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 0;

/// Latest schema version this crate knows about.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Failed to create history directory: {0}")]
    CreateDir(#[source] std::io::Error),

    /// The database was created with a newer schema version than we support.
    #[error(
        "Unsupported schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },
}

pub type DbResult<T> = Result<T, DbError>;

/// SQLite-backed scan history.
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open (or create) the history database and bring its schema up to date.
    pub fn open(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
        }
        let conn = Connection::open(path)?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// In-memory database, mostly for tests.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn insert_scan_run(&self, record: &ScanRunRecord) -> DbResult<i64> {
        let s = &record.summary;
        self.conn.execute(
            r#"
            INSERT INTO scan_runs (root, started_at, finished_at, files, clean, malicious,
                                   quarantined, not_isolated, indeterminate, traversal_errors)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                record.root,
                record.started_at,
                record.finished_at,
                s.files as i64,
                s.clean as i64,
                s.malicious as i64,
                s.quarantined as i64,
                s.not_isolated as i64,
                s.indeterminate as i64,
                s.traversal_errors as i64,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_quarantine_record(&self, record: &QuarantineLogRecord) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO quarantine_records (run_id, original_path, destination, sha256, method, quarantined_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.run_id,
                record.original_path,
                record.destination,
                record.sha256,
                record.method,
                record.quarantined_at
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Persist a finished scan and all of its quarantine actions atomically.
    pub fn record_report(&self, report: &ScanReport) -> DbResult<i64> {
        let tx = self.conn.unchecked_transaction()?;
        let run_id = self.insert_scan_run(&ScanRunRecord::from_report(report))?;
        for record in report.quarantine_records() {
            self.insert_quarantine_record(&QuarantineLogRecord::from_record(Some(run_id), record))?;
        }
        tx.commit()?;
        tracing::debug!(run_id, "Recorded scan run");
        Ok(run_id)
    }

    /// Scan runs, newest first.
    pub fn list_scan_runs(&self) -> DbResult<Vec<ScanRunRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, root, started_at, finished_at, files, clean, malicious,
                   quarantined, not_isolated, indeterminate, traversal_errors
            FROM scan_runs
            ORDER BY id DESC
            "#,
        )?;
        let rows = stmt.query_map([], scan_run_from_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Quarantine actions, newest first; optionally restricted to one run.
    pub fn list_quarantine_records(&self, run_id: Option<i64>) -> DbResult<Vec<QuarantineLogRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, run_id, original_path, destination, sha256, method, quarantined_at
            FROM quarantine_records
            WHERE ?1 IS NULL OR run_id = ?1
            ORDER BY id DESC
            "#,
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok(QuarantineLogRecord {
                id: Some(row.get(0)?),
                run_id: row.get(1)?,
                original_path: row.get(2)?,
                destination: row.get(3)?,
                sha256: row.get(4)?,
                method: row.get(5)?,
                quarantined_at: row.get(6)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn scan_run_from_row(row: &Row<'_>) -> rusqlite::Result<ScanRunRecord> {
    let count = |idx: usize| -> rusqlite::Result<usize> { Ok(row.get::<_, i64>(idx)?.max(0) as usize) };
    Ok(ScanRunRecord {
        id: Some(row.get(0)?),
        root: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        summary: ScanSummary {
            files: count(4)?,
            clean: count(5)?,
            malicious: count(6)?,
            quarantined: count(7)?,
            not_isolated: count(8)?,
            indeterminate: count(9)?,
            traversal_errors: count(10)?,
        },
    })
}

fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let mut current_version = current_schema_version(conn)?;

    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version == 0 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS scan_runs (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                root             TEXT NOT NULL,
                started_at       TEXT NOT NULL,
                finished_at      TEXT NOT NULL,
                files            INTEGER NOT NULL,
                clean            INTEGER NOT NULL,
                malicious        INTEGER NOT NULL,
                quarantined      INTEGER NOT NULL,
                not_isolated     INTEGER NOT NULL,
                indeterminate    INTEGER NOT NULL,
                traversal_errors INTEGER NOT NULL
            );

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
        current_version = 1;
    }

    if current_version < 2 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS quarantine_records (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id         INTEGER REFERENCES scan_runs(id),
                original_path  TEXT NOT NULL,
                destination    TEXT NOT NULL,
                sha256         TEXT,
                method         TEXT NOT NULL,
                quarantined_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_quarantine_records_run ON quarantine_records(run_id);

            PRAGMA user_version = 2;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}

fn current_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}
