//! Scan history database.
//!
//! An optional SQLite file recording every completed scan run and every file
//! moved into quarantine, so operators can answer "what was isolated, when, and
//! from where" after the terminal output is gone.

mod history_db;
mod models;

pub use history_db::{DbError, DbResult, HistoryDb, CURRENT_SCHEMA_VERSION};
pub use models::{QuarantineLogRecord, ScanRunRecord};
