use serde::{Deserialize, Serialize};

use crate::model::QuarantineRecord;
use crate::scan::{ScanReport, ScanSummary};

/// One completed scan as stored in `scan_runs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanRunRecord {
    /// Row id; `None` until persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub root: String,
    /// RFC 3339 timestamps.
    pub started_at: String,
    pub finished_at: String,
    pub summary: ScanSummary,
}

impl ScanRunRecord {
    pub fn from_report(report: &ScanReport) -> Self {
        Self {
            id: None,
            root: report.root.display().to_string(),
            started_at: report.started_at.to_rfc3339(),
            finished_at: report.finished_at.to_rfc3339(),
            summary: report.summary(),
        }
    }
}

/// One quarantine action as stored in `quarantine_records`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuarantineLogRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Owning scan run, if the action happened during a recorded scan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<i64>,
    pub original_path: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// `rename` or `copy_then_delete`.
    pub method: String,
    pub quarantined_at: String,
}

impl QuarantineLogRecord {
    pub fn from_record(run_id: Option<i64>, record: &QuarantineRecord) -> Self {
        Self {
            id: None,
            run_id,
            original_path: record.original_path.display().to_string(),
            destination: record.destination.display().to_string(),
            sha256: record.sha256.clone(),
            method: record.method.as_str().to_string(),
            quarantined_at: record.quarantined_at.to_rfc3339(),
        }
    }
}
