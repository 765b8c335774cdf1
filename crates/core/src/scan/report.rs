use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{FileRecord, QuarantineRecord, Verdict};

/// What happened when a malicious file was sent to quarantine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QuarantineStatus {
    Isolated(QuarantineRecord),
    /// The file is malicious but still sits at its original path.
    Failed { reason: String },
}

/// Reporting bucket for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileStatus {
    Clean,
    Quarantined,
    MaliciousNotIsolated,
    Indeterminate,
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Clean => "clean",
            FileStatus::Quarantined => "quarantined",
            FileStatus::MaliciousNotIsolated => "malicious-not-isolated",
            FileStatus::Indeterminate => "indeterminate",
        }
    }
}

/// Final per-file result: the detection record plus any quarantine action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    #[serde(flatten)]
    pub record: FileRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarantine: Option<QuarantineStatus>,
}

impl FileReport {
    pub fn status(&self) -> FileStatus {
        match (self.record.verdict, &self.quarantine) {
            (Verdict::Clean, _) => FileStatus::Clean,
            (Verdict::Indeterminate, _) => FileStatus::Indeterminate,
            (Verdict::Malicious, Some(QuarantineStatus::Isolated(_))) => FileStatus::Quarantined,
            (Verdict::Malicious, _) => FileStatus::MaliciousNotIsolated,
        }
    }

    /// One human-readable line describing the outcome.
    pub fn describe(&self) -> String {
        let path = self.record.path.display();
        match (&self.quarantine, self.status()) {
            (_, FileStatus::Clean) => format!("File is clean: {path}"),
            (Some(QuarantineStatus::Isolated(q)), _) => format!(
                "Virus detected in file: {path} -> moved to quarantine: {}",
                q.destination.display()
            ),
            (Some(QuarantineStatus::Failed { reason }), _) => {
                format!("Virus detected in file: {path} -> NOT ISOLATED: {reason}")
            }
            (None, FileStatus::MaliciousNotIsolated) => {
                format!("Virus detected in file: {path} -> NOT ISOLATED")
            }
            (None, _) => format!(
                "Could not classify file: {path} ({})",
                self.record.detail.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

/// A directory entry that traversal could not read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalIssue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub files: usize,
    pub clean: usize,
    pub malicious: usize,
    pub quarantined: usize,
    pub not_isolated: usize,
    pub indeterminate: usize,
    pub traversal_errors: usize,
}

/// Aggregated outcome of one scan invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub files: Vec<FileReport>,
    pub traversal_errors: Vec<TraversalIssue>,
}

impl ScanReport {
    pub fn summary(&self) -> ScanSummary {
        let mut summary = ScanSummary {
            files: self.files.len(),
            traversal_errors: self.traversal_errors.len(),
            ..ScanSummary::default()
        };
        for file in &self.files {
            match file.status() {
                FileStatus::Clean => summary.clean += 1,
                FileStatus::Quarantined => {
                    summary.malicious += 1;
                    summary.quarantined += 1;
                }
                FileStatus::MaliciousNotIsolated => {
                    summary.malicious += 1;
                    summary.not_isolated += 1;
                }
                FileStatus::Indeterminate => summary.indeterminate += 1,
            }
        }
        summary
    }

    /// Quarantine records of every successfully isolated file.
    pub fn quarantine_records(&self) -> impl Iterator<Item = &QuarantineRecord> {
        self.files.iter().filter_map(|f| match &f.quarantine {
            Some(QuarantineStatus::Isolated(record)) => Some(record),
            _ => None,
        })
    }

    pub fn duration_secs(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FormatClass, RelocationMethod};

    fn report(verdict: Verdict, quarantine: Option<QuarantineStatus>) -> FileReport {
        FileReport { record: FileRecord::new("/x/a.txt", FormatClass::Other, verdict), quarantine }
    }

    #[test]
    fn malicious_without_isolation_is_distinct_from_clean() {
        let failed = report(
            Verdict::Malicious,
            Some(QuarantineStatus::Failed { reason: "permission denied".into() }),
        );
        assert_eq!(failed.status(), FileStatus::MaliciousNotIsolated);
        assert!(failed.describe().contains("NOT ISOLATED"));
        assert_eq!(report(Verdict::Clean, None).describe(), "File is clean: /x/a.txt");
    }

    #[test]
    fn summary_counts_every_bucket() {
        let isolated = QuarantineStatus::Isolated(QuarantineRecord {
            original_path: "/x/a.txt".into(),
            destination: "/q/a_1.txt".into(),
            quarantined_at: Utc::now(),
            method: RelocationMethod::Rename,
            sha256: None,
        });
        let now = Utc::now();
        let scan = ScanReport {
            root: "/x".into(),
            started_at: now,
            finished_at: now,
            files: vec![
                report(Verdict::Clean, None),
                report(Verdict::Malicious, Some(isolated)),
                report(Verdict::Malicious, Some(QuarantineStatus::Failed { reason: "x".into() })),
                report(Verdict::Indeterminate, None),
            ],
            traversal_errors: vec![TraversalIssue { path: None, message: "denied".into() }],
        };
        let summary = scan.summary();
        assert_eq!(summary.files, 4);
        assert_eq!(summary.clean, 1);
        assert_eq!(summary.malicious, 2);
        assert_eq!(summary.quarantined, 1);
        assert_eq!(summary.not_isolated, 1);
        assert_eq!(summary.indeterminate, 1);
        assert_eq!(summary.traversal_errors, 1);
        assert_eq!(scan.quarantine_records().count(), 1);
    }
}
