//! Core data model for a scan: targets, per-file records, verdicts, quarantine records.
//!
//! These types are produced by the traversal and detection layers and consumed
//! by reporting, persistence and the CLI. None of them perform IO.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discriminator for a filesystem entry produced by traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Directory,
    File,
}

/// A filesystem path plus its kind. Produced by traversal; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTarget {
    pub path: PathBuf,
    pub kind: TargetKind,
}

impl ScanTarget {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), kind: TargetKind::File }
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), kind: TargetKind::Directory }
    }
}

/// Format classification that selects the detection strategy for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatClass {
    /// Recognized executable container (PE); routed to the classifier bridge.
    ExecutableContainer,
    /// Anything else; routed to hash + signature lookup.
    Other,
}

/// Per-file outcome of the detection procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Clean,
    Malicious,
    /// Classification was impossible (I/O or external-service failure).
    /// Never reported as clean and never quarantined.
    Indeterminate,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Clean => "clean",
            Verdict::Malicious => "malicious",
            Verdict::Indeterminate => "indeterminate",
        }
    }
}

/// Ephemeral per-file state owned by the traversal step that processes the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    /// SHA-256 hex digest; `None` when the file took the classifier path or could not be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    pub format: FormatClass,
    pub verdict: Verdict,
    /// Why the verdict is indeterminate, or other notes worth surfacing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>, format: FormatClass, verdict: Verdict) -> Self {
        Self { path: path.into(), digest: None, format, verdict, detail: None }
    }

    pub fn with_digest(mut self, digest: Option<String>) -> Self {
        self.digest = digest;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// How a file reached the quarantine directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelocationMethod {
    /// Single atomic rename on the same volume.
    Rename,
    /// Cross-volume fallback: verified copy, then removal of the original.
    CopyThenDelete,
}

impl RelocationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RelocationMethod::Rename => "rename",
            RelocationMethod::CopyThenDelete => "copy_then_delete",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "rename" => Some(RelocationMethod::Rename),
            "copy_then_delete" => Some(RelocationMethod::CopyThenDelete),
            _ => None,
        }
    }
}

/// Record of one successful quarantine action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineRecord {
    pub original_path: PathBuf,
    pub destination: PathBuf,
    pub quarantined_at: DateTime<Utc>,
    pub method: RelocationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}
