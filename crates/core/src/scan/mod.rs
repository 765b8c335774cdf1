//! Traversal and the per-file decision procedure.
//!
//! A [`Scanner`] owns everything one scan invocation needs: the signature set
//! (loaded once, read-only afterwards), the format detector, the classifier
//! bridge and the quarantine manager. Only an invalid root (or an unusable
//! signature list when building from config) aborts a run; every other failure
//! is contained in the affected file's [`FileReport`].

pub mod report;

pub use report::{FileReport, FileStatus, QuarantineStatus, ScanReport, ScanSummary, TraversalIssue};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rayon::prelude::*;
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::config::ScannerConfig;
use crate::hashing::sha256_file;
use crate::model::{FileRecord, FormatClass, ScanTarget, TargetKind, Verdict};
use crate::quarantine::QuarantineManager;
use crate::services::backends::{bridge_from_config, detector_from_config};
use crate::services::detection::{ClassifierBridge, FormatDetector};
use crate::signatures::{SignatureError, SignatureStore};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Scan root does not exist: {0}")]
    RootNotFound(PathBuf),
    #[error("Scan root is not a directory: {0}")]
    RootNotDirectory(PathBuf),
    #[error("Failed to inspect scan root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Scan root is the quarantine directory: {0}")]
    RootIsQuarantine(PathBuf),
    #[error(transparent)]
    Signatures(#[from] SignatureError),
    #[error("Failed to start scan workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl ScanError {
    /// True when the caller handed us a bad root rather than the scanner failing.
    pub fn is_invalid_root(&self) -> bool {
        matches!(
            self,
            ScanError::RootNotFound(_)
                | ScanError::RootNotDirectory(_)
                | ScanError::RootUnreadable { .. }
                | ScanError::RootIsQuarantine(_)
        )
    }
}

pub struct Scanner {
    signatures: SignatureStore,
    detector: Box<dyn FormatDetector>,
    bridge: Box<dyn ClassifierBridge>,
    quarantine: QuarantineManager,
    workers: usize,
}

impl Scanner {
    pub fn new(
        signatures: SignatureStore,
        detector: Box<dyn FormatDetector>,
        bridge: Box<dyn ClassifierBridge>,
        quarantine: QuarantineManager,
    ) -> Self {
        Self { signatures, detector, bridge, quarantine, workers: 1 }
    }

    /// Number of files decided concurrently (values below 1 mean sequential).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Build a scanner from configuration, loading a fresh signature set.
    pub fn from_config(config: &ScannerConfig) -> Result<Self, ScanError> {
        let signatures = SignatureStore::load(&config.signature_file)?;
        let detector = detector_from_config(&config.format_detector, config.external_timeout());
        let bridge = bridge_from_config(config);
        Ok(Self::new(signatures, detector, bridge, QuarantineManager::new(&config.quarantine_dir))
            .with_workers(config.worker_count()))
    }

    pub fn signatures(&self) -> &SignatureStore {
        &self.signatures
    }

    pub fn quarantine_manager(&self) -> &QuarantineManager {
        &self.quarantine
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Decide one file. Exactly one strategy runs, chosen by format class.
    pub fn inspect(&self, path: &Path) -> FileRecord {
        if self.detector.is_executable_container(path) {
            return match self.bridge.verdict_for(path) {
                Ok(verdict) => FileRecord::new(path, FormatClass::ExecutableContainer, verdict),
                Err(e) => {
                    tracing::warn!(path = %path.display(), bridge = self.bridge.name(), error = %e, "Classification failed");
                    FileRecord::new(path, FormatClass::ExecutableContainer, Verdict::Indeterminate)
                        .with_detail(e.to_string())
                }
            };
        }

        match sha256_file(path) {
            Ok(digest) => {
                let verdict = if self.signatures.is_known_malicious(&digest) {
                    Verdict::Malicious
                } else {
                    Verdict::Clean
                };
                FileRecord::new(path, FormatClass::Other, verdict).with_digest(Some(digest))
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to hash file");
                FileRecord::new(path, FormatClass::Other, Verdict::Indeterminate)
                    .with_detail(format!("unreadable: {e}"))
            }
        }
    }

    /// Decide one file and quarantine it when malicious.
    pub fn process_file(&self, path: &Path) -> FileReport {
        let record = self.inspect(path);
        tracing::debug!(path = %path.display(), verdict = record.verdict.as_str(), "File decided");
        let quarantine = match record.verdict {
            Verdict::Malicious => Some(match self.quarantine.quarantine(path) {
                Ok(q) => QuarantineStatus::Isolated(q),
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Malicious file could not be quarantined");
                    QuarantineStatus::Failed { reason: e.to_string() }
                }
            }),
            _ => None,
        };
        FileReport { record, quarantine }
    }

    pub fn scan(&self, root: &Path) -> Result<ScanReport, ScanError> {
        self.scan_with(root, |_| {})
    }

    /// Walk `root` and decide every regular file, calling `on_file` as each one completes.
    ///
    /// With more than one worker the callback runs on pool threads and the
    /// order of `files` in the report is unspecified.
    pub fn scan_with<F>(&self, root: &Path, on_file: F) -> Result<ScanReport, ScanError>
    where
        F: Fn(&FileReport) + Sync,
    {
        check_root(root)?;
        let root = &absolute(root);
        let skip_dir = resolve_existing_prefix(self.quarantine.dir());
        if skip_dir.is_some() && fs::canonicalize(root).ok() == skip_dir {
            return Err(ScanError::RootIsQuarantine(root.to_path_buf()));
        }
        let started_at = Utc::now();
        let mut traversal_errors = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !is_skipped_dir(entry, skip_dir.as_deref()));

        let files = if self.workers <= 1 {
            let mut files = Vec::new();
            for path in targets(walker, &mut traversal_errors).filter_map(files_only) {
                let report = self.process_file(&path);
                on_file(&report);
                files.push(report);
            }
            files
        } else {
            let paths: Vec<PathBuf> =
                targets(walker, &mut traversal_errors).filter_map(files_only).collect();
            tracing::debug!(files = paths.len(), workers = self.workers, "Deciding files in parallel");
            let pool = rayon::ThreadPoolBuilder::new().num_threads(self.workers).build()?;
            pool.install(|| {
                paths
                    .par_iter()
                    .map(|path| {
                        let report = self.process_file(path);
                        on_file(&report);
                        report
                    })
                    .collect()
            })
        };

        let report = ScanReport {
            root: root.to_path_buf(),
            started_at,
            finished_at: Utc::now(),
            files,
            traversal_errors,
        };
        let summary = report.summary();
        tracing::info!(
            root = %root.display(),
            files = summary.files,
            malicious = summary.malicious,
            quarantined = summary.quarantined,
            indeterminate = summary.indeterminate,
            "Scan finished"
        );
        Ok(report)
    }
}

/// Fail with a typed error unless `root` is an existing directory.
pub fn check_root(root: &Path) -> Result<(), ScanError> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ScanError::RootNotDirectory(root.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(ScanError::RootNotFound(root.to_path_buf()))
        }
        Err(source) => Err(ScanError::RootUnreadable { path: root.to_path_buf(), source }),
    }
}

/// Targets yielded by `walker`; walk failures are pushed onto `errors`.
///
/// Symlinks and special files (sockets, FIFOs, devices) are dropped here.
fn targets<'a, I>(walker: I, errors: &'a mut Vec<TraversalIssue>) -> impl Iterator<Item = ScanTarget> + 'a
where
    I: Iterator<Item = walkdir::Result<DirEntry>> + 'a,
{
    walker.filter_map(move |entry| {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf);
                tracing::warn!(path = ?path, error = %e, "Traversal error");
                errors.push(TraversalIssue { path, message: e.to_string() });
                return None;
            }
        };
        let file_type = entry.file_type();
        if file_type.is_dir() {
            Some(ScanTarget::directory(entry.into_path()))
        } else if file_type.is_file() {
            Some(ScanTarget::file(entry.into_path()))
        } else {
            if file_type.is_symlink() {
                tracing::debug!(path = %entry.path().display(), "Skipping symlink");
            } else {
                tracing::debug!(path = %entry.path().display(), "Skipping special file");
            }
            None
        }
    })
}

fn files_only(target: ScanTarget) -> Option<PathBuf> {
    match target.kind {
        TargetKind::File => Some(target.path),
        TargetKind::Directory => None,
    }
}

fn is_skipped_dir(entry: &DirEntry, skip_dir: Option<&Path>) -> bool {
    let Some(skip_dir) = skip_dir else {
        return false;
    };
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let skipped = fs::canonicalize(entry.path()).map(|p| p == skip_dir).unwrap_or(false);
    if skipped {
        tracing::debug!(path = %entry.path().display(), "Skipping quarantine directory");
    }
    skipped
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
}

/// Canonical form of `path` even when its tail does not exist yet.
///
/// The longest existing ancestor is canonicalized and the missing components
/// are appended, so a quarantine directory created mid-scan still compares equal.
fn resolve_existing_prefix(path: &Path) -> Option<PathBuf> {
    let absolute = absolute(path);
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            return Some(missing.iter().rev().fold(canonical, |acc, part| acc.join(part)));
        }
        missing.push(existing.file_name()?.to_os_string());
        existing = existing.parent()?;
    }
}
