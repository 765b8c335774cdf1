//! Quarantine handling: relocating confirmed-malicious files into an isolated,
//! flat directory under collision-free names.
//!
//! Relocation prefers a single `rename`, which is atomic on filesystems that
//! support it. When the quarantine directory lives on another volume the
//! manager falls back to copy, verify (size + SHA-256), then delete; the
//! original is never removed before the copy is verified.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::hashing::sha256_file;
use crate::model::{QuarantineRecord, RelocationMethod};

/// How many fresh tokens to try before giving up on a free destination name.
const MAX_NAME_ATTEMPTS: usize = 8;

#[derive(Debug, Error)]
pub enum QuarantineError {
    #[error("Failed to create quarantine directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0} has no file name")]
    NoFileName(PathBuf),
    #[error("Could not find a free quarantine name for {0}")]
    NameExhausted(PathBuf),
    #[error("Failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Copy of {from} to {to} did not verify")]
    VerifyFailed { from: PathBuf, to: PathBuf },
    #[error("Copied {from} but could not remove the original: {source}")]
    RemoveOriginal {
        from: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to list quarantine directory {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to delete quarantined file {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One file currently held in the quarantine directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineEntry {
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// Build the quarantined file name: `token` inserted right before the last
/// extension separator of `file_name`.
///
/// Names without an extension (including dot-files such as `.bashrc`) get the
/// token appended at the end.
pub fn quarantined_name(file_name: &OsStr, token: &str) -> OsString {
    let path = Path::new(file_name);
    let mut out = OsString::new();
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => {
            out.push(stem);
            out.push(token);
            out.push(".");
            out.push(ext);
        }
        _ => {
            out.push(file_name);
            out.push(token);
        }
    }
    out
}

/// Fresh unique token. Random (UUID v4), so concurrent callers need no shared state.
pub fn unique_token() -> String {
    format!("_{}", Uuid::new_v4().simple())
}

/// Relocates malicious files into a flat quarantine directory.
#[derive(Debug, Clone)]
pub struct QuarantineManager {
    dir: PathBuf,
}

impl QuarantineManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the quarantine directory (and parents) if missing.
    ///
    /// Idempotent: a directory created concurrently by another worker is fine.
    pub fn ensure_dir(&self) -> Result<(), QuarantineError> {
        if self.dir.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir)
            .map_err(|source| QuarantineError::CreateDir { path: self.dir.clone(), source })?;
        tracing::info!(dir = %self.dir.display(), "Created quarantine directory");
        Ok(())
    }

    /// Move `file` into quarantine under a collision-free name.
    pub fn quarantine(&self, file: &Path) -> Result<QuarantineRecord, QuarantineError> {
        self.ensure_dir()?;
        let file_name =
            file.file_name().ok_or_else(|| QuarantineError::NoFileName(file.to_path_buf()))?;

        let destination = self.free_destination(file_name, file)?;
        let method = match fs::rename(file, &destination) {
            Ok(()) => RelocationMethod::Rename,
            Err(e) if is_cross_device(&e) => {
                tracing::debug!(path = %file.display(), "Cross-volume quarantine; copying");
                relocate_by_copy(file, &destination)?;
                RelocationMethod::CopyThenDelete
            }
            Err(source) => {
                return Err(QuarantineError::Move {
                    from: file.to_path_buf(),
                    to: destination,
                    source,
                })
            }
        };

        tracing::info!(
            original = %file.display(),
            destination = %destination.display(),
            method = method.as_str(),
            "File quarantined"
        );
        Ok(QuarantineRecord {
            original_path: file.to_path_buf(),
            sha256: sha256_file(&destination).ok(),
            destination,
            quarantined_at: Utc::now(),
            method,
        })
    }

    fn free_destination(&self, file_name: &OsStr, file: &Path) -> Result<PathBuf, QuarantineError> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let candidate = self.dir.join(quarantined_name(file_name, &unique_token()));
            if fs::symlink_metadata(&candidate).is_err() {
                return Ok(candidate);
            }
        }
        Err(QuarantineError::NameExhausted(file.to_path_buf()))
    }

    /// Files currently in quarantine, sorted by name. A missing directory is empty.
    pub fn list(&self) -> Result<Vec<QuarantineEntry>, QuarantineError> {
        let mut entries = Vec::new();
        if !self.dir.exists() {
            return Ok(entries);
        }
        let list_err = |source| QuarantineError::List { path: self.dir.clone(), source };
        for entry in fs::read_dir(&self.dir).map_err(list_err)? {
            let entry = entry.map_err(list_err)?;
            let meta = entry.metadata().map_err(list_err)?;
            if !meta.is_file() {
                continue;
            }
            entries.push(QuarantineEntry {
                file_name: entry.file_name().to_string_lossy().to_string(),
                path: entry.path(),
                size_bytes: meta.len(),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
            });
        }
        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(entries)
    }

    /// Permanently delete the named quarantined files. Returns the paths removed;
    /// names not present are skipped.
    pub fn purge<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<PathBuf>, QuarantineError> {
        let mut removed = Vec::new();
        for name in names {
            let name = name.as_ref();
            // Only plain names inside the quarantine dir; never follow `..` or separators.
            if Path::new(name).file_name() != Some(OsStr::new(name)) {
                tracing::warn!(name, "Ignoring purge request for a non-plain file name");
                continue;
            }
            let path = self.dir.join(name);
            match fs::remove_file(&path) {
                Ok(()) => removed.push(path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(QuarantineError::Delete { path, source }),
            }
        }
        Ok(removed)
    }

    /// Delete every file in quarantine.
    pub fn purge_all(&self) -> Result<Vec<PathBuf>, QuarantineError> {
        let names: Vec<String> = self.list()?.into_iter().map(|e| e.file_name).collect();
        self.purge(&names)
    }
}

/// Cross-volume relocation: copy to a staging name, verify, publish, then delete.
///
/// The staging file lives in the destination directory so the final publish is
/// a same-volume rename. On any failure the original is left untouched.
pub(crate) fn relocate_by_copy(from: &Path, to: &Path) -> Result<(), QuarantineError> {
    let move_err = |source| QuarantineError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    let mut staging_name = OsString::from(".");
    staging_name.push(to.file_name().unwrap_or_else(|| OsStr::new("quarantine")));
    staging_name.push(".partial");
    let staging = to.with_file_name(staging_name);

    let copied = fs::copy(from, &staging).map_err(move_err)?;
    let verified = fs::OpenOptions::new()
        .write(true)
        .open(&staging)
        .and_then(|f| f.sync_all())
        .is_ok()
        && copied == fs::metadata(from).map(|m| m.len()).unwrap_or(u64::MAX)
        && matches!(
            (sha256_file(from), sha256_file(&staging)),
            (Ok(a), Ok(b)) if a == b
        );
    if !verified {
        let _ = fs::remove_file(&staging);
        return Err(QuarantineError::VerifyFailed { from: from.to_path_buf(), to: to.to_path_buf() });
    }

    if let Err(source) = fs::rename(&staging, to) {
        let _ = fs::remove_file(&staging);
        return Err(move_err(source));
    }

    if let Err(source) = fs::remove_file(from) {
        // Keep exactly one copy: the original stays put, the duplicate goes.
        let _ = fs::remove_file(to);
        return Err(QuarantineError::RemoveOriginal { from: from.to_path_buf(), source });
    }
    Ok(())
}

fn is_cross_device(e: &io::Error) -> bool {
    #[cfg(unix)]
    const EXDEV: i32 = 18;
    #[cfg(windows)]
    const EXDEV: i32 = 17; // ERROR_NOT_SAME_DEVICE
    #[cfg(not(any(unix, windows)))]
    const EXDEV: i32 = -1;
    e.raw_os_error() == Some(EXDEV)
}
