//! Known-malicious content hashes.
//!
//! The signature list is a plain text file with one hex SHA-256 digest per
//! line. It is loaded once per scan and never mutated afterwards, so a
//! `SignatureStore` can be shared across worker threads without locking.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("Failed to read signature list at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Immutable set of known-malicious digests.
///
/// Membership is exact and case-sensitive: `ABC...` and `abc...` are different
/// signatures. Surrounding whitespace (including `\r` from CRLF files) is
/// stripped from each line and blank lines are ignored.
#[derive(Debug, Clone, Default)]
pub struct SignatureStore {
    digests: HashSet<String>,
    source: Option<PathBuf>,
}

impl SignatureStore {
    /// Load the full signature list from `path`.
    pub fn load(path: &Path) -> Result<Self, SignatureError> {
        let body = fs::read_to_string(path)
            .map_err(|source| SignatureError::Read { path: path.to_path_buf(), source })?;
        let mut store = Self::parse(&body);
        store.source = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), signatures = store.len(), "Loaded signature list");
        Ok(store)
    }

    /// Build a store from the text form of a signature list.
    pub fn parse(body: &str) -> Self {
        let digests =
            body.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect();
        Self { digests, source: None }
    }

    pub fn from_digests<I, S>(digests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { digests: digests.into_iter().map(Into::into).collect(), source: None }
    }

    pub fn is_known_malicious(&self, digest: &str) -> bool {
        self.digests.contains(digest)
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// File the store was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}
