use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Verdict;
use crate::services::external::ExternalError;

/// Opaque feature representation produced by the extractor.
///
/// The core never interprets it; it is handed to the classifier byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLine(pub OsString);

impl FeatureLine {
    /// Wrap raw extractor output without decoding it.
    #[cfg(unix)]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        use std::os::unix::ffi::OsStringExt;
        Self(OsString::from_vec(bytes))
    }

    #[cfg(not(unix))]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(OsString::from(String::from_utf8_lossy(&bytes).into_owned()))
    }

    pub fn as_os_str(&self) -> &OsStr {
        &self.0
    }
}


/// Request to extract features from one candidate executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRequest {
    pub path: PathBuf,
}

/// Raw reply line from the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierReply(pub String);

impl ClassifierReply {
    /// Exactly `"1"` means malicious; any other value means clean.
    pub fn verdict(&self) -> Verdict {
        if self.0 == "1" {
            Verdict::Malicious
        } else {
            Verdict::Clean
        }
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("No {0} is configured")]
    NotConfigured(&'static str),
    #[error("Feature extraction failed: {0}")]
    Extraction(#[source] ExternalError),
    #[error("Classification failed: {0}")]
    Classification(#[source] ExternalError),
}

/// Decides whether a file is a recognized executable container.
///
/// Implementations never fail: anything that prevents a positive answer
/// (unreadable file, detector crash, timeout) means "not executable".
pub trait FormatDetector: Send + Sync {
    fn is_executable_container(&self, path: &Path) -> bool;
    fn name(&self) -> &'static str;
}

/// Boundary to the feature extractor and trained classifier.
///
/// The two calls are sequential: the output of `extract_features` is passed
/// through unchanged to `classify`.
pub trait ClassifierBridge: Send + Sync {
    fn extract_features(&self, request: &FeatureRequest) -> Result<FeatureLine, BridgeError>;
    fn classify(&self, features: &FeatureLine) -> Result<ClassifierReply, BridgeError>;
    fn name(&self) -> &'static str;

    /// Run both steps and map the reply to a verdict.
    fn verdict_for(&self, path: &Path) -> Result<Verdict, BridgeError> {
        let features = self.extract_features(&FeatureRequest { path: path.to_path_buf() })?;
        tracing::debug!(path = %path.display(), features = %features.as_os_str().to_string_lossy(), "Extracted features");
        let reply = self.classify(&features)?;
        Ok(reply.verdict())
    }
}

/// Bridge used when no extractor/classifier pair is configured.
///
/// Every executable container it sees ends up indeterminate.
pub struct UnconfiguredBridge;

impl ClassifierBridge for UnconfiguredBridge {
    fn extract_features(&self, _request: &FeatureRequest) -> Result<FeatureLine, BridgeError> {
        Err(BridgeError::NotConfigured("feature extractor"))
    }

    fn classify(&self, _features: &FeatureLine) -> Result<ClassifierReply, BridgeError> {
        Err(BridgeError::NotConfigured("classifier"))
    }

    fn name(&self) -> &'static str {
        "unconfigured"
    }
}
