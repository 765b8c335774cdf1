use std::path::Path;
use std::time::Duration;

use crate::services::detection::{
    BridgeError, ClassifierBridge, ClassifierReply, FeatureLine, FeatureRequest, FormatDetector,
};
use crate::services::external::{run_for_line, run_for_raw_line, ToolConfig};

/// Format detector that shells out to an external checker.
///
/// The checker receives the candidate path as its last argument and must print
/// `true` (any case) on its first output line for a positive answer.
pub struct ProcessFormatDetector {
    pub tool: ToolConfig,
    pub timeout: Duration,
}

impl FormatDetector for ProcessFormatDetector {
    fn is_executable_container(&self, path: &Path) -> bool {
        match run_for_line(&self.tool, path.as_os_str(), self.timeout) {
            Ok(line) => line.trim().eq_ignore_ascii_case("true"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Format detector failed; treating as non-executable");
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "process"
    }
}

/// Classifier bridge backed by two external processes.
///
/// 1. `extractor <path>` prints one line of features.
/// 2. `classifier <features>` prints one verdict line (`1` = malicious).
pub struct ProcessClassifierBridge {
    pub extractor: ToolConfig,
    pub classifier: ToolConfig,
    pub timeout: Duration,
}

impl ClassifierBridge for ProcessClassifierBridge {
    fn extract_features(&self, request: &FeatureRequest) -> Result<FeatureLine, BridgeError> {
        run_for_raw_line(&self.extractor, request.path.as_os_str(), self.timeout)
            .map(FeatureLine::from_bytes)
            .map_err(BridgeError::Extraction)
    }

    fn classify(&self, features: &FeatureLine) -> Result<ClassifierReply, BridgeError> {
        run_for_line(&self.classifier, features.as_os_str(), self.timeout)
            .map(ClassifierReply)
            .map_err(BridgeError::Classification)
    }

    fn name(&self) -> &'static str {
        "process"
    }
}
