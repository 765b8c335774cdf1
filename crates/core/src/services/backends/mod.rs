pub mod mz_header;
pub mod pe_parse;
pub mod process;

pub use mz_header::MzHeaderDetector;
pub use pe_parse::PeParseDetector;
pub use process::{ProcessClassifierBridge, ProcessFormatDetector};

use std::time::Duration;

use crate::config::{DetectorConfig, ScannerConfig};
use crate::services::detection::{ClassifierBridge, FormatDetector, UnconfiguredBridge};

/// Build the format detector selected in configuration.
pub fn detector_from_config(config: &DetectorConfig, timeout: Duration) -> Box<dyn FormatDetector> {
    match config {
        DetectorConfig::MzHeader => Box::new(MzHeaderDetector),
        DetectorConfig::PeParse => Box::new(PeParseDetector),
        DetectorConfig::Process(tool) => {
            Box::new(ProcessFormatDetector { tool: tool.clone(), timeout })
        }
    }
}

/// Build the classifier bridge; both halves must be configured to get a real one.
pub fn bridge_from_config(config: &ScannerConfig) -> Box<dyn ClassifierBridge> {
    match (&config.feature_extractor, &config.classifier) {
        (Some(extractor), Some(classifier)) => Box::new(ProcessClassifierBridge {
            extractor: extractor.clone(),
            classifier: classifier.clone(),
            timeout: config.external_timeout(),
        }),
        _ => {
            tracing::debug!("Classifier bridge not configured; executables will be indeterminate");
            Box::new(UnconfiguredBridge)
        }
    }
}
