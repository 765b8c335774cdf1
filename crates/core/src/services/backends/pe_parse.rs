use std::fs;
use std::path::Path;

use goblin::pe::PE;

use crate::services::detection::FormatDetector;

/// Strict native detector: the file must parse as a full PE image.
///
/// Stricter than [`super::MzHeaderDetector`]: a bare `MZ` prefix followed by
/// garbage is rejected and falls through to signature matching instead.
pub struct PeParseDetector;

impl FormatDetector for PeParseDetector {
    fn is_executable_container(&self, path: &Path) -> bool {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "PE probe could not read file");
                return false;
            }
        };
        if bytes.len() < 2 || &bytes[..2] != b"MZ" {
            return false;
        }
        match PE::parse(&bytes) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "MZ file is not a valid PE image");
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "pe-parse"
    }
}
