use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::services::detection::FormatDetector;

/// Native detector that accepts any file starting with the DOS `MZ` magic.
pub struct MzHeaderDetector;

impl FormatDetector for MzHeaderDetector {
    fn is_executable_container(&self, path: &Path) -> bool {
        let mut magic = [0u8; 2];
        match File::open(path).and_then(|mut f| f.read_exact(&mut magic)) {
            Ok(()) => &magic == b"MZ",
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "MZ probe failed");
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "mz-header"
    }
}
