use std::path::PathBuf;

use anyhow::{Context, Result};
use thiserror::Error;
use vault_core::config::{ConfigError, ScannerConfig};
use vault_core::scan::ScanError;

pub mod commands;
pub mod logging;

/// Scan completed, whatever the per-file verdicts.
pub const EXIT_OK: u8 = 0;
/// Bad flags, missing/invalid root, unusable config.
pub const EXIT_INVALID: u8 = 1;
/// Anything else that stopped the run.
pub const EXIT_INTERNAL: u8 = 2;

/// An error caused by how the tool was invoked rather than by the tool itself.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UsageError(pub String);

/// Map a failed run to a process exit code.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    let invalid = err.chain().any(|cause| {
        cause.is::<UsageError>()
            || cause.is::<ConfigError>()
            || cause.downcast_ref::<ScanError>().is_some_and(ScanError::is_invalid_root)
    });
    if invalid {
        EXIT_INVALID
    } else {
        EXIT_INTERNAL
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config: Option<PathBuf>,
    pub signatures: Option<PathBuf>,
    pub quarantine_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub jobs: Option<usize>,
    pub history_db: Option<PathBuf>,
    pub journal: Option<PathBuf>,
}

/// Resolve configuration: `--config`, else `$VIRUS_VAULT_CONFIG`, else defaults; then apply flags.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<ScannerConfig> {
    let mut config = ScannerConfig::discover(overrides.config.as_deref())
        .context("Failed to load scanner configuration")?;
    if let Some(path) = &overrides.signatures {
        config.signature_file = path.clone();
    }
    if let Some(path) = &overrides.quarantine_dir {
        config.quarantine_dir = path.clone();
    }
    if let Some(secs) = overrides.timeout_secs {
        config.external_timeout_secs = secs;
    }
    if let Some(jobs) = overrides.jobs {
        config.jobs = jobs;
    }
    if let Some(path) = &overrides.history_db {
        config.history_db = Some(path.clone());
    }
    if let Some(path) = &overrides.journal {
        config.journal = Some(path.clone());
    }
    tracing::debug!(?config, "Resolved configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_map_to_invalid_even_under_context() {
        let err = anyhow::Error::new(UsageError("Pass --yes".into())).context("Purge refused");
        assert_eq!(exit_code_for(&err), EXIT_INVALID);
        assert_eq!(format!("{err:#}"), "Purge refused: Pass --yes");
    }

    #[test]
    fn invalid_root_is_invalid_and_other_failures_are_internal() {
        let root = anyhow::Error::new(ScanError::RootNotFound(PathBuf::from("/nope")));
        assert_eq!(exit_code_for(&root), EXIT_INVALID);
        assert_eq!(exit_code_for(&anyhow::anyhow!("disk on fire")), EXIT_INTERNAL);
    }
}
