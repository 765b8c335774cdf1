//! Scanner configuration.
//!
//! Every location the scanner touches (signature list, quarantine directory,
//! external tools, history database, journal) is injected here at startup;
//! nothing is compiled in. A config file may be JSON or YAML, and relative
//! paths inside it resolve against the file's own directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::external::ToolConfig;

/// Environment variable consulted when no explicit config path is given.
pub const CONFIG_ENV_VAR: &str = "VIRUS_VAULT_CONFIG";

/// Default bound on every external detector/extractor/classifier call.
pub const DEFAULT_EXTERNAL_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config JSON at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to parse config YAML at {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Unsupported config format for {0} (expected .json, .yaml or .yml)")]
    UnsupportedFormat(PathBuf),
}

/// Which format detector decides the detection strategy for each file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DetectorConfig {
    /// Native check for the two-byte `MZ` magic.
    #[default]
    MzHeader,
    /// Native full PE parse.
    PeParse,
    /// External checker process printing `true`/`false`.
    Process(ToolConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Plain-text list of known-malicious SHA-256 digests, one per line.
    pub signature_file: PathBuf,
    /// Flat directory receiving quarantined files.
    pub quarantine_dir: PathBuf,
    pub format_detector: DetectorConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_extractor: Option<ToolConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier: Option<ToolConfig>,
    pub external_timeout_secs: u64,
    /// Worker threads for file decisions. 1 = sequential, 0 = one per available CPU.
    pub jobs: usize,
    /// Optional SQLite scan history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_db: Option<PathBuf>,
    /// Optional append-only text journal of scan transcripts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<PathBuf>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            signature_file: PathBuf::from("signatures.txt"),
            quarantine_dir: PathBuf::from("quarantine"),
            format_detector: DetectorConfig::default(),
            feature_extractor: None,
            classifier: None,
            external_timeout_secs: DEFAULT_EXTERNAL_TIMEOUT_SECS,
            jobs: 1,
            history_db: None,
            journal: None,
        }
    }
}

impl ScannerConfig {
    /// Load a config file (format chosen by extension) and resolve its relative paths.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let body = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_lowercase();
        let mut config: ScannerConfig = match ext.as_str() {
            "json" => serde_json::from_str(&body)
                .map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })?,
            "yaml" | "yml" => serde_yaml::from_str(&body)
                .map_err(|source| ConfigError::Yaml { path: path.to_path_buf(), source })?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// Load from `explicit`, else from `$VIRUS_VAULT_CONFIG`, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    /// Rebase relative file locations onto `base`.
    ///
    /// Tool programs are only rebased when they contain a directory component;
    /// bare names such as `python` keep resolving through `PATH`.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        rebase(&mut self.signature_file, base);
        rebase(&mut self.quarantine_dir, base);
        if let Some(p) = self.history_db.as_mut() {
            rebase(p, base);
        }
        if let Some(p) = self.journal.as_mut() {
            rebase(p, base);
        }
        if let DetectorConfig::Process(tool) = &mut self.format_detector {
            rebase_program(tool, base);
        }
        for tool in [self.feature_extractor.as_mut(), self.classifier.as_mut()].into_iter().flatten()
        {
            rebase_program(tool, base);
        }
    }

    pub fn external_timeout(&self) -> Duration {
        Duration::from_secs(self.external_timeout_secs.max(1))
    }

    /// Effective worker count (`jobs == 0` means available parallelism).
    pub fn worker_count(&self) -> usize {
        match self.jobs {
            0 => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            n => n,
        }
    }
}

fn rebase(path: &mut PathBuf, base: &Path) {
    if path.is_relative() && !base.as_os_str().is_empty() {
        *path = base.join(&*path);
    }
}

fn rebase_program(tool: &mut ToolConfig, base: &Path) {
    if tool.program.components().count() > 1 {
        rebase(&mut tool.program, base);
    }
}
