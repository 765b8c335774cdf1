use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use vault_core::quarantine::QuarantineManager;

use crate::UsageError;

/// List files held in the quarantine directory.
pub fn list_quarantine_command(dir: &Path, json: bool) -> Result<()> {
    let manager = QuarantineManager::new(dir);
    let entries = manager.list().context("Failed to list quarantine")?;

    if json {
        let serialized = serde_json::to_string_pretty(&entries)
            .context("Failed to serialize quarantine entries to JSON")?;
        println!("{}", serialized);
        return Ok(());
    }

    println!("Quarantine ({}): {}", entries.len(), dir.display());
    if entries.is_empty() {
        println!("  (none)");
        return Ok(());
    }
    for entry in entries {
        let modified = entry
            .modified
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  - {} ({} bytes, modified {})", entry.file_name, entry.size_bytes, modified);
    }
    Ok(())
}

/// Permanently delete quarantined files by name, or all of them.
pub fn purge_quarantine_command(dir: &Path, names: &[String], all: bool, yes: bool) -> Result<()> {
    let manager = QuarantineManager::new(dir);
    let removed = if all {
        if !yes {
            return Err(UsageError("Refusing to purge the whole quarantine without --yes".into()).into());
        }
        manager.purge_all().context("Failed to purge quarantine")?
    } else {
        if names.is_empty() {
            return Err(UsageError("Name at least one quarantined file or pass --all".into()).into());
        }
        manager.purge(names).context("Failed to purge quarantined files")?
    };

    println!("Deleted {} file(s) from {}", removed.len(), dir.display());
    for path in removed {
        println!("  - {}", path.display());
    }
    Ok(())
}
