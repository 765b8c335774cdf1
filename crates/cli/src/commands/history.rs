use std::path::Path;

use anyhow::{Context, Result};
use vault_core::db::HistoryDb;

use crate::UsageError;

/// Show recorded scan runs, or with `quarantined` the quarantine log.
pub fn history_command(db_path: Option<&Path>, json: bool, quarantined: bool) -> Result<()> {
    let db_path = db_path.ok_or_else(|| {
        UsageError("No history database configured (set history_db or pass --history-db)".into())
    })?;
    if !db_path.exists() {
        if json {
            println!("[]");
        } else {
            println!("No scan history recorded yet at {}", db_path.display());
        }
        return Ok(());
    }

    let db = HistoryDb::open(db_path)
        .with_context(|| format!("Failed to open history database at {}", db_path.display()))?;

    if quarantined {
        let records = db.list_quarantine_records(None).context("Failed to list quarantine log")?;
        if json {
            let serialized = serde_json::to_string_pretty(&records)
                .context("Failed to serialize quarantine log to JSON")?;
            println!("{}", serialized);
            return Ok(());
        }
        println!("Quarantine log ({}):", records.len());
        if records.is_empty() {
            println!("  (none)");
        }
        for r in records {
            println!(
                "  - [{}] {} -> {} ({}, sha256={})",
                r.quarantined_at,
                r.original_path,
                r.destination,
                r.method,
                r.sha256.as_deref().unwrap_or("-")
            );
        }
        return Ok(());
    }

    let runs = db.list_scan_runs().context("Failed to list scan runs")?;
    if json {
        let serialized =
            serde_json::to_string_pretty(&runs).context("Failed to serialize scan runs to JSON")?;
        println!("{}", serialized);
        return Ok(());
    }
    println!("Scan runs ({}):", runs.len());
    if runs.is_empty() {
        println!("  (none)");
    }
    for run in runs {
        let s = &run.summary;
        println!(
            "  - #{} {} [{}] files={} malicious={} quarantined={} not_isolated={} indeterminate={}",
            run.id.unwrap_or_default(),
            run.root,
            run.started_at,
            s.files,
            s.malicious,
            s.quarantined,
            s.not_isolated,
            s.indeterminate
        );
    }
    Ok(())
}
