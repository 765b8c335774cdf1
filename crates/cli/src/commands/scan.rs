use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::Serialize;
use vault_core::config::ScannerConfig;
use vault_core::db::HistoryDb;
use vault_core::journal;
use vault_core::scan::{check_root, ScanReport, ScanSummary, Scanner};

#[derive(Serialize)]
struct ScanOutput<'a> {
    #[serde(flatten)]
    report: &'a ScanReport,
    summary: ScanSummary,
}

/// Scan `root`, quarantine what is malicious, and print the outcome.
///
/// Text mode prints one line per file as it completes, then a summary block.
/// JSON mode prints only the final report. History and journal are written
/// after the report is out; a failure there is a warning, not a failed scan.
pub fn scan_command(root: &Path, config: &ScannerConfig, json: bool) -> Result<ScanReport> {
    check_root(root)?;
    let scanner = Scanner::from_config(config).context("Failed to prepare scanner")?;
    tracing::debug!(
        root = %root.display(),
        signatures = scanner.signatures().len(),
        workers = scanner.workers(),
        "Starting scan"
    );

    let transcript = Mutex::new(Vec::new());
    let report = scanner.scan_with(root, |file| {
        let line = file.describe();
        if !json {
            println!("{line}");
        }
        if let Ok(mut lines) = transcript.lock() {
            lines.push(line);
        }
    })?;

    let mut transcript = transcript.into_inner().unwrap_or_default();
    for issue in &report.traversal_errors {
        let line = format!("Could not read directory entry: {}", issue.message);
        if !json {
            println!("{line}");
        }
        transcript.push(line);
    }

    let summary = report.summary();
    let summary_lines = summary_lines(&report, &summary);

    if json {
        let output = ScanOutput { report: &report, summary };
        let serialized =
            serde_json::to_string_pretty(&output).context("Failed to serialize scan report")?;
        println!("{serialized}");
    } else {
        for line in &summary_lines {
            println!("{line}");
        }
    }

    if let Some(db_path) = &config.history_db {
        if let Err(err) = record_history(db_path, &report) {
            warn_bookkeeping("history", &err);
        }
    }

    if let Some(journal_path) = &config.journal {
        transcript.extend(summary_lines);
        if let Err(err) = journal::append_entry(journal_path, &transcript.join("\n")) {
            warn_bookkeeping("journal", &err);
        }
    }

    Ok(report)
}

fn record_history(db_path: &Path, report: &ScanReport) -> Result<()> {
    let db = HistoryDb::open(db_path)
        .with_context(|| format!("Failed to open history database at {}", db_path.display()))?;
    db.record_report(report).context("Failed to record scan history")?;
    Ok(())
}

fn warn_bookkeeping(what: &str, err: &anyhow::Error) {
    tracing::error!(store = what, error = %format!("{err:#}"), "Scan finished but bookkeeping failed");
    eprintln!("Warning: scan {what} not updated: {err:#}");
}

fn summary_lines(report: &ScanReport, summary: &ScanSummary) -> Vec<String> {
    vec![
        format!("Scan of {} complete", report.root.display()),
        format!("  Files scanned: {}", summary.files),
        format!("  Clean: {}", summary.clean),
        format!("  Malicious: {}", summary.malicious),
        format!("  Quarantined: {}", summary.quarantined),
        format!("  Malicious, NOT isolated: {}", summary.not_isolated),
        format!("  Indeterminate: {}", summary.indeterminate),
        format!("  Traversal errors: {}", summary.traversal_errors),
        format!("  Duration: {}s", report.duration_secs()),
    ]
}
