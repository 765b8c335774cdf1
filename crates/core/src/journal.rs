//! Append-only text journal of scan transcripts.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

/// Header line that opens every journal block.
pub fn entry_header(timestamp: DateTime<Local>) -> String {
    format!("==================== [{}] ====================", timestamp.format("%Y-%m-%d %H:%M:%S"))
}

/// Append one block (header plus `body`) to the journal, creating it and its directory if needed.
pub fn append_entry(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create journal directory {}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open journal {}", path.display()))?;
    let entry = format!("\n\n{}\n{}\n", entry_header(Local::now()), body.trim_end());
    file.write_all(entry.as_bytes())
        .with_context(|| format!("Failed to append to journal {}", path.display()))?;
    Ok(())
}

/// Full journal contents, or `None` when nothing has been written yet.
pub fn read(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(body) => Ok(Some(body)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read journal {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_accumulate_under_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/journal.txt");
        assert!(read(&path).unwrap().is_none());

        append_entry(&path, "first scan\n").unwrap();
        append_entry(&path, "second scan").unwrap();

        let body = read(&path).unwrap().unwrap();
        assert_eq!(body.matches("====================").count(), 4);
        let first = body.find("first scan").unwrap();
        let second = body.find("second scan").unwrap();
        assert!(first < second);
    }
}
