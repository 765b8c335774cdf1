use std::path::Path;

use anyhow::Result;
use vault_core::journal;

use crate::UsageError;

/// Print the scan journal.
pub fn journal_command(path: Option<&Path>) -> Result<()> {
    let path = path.ok_or_else(|| {
        UsageError("No journal configured (set journal or pass --journal)".into())
    })?;
    match journal::read(path)? {
        Some(body) => print!("{body}"),
        None => println!("Journal is empty: {}", path.display()),
    }
    Ok(())
}
