//! vault-core
//!
//! Core library for the virus-vault file-system scanner.
//!
//! This crate walks a directory tree, decides a verdict for every file (signature
//! lookup for ordinary files, an external feature extractor and classifier for
//! executable containers) and moves malicious files into a flat quarantine
//! directory. It also owns configuration, the scan history database and the
//! text journal.
//!
//! All substantive logic lives here so it is testable and reusable from
//! multiple frontends; the `virus-vault` CLI is a thin wrapper.

pub mod config;
pub mod db;
pub mod hashing;
pub mod journal;
pub mod model;
pub mod quarantine;
pub mod scan;
pub mod services;
pub mod signatures;

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
