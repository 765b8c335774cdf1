use std::fs;

use predicates::prelude::*;
use tempfile::tempdir;

fn vault() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("virus-vault");
    cmd.env_remove("VIRUS_VAULT_CONFIG").env_remove("RUST_LOG");
    cmd
}

/// No arguments: usage guidance and a clean exit, no scan.
#[test]
fn no_arguments_prints_usage_and_exits_zero() {
    vault().assert().success().stdout(predicate::str::contains("Usage"));
}

#[test]
fn help_and_version_exit_zero() {
    vault().arg("--help").assert().success().stdout(predicate::str::contains("virus-vault"));
    vault().arg("--version").assert().success();
}

#[test]
fn unknown_flag_is_an_invocation_error() {
    vault().arg("--no-such-flag").assert().code(1);
}

#[test]
fn missing_root_exits_one_without_scanning() {
    let dir = tempdir().expect("tempdir");
    let quarantine = dir.path().join("q");
    vault()
        .arg(dir.path().join("does-not-exist"))
        .arg("--quarantine-dir")
        .arg(&quarantine)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
    assert!(!quarantine.exists());
}

#[test]
fn file_as_root_exits_one() {
    let dir = tempdir().expect("tempdir");
    let file = dir.path().join("plain.txt");
    fs::write(&file, "x").unwrap();
    vault()
        .arg(&file)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not a directory"));
}

#[test]
fn unreadable_signature_list_is_an_internal_error() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path().join("scan");
    fs::create_dir_all(&root).unwrap();
    vault()
        .arg(&root)
        .arg("--signatures")
        .arg(dir.path().join("missing-signatures.txt"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("signature list"));
}

#[test]
fn broken_config_file_is_an_invocation_error() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path().join("scan");
    fs::create_dir_all(&root).unwrap();
    let config = dir.path().join("vault.json");
    fs::write(&config, "{ not json").unwrap();
    vault()
        .arg(&root)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config"));
}

#[test]
fn history_and_journal_need_a_location() {
    vault().arg("history").assert().code(1).stderr(predicate::str::contains("history"));
    vault().arg("journal").assert().code(1).stderr(predicate::str::contains("journal"));
}

#[test]
fn quarantine_directory_as_root_exits_one() {
    let dir = tempdir().expect("tempdir");
    let quarantine = dir.path().join("q");
    fs::create_dir_all(&quarantine).unwrap();
    fs::write(dir.path().join("signatures.txt"), "").unwrap();
    vault()
        .arg(&quarantine)
        .arg("--quarantine-dir")
        .arg(&quarantine)
        .arg("--signatures")
        .arg(dir.path().join("signatures.txt"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("quarantine directory"));
}
