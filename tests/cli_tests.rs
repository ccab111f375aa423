//! Binary-level tests for the administrative CLI.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tierwatch() -> Command {
    let mut cmd = Command::cargo_bin("tierwatch").expect("binary built");
    cmd.env_remove("TIERWATCH_HOLDERS_API_KEY")
        .env_remove("RUST_LOG")
        .arg("--color")
        .arg("never");
    cmd
}

fn database(dir: &TempDir) -> String {
    dir.path().join("cli.db").to_string_lossy().into_owned()
}

fn token(dir: &TempDir, args: &[&str]) -> Command {
    let mut cmd = tierwatch();
    cmd.arg("token").args(args).arg("--database").arg(database(dir));
    cmd
}

fn write_config(dir: &Path, contents: &str) -> String {
    let path = dir.join("config.toml");
    fs::write(&path, contents).expect("write config");
    path.to_string_lossy().into_owned()
}

#[test]
fn validate_defaults_succeeds() {
    tierwatch()
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn validate_reports_band_gap_and_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[[categories]]
name = "low"
min = 0
max = 10000
interval_secs = 300

[[categories]]
name = "high"
min = 20000
interval_secs = 30
"#,
    );

    tierwatch()
        .args(["config", "validate", "--config", &path])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config failed"))
        .stderr(predicate::str::contains("gap between low"));
}

#[test]
fn validate_json_is_machine_readable() {
    let output = tierwatch()
        .args(["--json", "config", "validate"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["command"], "config.validate");
    assert_eq!(value["valid"], true);
    assert_eq!(value["categories"], 5);
}

#[test]
fn show_prints_effective_toml() {
    tierwatch()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[[categories]]"))
        .stdout(predicate::str::contains("daily_budget"));
}

#[test]
fn token_lifecycle_through_the_cli() {
    let dir = tempfile::tempdir().unwrap();

    token(&dir, &["add", "mint1", "--valuation", "1000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tracking mint1 as low"));

    token(&dir, &["force", "mint1", "high", "--note", "listing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mint1 moved low -> high"));

    let output = token(&dir, &["history", "mint1", "--json"]).output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let transitions = value["transitions"].as_array().unwrap();
    assert_eq!(transitions.len(), 1);
    assert_eq!(transitions[0]["from"], "low");
    assert_eq!(transitions[0]["to"], "high");
    assert_eq!(transitions[0]["reason"], "manual");
    assert_eq!(transitions[0]["note"], "listing");

    token(&dir, &["list", "--category", "high"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mint1"));

    token(&dir, &["list", "--category", "low"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tokens tracked"));
}

#[test]
fn duplicate_add_fails() {
    let dir = tempfile::tempdir().unwrap();
    token(&dir, &["add", "mint1", "--valuation", "5"]).assert().success();
    token(&dir, &["add", "mint1", "--valuation", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn force_to_unknown_category_fails() {
    let dir = tempfile::tempdir().unwrap();
    token(&dir, &["add", "mint1", "--valuation", "5"]).assert().success();
    token(&dir, &["force", "mint1", "moon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown target category moon"));
}

#[test]
fn force_with_unknown_reason_fails() {
    let dir = tempfile::tempdir().unwrap();
    token(&dir, &["force", "mint1", "high", "--reason", "whim"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown transition reason"));
}

#[test]
fn show_unknown_token_fails() {
    let dir = tempfile::tempdir().unwrap();
    token(&dir, &["show", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("token not found: ghost"));
}

#[test]
fn negative_valuation_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    token(&dir, &["add", "mint1", "--valuation=-3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("non-negative"));
}
