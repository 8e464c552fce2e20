//! Integration tests for the CLI binary.
//!
//! Runs `casctl` against throwaway ticket directories.
//!
//! This test is registered as a [[test]] in the cas-ticket-cli crate
//! so that CARGO_BIN_EXE_casctl is available.

use std::path::Path;
use std::process::{Command, Output};

/// Get a Command pointing to the `casctl` binary.
fn casctl() -> Command {
    Command::new(env!("CARGO_BIN_EXE_casctl"))
}

fn run_in(dir: &Path, args: &[&str]) -> Output {
    casctl()
        .arg("--dir")
        .arg(dir)
        .args(args)
        .output()
        .expect("failed to execute casctl")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn cli_responds_to_help() {
    let output = casctl()
        .arg("--help")
        .output()
        .expect("failed to execute casctl --help");

    assert!(
        output.status.success(),
        "casctl --help should exit with success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let out = stdout(&output);
    assert!(
        out.contains("casctl") || out.contains("Usage"),
        "help output should contain usage information, got: {out}"
    );
}

#[test]
fn cli_responds_to_version() {
    let output = casctl()
        .arg("--version")
        .output()
        .expect("failed to execute casctl --version");

    assert!(output.status.success());
    assert!(stdout(&output).contains("0.1"));
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = casctl()
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute casctl");
    assert!(!output.status.success());
}

#[test]
fn check_config_accepts_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &["check-config"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("built-in defaults"));
}

#[test]
fn check_config_prints_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cas.json");
    std::fs::write(&path, r#"{ "max_proxy_depth": 3, "id_suffix": "node7" }"#).unwrap();

    let output = run_in(dir.path(), &["--json", "check-config", path.to_str().unwrap()]);
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(parsed["max_proxy_depth"], 3);
    assert_eq!(parsed["id_suffix"], "node7");
}

#[test]
fn check_config_rejects_bad_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cas.json");
    std::fs::write(&path, r#"{ "service": { "time_to_live": { "ttl_ms": 0 } } }"#).unwrap();

    let output = run_in(dir.path(), &["check-config", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ttl_ms"));
}

#[test]
fn smoke_round_trip_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &["smoke", "--principal", "operator"]);
    assert!(
        output.status.success(),
        "smoke failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let out = stdout(&output);
    assert!(out.contains("principal operator"));
    assert!(out.contains("second validation rejected"));

    let listed = run_in(dir.path(), &["--json", "list"]);
    let rows: Vec<serde_json::Value> = serde_json::from_str(&stdout(&listed)).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn smoke_keep_then_list_and_destroy() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &["smoke", "--principal", "dana", "--keep"]);
    assert!(output.status.success());

    let listed = run_in(dir.path(), &["--json", "list", "--show-ids"]);
    let rows: Vec<serde_json::Value> = serde_json::from_str(&stdout(&listed)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["kind"], "TGT");
    assert_eq!(rows[0]["principal"], "dana");
    assert_eq!(rows[0]["state"], "active");
    assert_eq!(rows[0]["uses"], 1);
    assert_eq!(rows[0]["previous_use"], rows[0]["created"]);

    let id = rows[0]["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("TGT-"));
    assert!(run_in(dir.path(), &["destroy", &id]).status.success());

    let listed = run_in(dir.path(), &["--json", "list"]);
    let rows: Vec<serde_json::Value> = serde_json::from_str(&stdout(&listed)).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn sweep_on_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &["--json", "sweep"]);
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(summary["granting_destroyed"], 0);
    assert_eq!(summary["files_purged"], 0);
}

#[test]
fn destroy_unknown_ticket_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &["destroy", "TGT-1-unknown-cas"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("nothing to do"));
}
