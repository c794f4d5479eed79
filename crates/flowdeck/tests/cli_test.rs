//! Integration tests for the `flowdeck` CLI binary.
//!
//! These tests validate argument parsing, help output, config commands,
//! and input validation — all without requiring a live queue backend.
#![allow(clippy::unwrap_used)]

use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `flowdeck` binary with env isolation.
///
/// Clears all `FLOWDECK_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn flowdeck_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("flowdeck").unwrap();
    cmd.env("HOME", "/tmp/flowdeck-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/flowdeck-cli-test-nonexistent")
        .env_remove("FLOWDECK_URL")
        .env_remove("FLOWDECK_OUTPUT")
        .env_remove("FLOWDECK_TIMEOUT")
        .env_remove("REDIS_URL");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = flowdeck_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    flowdeck_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("queue backends")
            .and(predicate::str::contains("flows"))
            .and(predicate::str::contains("queues"))
            .and(predicate::str::contains("status")),
    );
}

#[test]
fn test_version_flag() {
    flowdeck_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("flowdeck"));
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_flows_get_requires_queue_and_id() {
    let output = flowdeck_cmd().args(["flows", "get"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("QUEUE"), "{text}");
}

#[test]
fn test_invalid_url_fails_validation() {
    let output = flowdeck_cmd()
        .args(["status", "--url", "not a url"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "validation exits with USAGE");
    let text = combined_output(&output);
    assert!(text.contains("connection.url"), "{text}");
}

#[test]
fn test_unknown_output_format_rejected() {
    let output = flowdeck_cmd()
        .args(["flows", "list", "-o", "xml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Config commands (no backend needed) ─────────────────────────────

#[test]
fn test_config_path_prints_a_path() {
    flowdeck_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_renders_defaults() {
    flowdeck_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[connection]")
                .and(predicate::str::contains("redis://localhost:6379")),
        );
}

#[test]
fn test_config_show_as_json() {
    flowdeck_cmd()
        .args(["config", "show", "-o", "json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"connection\"").and(predicate::str::contains("\"flows\"")),
        );
}
