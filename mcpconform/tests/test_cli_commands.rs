//! Exercises the `mcpconform` binary as a subprocess, the way a user
//! actually invokes it, rather than calling into `cli::dispatch` directly.

use std::process::Command;

fn mcpconform() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mcpconform"))
}

#[test]
fn version_human_output_mentions_the_binary_name() {
    let output = mcpconform().arg("version").output().expect("spawn mcpconform");
    assert!(
        output.status.success(),
        "version should always succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("mcpconform"), "unexpected output: {stdout}");
}

#[test]
fn version_json_output_is_valid_json() {
    let output = mcpconform()
        .args(["version", "--format", "json"])
        .output()
        .expect("spawn mcpconform");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("version --format json should emit valid JSON");
    assert!(parsed.get("version").is_some());
}

#[test]
fn list_tests_json_output_is_a_nonempty_array_of_cases() {
    let output = mcpconform()
        .args(["list-tests", "--format", "json"])
        .output()
        .expect("spawn mcpconform");
    assert!(
        output.status.success(),
        "list-tests should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("list-tests --format json should emit valid JSON");
    let cases = parsed.as_array().expect("list-tests JSON should be an array");
    assert!(!cases.is_empty(), "catalog should not be empty");
    assert!(cases[0].get("name").is_some());
    assert!(cases[0].get("group").is_some());
}

#[test]
fn list_tests_can_be_filtered_by_protocol_version() {
    let output = mcpconform()
        .args(["list-tests", "--version", "2024-11-05", "--format", "json"])
        .output()
        .expect("spawn mcpconform");
    assert!(output.status.success());
}

#[test]
fn run_without_a_target_fails_with_a_usage_error() {
    let output = mcpconform().arg("run").output().expect("spawn mcpconform");
    assert!(
        !output.status.success(),
        "run with neither a command nor --url should fail"
    );
}

#[test]
fn run_rejects_both_a_command_and_a_url_at_once() {
    let output = mcpconform()
        .args(["run", "--url", "http://127.0.0.1:1", "--", "some-command"])
        .output()
        .expect("spawn mcpconform");
    assert!(
        !output.status.success(),
        "command and --url are mutually exclusive"
    );
}

#[test]
fn run_against_an_unreachable_url_reports_a_non_fatal_error_exit_code() {
    // Port 0 is never listening; the runner should surface this as a failed
    // run (transport errors on every case) rather than panicking.
    let output = mcpconform()
        .args(["run", "--url", "http://127.0.0.1:0", "--timeout", "1", "--retries", "0"])
        .output()
        .expect("spawn mcpconform");
    assert!(
        !output.status.success(),
        "a run against an unreachable target should not report full success"
    );
}
