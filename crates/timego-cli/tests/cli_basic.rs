//! Basic CLI E2E tests.
//!
//! Each invocation is a real independent process; pointing HOME at a fresh
//! temp directory gives every test its own shared store, so the tests also
//! exercise the cross-process contract (timer and widget commands only ever
//! meet through the durable record).

use std::path::Path;
use std::process::Command;

/// Run a CLI command against the store rooted at `home`.
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-p", "timego-cli", "--quiet", "--"])
        .args(args)
        .env("HOME", home)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_timer_status_starts_idle() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["timer", "status"]);
    assert_eq!(code, 0, "timer status failed");
    let snapshot: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(snapshot["type"], "StateSnapshot");
    assert_eq!(snapshot["phase"], "idle");
}

#[test]
fn test_timer_start_then_status_running() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(
        home.path(),
        &["timer", "start", "--minutes", "5", "--title", "Focus"],
    );
    assert_eq!(code, 0, "timer start failed");
    let event: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(event["type"], "CountdownStarted");
    assert_eq!(event["title"], "Focus");

    let (stdout, _, code) = run_cli(home.path(), &["timer", "status"]);
    assert_eq!(code, 0);
    let snapshot: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(snapshot["phase"], "running");
    assert_eq!(snapshot["is_running"], true);
    assert_eq!(snapshot["is_finished"], false);
}

#[test]
fn test_second_start_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(home.path(), &["timer", "start", "--minutes", "5"]);
    assert_eq!(code, 0);
    let (_, stderr, code) = run_cli(home.path(), &["timer", "start", "--minutes", "10"]);
    assert_eq!(code, 1, "second start must be rejected");
    assert!(stderr.contains("already running"), "stderr: {stderr}");
}

#[test]
fn test_cancel_returns_to_idle() {
    let home = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(home.path(), &["timer", "start", "--minutes", "5"]);
    assert_eq!(code, 0);
    let (stdout, _, code) = run_cli(home.path(), &["timer", "cancel"]);
    assert_eq!(code, 0);
    let event: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(event["type"], "CountdownCancelled");

    let (stdout, _, _) = run_cli(home.path(), &["timer", "status"]);
    let snapshot: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(snapshot["phase"], "idle");
    assert!(snapshot["target_instant"].is_null());
}

#[test]
fn test_start_with_absolute_target() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(
        home.path(),
        &["timer", "start", "--at", "2099-01-01T00:00:00Z", "--title", "NYE"],
    );
    assert_eq!(code, 0);
    let event: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(event["mode"], "time2go");
}

#[test]
fn test_start_without_duration_fails() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["timer", "start"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("--minutes"), "stderr: {stderr}");
}

#[test]
fn test_widget_render_idle() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["widget", "render"]);
    assert_eq!(code, 0, "widget render failed");
    assert!(stdout.contains("No countdown running"));
}

#[test]
fn test_widget_sees_state_written_by_timer_process() {
    let home = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(
        home.path(),
        &["timer", "start", "--minutes", "30", "--title", "Writing"],
    );
    assert_eq!(code, 0);
    let (stdout, _, code) = run_cli(home.path(), &["widget", "render"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Writing"), "stdout: {stdout}");
}

#[test]
fn test_widget_timeline_reports_next_refresh() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["widget", "timeline"]);
    assert_eq!(code, 0);
    let policy: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(policy["next_refresh"].is_string());
    assert!(policy["refresh_generation"].is_number());
}

#[test]
fn test_refresh_generation_moves_on_writes() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, _) = run_cli(home.path(), &["widget", "timeline"]);
    let before: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let (_, _, code) = run_cli(home.path(), &["timer", "start", "--minutes", "5"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(home.path(), &["widget", "timeline"]);
    let after: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(
        after["refresh_generation"].as_u64() > before["refresh_generation"].as_u64(),
        "start must bump the refresh generation"
    );
}

#[test]
fn test_widget_live_follows_the_countdown() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["widget", "live"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("no live activity"));

    let (_, _, code) = run_cli(
        home.path(),
        &["timer", "start", "--minutes", "30", "--title", "Focus"],
    );
    assert_eq!(code, 0);
    let (stdout, _, code) = run_cli(home.path(), &["widget", "live"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Focus"), "stdout: {stdout}");

    let (_, _, code) = run_cli(home.path(), &["timer", "cancel"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(home.path(), &["widget", "live"]);
    assert!(stdout.contains("no live activity"));
}

#[test]
fn test_ack_with_nothing_finished_reports_state() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["timer", "ack"]);
    assert_eq!(code, 0);
    let snapshot: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(snapshot["type"], "StateSnapshot");
}

#[test]
fn test_config_get_default() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "ui.theme"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "system");
}

#[test]
fn test_config_set_and_get() {
    let home = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(home.path(), &["config", "set", "ui.language", "zh-Hans"]);
    assert_eq!(code, 0);
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "ui.language"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "zh-Hans");
}

#[test]
fn test_config_set_unknown_key_fails() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "set", "ui.bogus", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Unknown configuration key"), "stderr: {stderr}");
}

#[test]
fn test_config_list() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("[ui]"));
    assert!(stdout.contains("[notifications]"));
}
