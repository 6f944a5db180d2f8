//! Smoke tests for paywall-demo-cli
//!
//! These tests run the binary against the simulated store; no network access
//! or terminal is required.

use std::process::{Command, Output};
use tempfile::TempDir;

fn run_cli(args: &[&str]) -> Output {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "paywall-demo-cli", "--"])
        .args(args)
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .env_remove("PAYWALL_DEMO_CONFIG")
        .output()
        .expect("Failed to execute command");

    // Print output for debugging if test fails
    if !output.status.success() {
        eprintln!("stdout: {}", String::from_utf8_lossy(&output.stdout));
        eprintln!("stderr: {}", String::from_utf8_lossy(&output.stderr));
    }
    output
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Test that the CLI can show help
#[test]
fn test_cli_help() {
    let output = run_cli(&["--help"]);
    let stdout = stdout(&output);

    assert!(output.status.success());
    assert!(stdout.contains("present"), "Help should mention 'present'");
    assert!(stdout.contains("init-config"), "Help should mention 'init-config'");
}

/// Test that version is shown
#[test]
fn test_cli_version() {
    let output = run_cli(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("paywall-demo"));
}

#[test]
fn test_offering_json() {
    let output = run_cli(&["offering", "--json"]);
    assert!(output.status.success());

    let offering: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("offering should be JSON");
    assert_eq!(offering["id"], "default");
    assert_eq!(offering["packages"].as_array().map(|p| p.len()), Some(3));
}

#[test]
fn test_init_config_writes_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("paywall.json");
    let path_arg = path.to_str().unwrap();

    let output = run_cli(&["init-config", "--output", path_arg]);
    assert!(output.status.success());
    assert!(path.exists());

    // A second run refuses to overwrite
    let output = run_cli(&["init-config", "--output", path_arg]);
    assert!(!output.status.success());

    let output = run_cli(&["init-config", "--output", path_arg, "--force"]);
    assert!(output.status.success());
}

#[test]
fn test_present_skips_entitled_user() {
    let output = run_cli(&["present", "--entitled", "--delay-ms", "0"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("paywall skipped"));
}

#[test]
fn test_present_purchase_completes() {
    let output = run_cli(&["present", "--delay-ms", "0", "--package", "$rc_monthly"]);
    let stdout = stdout(&output);

    assert!(output.status.success());
    assert!(stdout.contains("purchase_started"));
    assert!(stdout.contains("purchase_completed"));
    assert!(stdout.contains("dismissed"));
}

#[test]
fn test_present_failure_exits_with_error() {
    let output = run_cli(&["present", "--delay-ms", "0", "--fail", "store"]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("purchase_failure"));
}

#[test]
fn test_present_cancel_is_not_an_error() {
    let output = run_cli(&["present", "--delay-ms", "0", "--fail", "cancel"]);
    let stdout = stdout(&output);

    assert!(output.status.success());
    assert!(stdout.contains("purchase_started"));
    assert!(!stdout.contains("purchase_failure"));
}

#[test]
fn test_present_restore_acknowledged() {
    let output = run_cli(&["present", "--delay-ms", "0", "--restore", "--yes"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("restore_completed"));
}

#[test]
fn test_present_unknown_package() {
    let output = run_cli(&["present", "--delay-ms", "0", "--package", "$rc_weekly"]);
    assert!(!output.status.success());
}

#[test]
fn test_config_can_skip_on_lookup_failure() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("paywall.json");
    std::fs::write(
        &path,
        r#"{ "account_lookup_fails": true, "skip_paywall_on_lookup_failure": true, "store_delay_ms": 0 }"#,
    )
    .unwrap();

    let output = run_cli(&["--config", path.to_str().unwrap(), "present"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("paywall skipped"));
}
