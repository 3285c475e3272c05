//! CLI integration tests

use std::process::Command;

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "tae-cli", "--", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Telemetry Analytics Engine"),
        "Should show app name"
    );
    assert!(stdout.contains("health"), "Should show health command");
    assert!(stdout.contains("templates"), "Should show templates command");
    assert!(stdout.contains("slos"), "Should show slos command");
    assert!(stdout.contains("anomalies"), "Should show anomalies command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = Command::new("cargo")
        .args(["run", "-p", "tae-cli", "--", "--version"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("tae"), "Should show binary name");
}

/// Test anomalies subcommand help
#[test]
fn test_anomalies_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "tae-cli", "--", "anomalies", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Subcommand help should succeed");
    assert!(stdout.contains("--limit"), "Should show the limit flag");
}
