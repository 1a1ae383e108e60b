use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_check_config_prints_effective_settings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("host.json");
    fs::write(&path, r#"{ "process_start_timeout_seconds": 5 }"#).unwrap();

    let mut cmd = Command::cargo_bin("courier").unwrap();
    cmd.args(["check-config", "--config", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"process_start_timeout_seconds\": 5"))
        .stdout(predicate::str::contains("\"worker_ready_check_polling_interval_ms\": 25"));
}

#[test]
fn test_check_config_rejects_invalid_settings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("host.json");
    fs::write(&path, r#"{ "shutdown_timeout": 0 }"#).unwrap();

    let mut cmd = Command::cargo_bin("courier").unwrap();
    cmd.args(["check-config", "--config", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Shutdown timeout cannot be zero"));
}

#[test]
fn test_check_config_rejects_malformed_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("host.json");
    fs::write(&path, "{ not json").unwrap();

    let mut cmd = Command::cargo_bin("courier").unwrap();
    cmd.args(["check-config", "--config", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse configuration file"));
}

#[test]
fn test_invoke_echoes_trigger() {
    let mut cmd = Command::cargo_bin("courier").unwrap();
    cmd.args(["invoke", "--trigger", r#"{"id":5}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"id":5}"#));
}

#[test]
fn test_invoke_with_text_trigger() {
    let mut cmd = Command::cargo_bin("courier").unwrap();
    cmd.args(["invoke", "--trigger", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"hello\""));
}

#[cfg(unix)]
#[test]
fn test_shm_probe_round_trip() {
    let name = format!("courier-probe-{}", std::process::id());

    let mut cmd = Command::cargo_bin("courier").unwrap();
    cmd.args(["shm-probe", "--name", &name, "--size", "4096"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Platform: unix"))
        .stdout(predicate::str::contains("Reopened region"))
        .stdout(predicate::str::contains("Deleted region"));
}

#[test]
fn test_shm_probe_rejects_zero_size() {
    let mut cmd = Command::cargo_bin("courier").unwrap();
    cmd.args(["shm-probe", "--name", "courier-empty", "--size", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not create shared memory region"));
}
