//! Command-line tests for the netdiag binary
//!
//! Runs stay on the loopback interface: literal addresses skip name lookup
//! and TCP probes go to a listener owned by the test.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::net::TcpListener;
use std::process::Command;
use tempfile::TempDir;

/// Command isolated from the caller's environment and working directory
fn create_test_cmd(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("netdiag").unwrap();
    cmd.current_dir(workdir.path());
    for var in [
        "PROBE_COUNT",
        "PROBE_TIMEOUT_MS",
        "LOSS_THRESHOLD",
        "OVERALL_TIMEOUT_MS",
        "MAX_IN_FLIGHT",
        "PROBE_METHOD",
        "TCP_PORT",
        "TCP_FALLBACK",
        "DNS_SERVERS",
        "DOH_PROVIDER",
        "ENABLE_COLOR",
        "OUTPUT_FORMAT",
    ] {
        cmd.env_remove(var);
    }
    // Custom resolver construction needs no system resolv.conf
    cmd.args(["--dns-servers", "127.0.0.1", "--no-color"]);
    cmd
}

fn local_listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

#[test]
fn test_help_lists_options() {
    Command::cargo_bin("netdiag")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--loss-threshold"))
        .stdout(predicate::str::contains("--method"))
        .stdout(predicate::str::contains("TARGET"))
        .stdout(predicate::str::contains("PROBE_TIMEOUT_MS"));
}

#[test]
fn test_missing_target_fails() {
    Command::cargo_bin("netdiag").unwrap().assert().failure();
}

#[test]
fn test_invalid_flag_values_fail() {
    let workdir = TempDir::new().unwrap();

    create_test_cmd(&workdir)
        .args(["--loss-threshold", "2", "127.0.0.1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Ratio must be within"));

    create_test_cmd(&workdir)
        .args(["--method", "udp", "127.0.0.1"])
        .assert()
        .failure();

    create_test_cmd(&workdir)
        .args(["--count", "0", "127.0.0.1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--count must be at least 1"));
}

#[test]
fn test_invalid_env_value_is_config_error() {
    let workdir = TempDir::new().unwrap();

    create_test_cmd(&workdir)
        .env("PROBE_COUNT", "many")
        .arg("127.0.0.1")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("PROBE_COUNT"));
}

#[test]
fn test_invalid_target_is_reported() {
    let workdir = TempDir::new().unwrap();

    create_test_cmd(&workdir)
        .arg("bad target!")
        .assert()
        .success()
        .stdout(predicate::str::contains("InvalidTarget"));
}

#[test]
fn test_tcp_probe_of_local_listener_as_json() {
    let workdir = TempDir::new().unwrap();
    let (_listener, port) = local_listener();

    let output = create_test_cmd(&workdir)
        .args(["--method", "tcp", "--port", &port.to_string(), "--count", "3", "--format", "json"])
        .arg("127.0.0.1")
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["diagnosis"]["class"], "Healthy");
    assert_eq!(report["probe_method"], "Tcp");
    assert_eq!(report["summary"]["attempted"], 3);
    assert_eq!(report["summary"]["succeeded"], 3);
}

#[test]
fn test_use_ping_command_with_markdown() {
    let workdir = TempDir::new().unwrap();
    let (_listener, port) = local_listener();
    let target = format!("127.0.0.1:{}", port);

    create_test_cmd(&workdir)
        .args(["--method", "tcp", "--count", "2", "--format", "markdown", "USE", "PING"])
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("| Type | Host |"))
        .stdout(predicate::str::contains("**Diagnosis: Healthy**"));
}

#[test]
fn test_env_file_is_loaded() {
    let workdir = TempDir::new().unwrap();
    let (_listener, port) = local_listener();
    std::fs::write(
        workdir.path().join(".env"),
        format!("PROBE_METHOD=tcp\nTCP_PORT={}\nPROBE_COUNT=2\nOUTPUT_FORMAT=json\n", port),
    )
    .unwrap();

    let output = create_test_cmd(&workdir).arg("127.0.0.1").output().unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["summary"]["attempted"], 2);
}
