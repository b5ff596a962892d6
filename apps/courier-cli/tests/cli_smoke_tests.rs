#![allow(clippy::unwrap_used, clippy::expect_used)]

//! CLI smoke tests for the courier-cli binary
//!
//! These tests run the compiled binary and check help output, configuration
//! layering through `check`, and one real `invoke` against a mock server.

use std::io::Write;
use std::process::{Command, Stdio};

use httpmock::prelude::*;
use serde_json::{Value, json};
use tempfile::NamedTempFile;

/// Helper to run the courier-cli binary with given arguments and env
fn run_courier_cli(args: &[&str], env: &[(&str, &str)]) -> std::process::Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_courier-cli"));
    cmd.args(args)
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in env {
        cmd.env(key, value);
    }
    cmd.output().expect("Failed to execute courier-cli")
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_cli_help_command() {
    let output = run_courier_cli(&["--help"], &[]);

    assert!(output.status.success(), "Help command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("courier-cli"), "Should contain binary name");
    assert!(stdout.contains("Usage:"), "Should contain usage information");
    assert!(stdout.contains("invoke"), "Should contain 'invoke' subcommand");
    assert!(stdout.contains("check"), "Should contain 'check' subcommand");
    assert!(stdout.contains("--config"), "Should mention config option");
}

#[test]
fn test_cli_version_command() {
    let output = run_courier_cli(&["--version"], &[]);

    assert!(output.status.success(), "Version command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("courier-cli"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_invalid_command() {
    let output = run_courier_cli(&["launch"], &[]);

    assert!(!output.status.success(), "Unknown subcommand should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("unrecognized subcommand") || stderr.contains("error:"),
        "Should report the bad subcommand"
    );
}

#[test]
fn test_cli_missing_config_file() {
    let output = run_courier_cli(&["--config", "/nonexistent/courier.yaml", "check"], &[]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "stderr: {stderr}");
}

#[test]
fn test_cli_invalid_yaml() {
    let file = write_config("connection: [unclosed\n");
    let output = run_courier_cli(&["--config", file.path().to_str().unwrap(), "check"], &[]);

    assert!(!output.status.success(), "Malformed YAML should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid configuration"), "stderr: {stderr}");
}

#[test]
fn test_cli_check_prints_redacted_config() {
    let file = write_config(
        r"
connection:
  base_url: https://api.example.com
  api_authentication:
    channel_id: web
auth:
  api_token: super-secret
",
    );
    let output = run_courier_cli(&["--config", file.path().to_str().unwrap(), "check"], &[]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("super-secret"), "token must not be printed");

    let config = stdout_json(&output);
    assert_eq!(config["connection"]["base_url"], "https://api.example.com");
    assert_eq!(config["connection"]["api_authentication"]["channel_id"], "web");
    assert_eq!(config["auth"]["api_token"], "[REDACTED]");
}

#[test]
fn test_cli_env_and_flag_overrides() {
    let output = run_courier_cli(
        &["--base-url", "https://flag.example.com", "-vv", "check"],
        &[
            ("COURIER__CONNECTION__BASE_URL", "https://env.example.com"),
            ("COURIER__AUTH__DEVICE_ID", "smoke-device"),
        ],
    );

    assert!(output.status.success());
    let config = stdout_json(&output);
    assert_eq!(config["connection"]["base_url"], "https://flag.example.com");
    assert_eq!(config["auth"]["device_id"], "smoke-device");
    assert_eq!(config["logging"]["level"], "debug");
}

#[test]
fn test_cli_invalid_base_url_flag() {
    let output = run_courier_cli(&["--base-url", "ftp://files.example.com", "check"], &[]);

    assert!(!output.status.success(), "Non-HTTP base URL should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--base-url"), "stderr: {stderr}");
}

#[test]
fn test_cli_invoke_against_mock_server() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(Method::POST)
            .path("/v1/echo")
            .header("x-channel-id", "smoke")
            .header("x-trace", "t-1")
            .json_body(json!({"ping": 1}));
        then.status(201)
            .header("x-request-id", "req-9")
            .json_body(json!({"pong": 1}));
    });

    let base_url = server.base_url();
    let output = run_courier_cli(
        &[
            "invoke",
            "--path",
            "/v1/echo",
            "--method",
            "post",
            "--body",
            r#"{"ping":1}"#,
            "--header",
            "x-trace: t-1",
        ],
        &[
            ("COURIER__CONNECTION__BASE_URL", base_url.as_str()),
            ("COURIER__CONNECTION__API_AUTHENTICATION__CHANNEL_ID", "smoke"),
            (
                "COURIER__TRANSPORT__TRANSPORT_SECURITY",
                "allow_insecure_http",
            ),
        ],
    );

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let envelope = stdout_json(&output);
    assert_eq!(envelope["status_class"], "success");
    assert_eq!(envelope["status"], 201);
    assert_eq!(envelope["headers"]["x-request-id"], "req-9");
    assert_eq!(envelope["body"], json!({"pong": 1}));
    mock.assert();
}

#[test]
fn test_cli_invoke_reports_client_errors_in_envelope() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(Method::GET).path("/v1/missing");
        then.status(404).body("not here");
    });

    let base_url = server.base_url();
    let output = run_courier_cli(
        &["invoke", "--path", "/v1/missing"],
        &[
            ("COURIER__CONNECTION__BASE_URL", base_url.as_str()),
            (
                "COURIER__TRANSPORT__TRANSPORT_SECURITY",
                "allow_insecure_http",
            ),
        ],
    );

    assert!(output.status.success());
    let envelope = stdout_json(&output);
    assert_eq!(envelope["status_class"], "client_error");
    assert_eq!(envelope["body"], "not here");
}
