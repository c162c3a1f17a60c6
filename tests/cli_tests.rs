use std::fs;
use std::process::Command;

fn terraspec_binary() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_terraspec"));
    cmd.env_remove("TERRASPEC_TERRAFORM").env_remove("TERRASPEC_LOG");
    cmd
}

#[test]
fn test_cli_version() {
    let output = terraspec_binary().arg("--version").output().expect("run terraspec");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("terraspec "), "unexpected version output: {}", stdout);
}

#[test]
fn test_cli_no_cases_is_fatal() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let output = terraspec_binary()
        .args(["--spec", dir.path().to_str().unwrap()])
        .output()
        .expect("run terraspec");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no test case found"), "stderr: {}", stderr);
    assert!(stderr.contains("T0302"), "expected error code T0302 in stderr, got: {}", stderr);
    assert!(!stderr.contains("NoCases {"), "stderr contains raw Debug output: {}", stderr);
    assert!(output.stdout.is_empty());
}

#[test]
fn test_cli_unreadable_spec_dir_is_fatal() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let output = terraspec_binary()
        .args(["--spec", dir.path().join("missing").to_str().unwrap()])
        .output()
        .expect("run terraspec");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot read spec directory"), "stderr: {}", stderr);
}

#[test]
fn test_cli_engine_failure_is_reported_per_case() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let case = dir.path().join("spec").join("web");
    fs::create_dir_all(&case).unwrap();
    fs::write(case.join("web.tfspec"), "assert \"aws_instance\" \"web\" {}\n").unwrap();

    let output = terraspec_binary()
        .args([
            "--spec",
            dir.path().join("spec").to_str().unwrap(),
            "--dir",
            dir.path().to_str().unwrap(),
            "--terraform",
            dir.path().join("no-such-terraform").to_str().unwrap(),
        ])
        .output()
        .expect("run terraspec");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("🏷  web\n"), "stdout: {}", stdout);
    assert!(stdout.contains("Engine command failed : "), "stdout: {}", stdout);
}

#[test]
fn test_cli_logs_go_to_stderr() {
    let dir = tempfile::tempdir().expect("create temp dir");
    fs::write(dir.path().join("root.tfspec"), "").unwrap();

    let output = terraspec_binary()
        .args([
            "--spec",
            dir.path().to_str().unwrap(),
            "--dir",
            dir.path().to_str().unwrap(),
            "--terraform",
            dir.path().join("no-such-terraform").to_str().unwrap(),
            "--log",
            "debug",
        ])
        .output()
        .expect("run terraspec");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("running test cases"), "stderr: {}", stderr);
    assert!(!stdout.contains("running test cases"), "stdout: {}", stdout);
}
