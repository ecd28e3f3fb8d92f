//! Command-line behavior of `headerless strip`.

use std::fs;
use std::io::Write;
use std::process::{Command, Output, Stdio};
use tempfile::NamedTempFile;

fn headerless() -> Command {
    Command::new(env!("CARGO_BIN_EXE_headerless"))
}

fn run_headerless(args: &[&str]) -> Output {
    headerless()
        .args(args)
        .output()
        .expect("Failed to run headerless")
}

fn run_headerless_with_stdin(args: &[&str], stdin_content: &str) -> Output {
    let mut child = headerless()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn headerless");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin_content.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn input_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_strip_file_to_file() {
    let input = input_file("meta: x\nmeta: y\nend_header\nhello\nworld\n");
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.txt");

    let result = run_headerless(&[
        "strip",
        "-i",
        input.path().to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
    ]);

    assert!(result.status.success(), "stderr: {}", String::from_utf8_lossy(&result.stderr));
    assert_eq!(fs::read_to_string(&output).unwrap(), "hello\nworld\n");
}

#[test]
fn test_strip_stdin_to_stdout() {
    let result = run_headerless_with_stdin(&["strip"], "h\nend_header\nbody\n");
    assert!(result.status.success());
    assert_eq!(String::from_utf8_lossy(&result.stdout), "body\n");
}

#[test]
fn test_dash_selects_standard_streams() {
    let result = run_headerless_with_stdin(&["strip", "-i", "-", "-o", "-"], "end_header\nx\n");
    assert!(result.status.success());
    assert_eq!(String::from_utf8_lossy(&result.stdout), "x\n");
}

#[test]
fn test_no_sentinel_creates_empty_output() {
    let input = input_file("a\nb\nc\n");
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.txt");

    let result = run_headerless(&[
        "strip",
        "-i",
        input.path().to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
    ]);

    assert!(result.status.success());
    assert_eq!(fs::read(&output).unwrap(), b"");
}

#[test]
fn test_custom_sentinel_and_contains() {
    let result = run_headerless_with_stdin(
        &["strip", "--sentinel", "BEGIN", "--contains"],
        "x\n=== BEGIN ===\ny\n",
    );
    assert!(result.status.success());
    assert_eq!(String::from_utf8_lossy(&result.stdout), "y\n");
}

#[test]
fn test_stats_go_to_stderr() {
    let result = run_headerless_with_stdin(&["strip", "--stats"], "h\nend_header\nb\n");
    assert!(result.status.success());
    assert_eq!(String::from_utf8_lossy(&result.stdout), "b\n");
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("Strip stats:"), "stderr: {}", stderr);
    assert!(stderr.contains("Sentinel: line 2"), "stderr: {}", stderr);
    assert!(stderr.contains("Hand-offs: 5/5/5"), "stderr: {}", stderr);
}

#[test]
fn test_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.txt");
    let output = dir.path().join("out.txt");

    let result = run_headerless(&[
        "strip",
        "-i",
        missing.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
    ]);

    assert!(!result.status.success());
    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("Error: cannot open input"), "stderr: {}", stderr);
    assert!(!output.exists());
}

#[test]
fn test_reject_long_lines() {
    let long = "z".repeat(64);
    let result = run_headerless_with_stdin(
        &["strip", "--max-line", "32", "--reject-long-lines"],
        &format!("end_header\n{}\n", long),
    );
    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(
        stderr.contains("line 2 exceeds the maximum line length of 32 bytes"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn test_long_lines_split_by_default() {
    let long = "z".repeat(64);
    let result = run_headerless_with_stdin(
        &["strip", "--max-line", "32"],
        &format!("end_header\n{}\n", long),
    );
    assert!(result.status.success());
    assert_eq!(String::from_utf8_lossy(&result.stdout), format!("{}\n", long));
}

#[test]
fn test_invalid_max_line() {
    let result = run_headerless_with_stdin(&["strip", "--max-line", "4"], "");
    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&result.stderr).contains("invalid configuration"));
}
