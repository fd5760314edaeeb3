mod common;

use std::process::Command;

use common::{para, write_docx};

fn run(input: &std::path::Path) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_docxflow-pdf"))
        .arg(input)
        .output()
        .expect("Failed to run docxflow-pdf")
}

#[test]
fn missing_input_reports_before_progress() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("absent.docx");

    let output = run(&input);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!output.status.success());
    assert!(stdout.starts_with("Error: file not found"), "{stdout}");
    assert!(!stdout.contains("Converting:"));
    assert!(!dir.path().join("absent.pdf").exists());
}

#[test]
fn success_prints_progress_and_result() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_docx(dir.path(), "memo.docx", &para(None, "Hello"));

    let output = run(&input);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "Converting: memo.docx");
    assert_eq!(lines[1], "To: memo.pdf");
    assert!(lines[3].starts_with("Successfully created: "));
    assert!(dir.path().join("memo.pdf").exists());
}

#[test]
fn conversion_failure_is_reported_on_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("corrupt.docx");
    std::fs::write(&input, b"not a zip").unwrap();

    let output = run(&input);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!output.status.success());
    assert!(stdout.contains("Error during conversion: ZIP error"), "{stdout}");
}
