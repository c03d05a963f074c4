use std::io::Write;
use std::process::{Command, Stdio};

use tempfile::TempDir;

// ============================================================================
// `pysrun gen` end to end: no server, HTML on stdout
// ============================================================================

fn pysrun(dir: &TempDir) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_pysrun"));
    command
        .current_dir(dir.path())
        .env("PYSRUN_CONFIG", dir.path().join("config.toml"));
    command
}

/// **VALUE**: Verifies the script read from stdin ends up in the generated page.
#[test]
fn given_script_on_stdin_when_gen_then_prints_document_with_script() {
    // GIVEN: `pysrun gen` with a script piped in
    let dir = TempDir::new().expect("temp dir");
    let mut child = pysrun(&dir)
        .args(["gen", "400", "300"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn pysrun");

    // WHEN: Writing the script and closing stdin
    child
        .stdin
        .take()
        .expect("stdin piped")
        .write_all(b"print('from stdin')\n")
        .expect("write script");
    let output = child.wait_with_output().expect("pysrun exits");

    // THEN: Success, and stdout holds the page
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).expect("utf-8");
    assert!(stdout.contains("<html"), "Got: {stdout}");
    assert!(stdout.contains("print('from stdin')"), "Got: {stdout}");
}

#[test]
fn given_script_file_when_gen_then_prints_file_contents() {
    let dir = TempDir::new().expect("temp dir");
    let script = dir.path().join("cell.py");
    std::fs::write(&script, "answer = 42\n").expect("write script");

    let output = pysrun(&dir)
        .args(["gen", "--script-file"])
        .arg(&script)
        .stdin(Stdio::null())
        .output()
        .expect("pysrun exits");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).expect("utf-8");
    assert!(stdout.contains("answer = 42"), "Got: {stdout}");
}

/// **BUG THIS CATCHES**: Would catch if render errors are logged but the process
/// still exits successfully.
#[test]
fn given_invalid_py_type_when_gen_then_exits_with_failure() {
    let dir = TempDir::new().expect("temp dir");

    let output = pysrun(&dir)
        .args(["gen", "--line", "400 300 white cobra"])
        .stdin(Stdio::null())
        .output()
        .expect("pysrun exits");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
