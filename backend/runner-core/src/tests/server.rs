// Unit tests for server options, the temporary artifact and the child unit helpers.
// End-to-end serving is covered in integration_tests/server.rs

use crate::error::server::ServerError;
use crate::render::RenderedDocument;
use crate::server::{
    CHILD_DEFAULT_PORT, LIFETIME_FLAG, LINGER_FLAG, SERVE_COMMAND, ServerOptions,
    TemporaryArtifact, build_serve_command, get_ready_regex, parse_child_port,
};

use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

fn document() -> RenderedDocument {
    RenderedDocument::new("<html>doc</html>")
}

// ============================================
// ServerOptions::validate()
// ============================================

/// **VALUE**: Verifies options violating an invariant are rejected before any
/// resource is acquired.
#[test]
fn given_invalid_options_when_validate_then_returns_invalid_options() {
    let dir = TempDir::new().expect("temp dir");
    let base = ServerOptions::new(document()).with_working_directory(dir.path());

    let cases = [
        base.clone().with_port_range(18005..18005),
        base.clone().with_max_lifetime(Duration::ZERO),
        base.clone().with_served_path("index.html"),
        base.clone().with_served_path("/{id}"),
        base.clone().with_working_directory(dir.path().join("missing")),
    ];

    for options in cases {
        assert!(
            matches!(options.validate(), Err(ServerError::InvalidOptions { .. })),
            "Expected InvalidOptions for {options:?}"
        );
    }

    assert!(base.validate().is_ok());
}

// ============================================
// TemporaryArtifact
// ============================================

/// **VALUE**: Verifies the artifact is readable exactly once and deleted after.
///
/// **WHY THIS MATTERS**: Temp-file backing promises single-shot content. A second
/// fetch must not see the document and the file must not linger on disk.
#[tokio::test]
async fn given_artifact_when_consumed_twice_then_second_is_none_and_file_gone() {
    // GIVEN: An artifact in a scratch directory
    let dir = TempDir::new().expect("temp dir");
    let artifact = TemporaryArtifact::create(dir.path(), b"hello").expect("create artifact");
    let path = artifact.path().to_path_buf();
    assert!(path.exists());
    assert!(artifact.file_name().starts_with("pys-"));
    assert!(artifact.file_name().ends_with(".html"));

    // WHEN: Consuming twice
    let first = artifact.consume().await;
    let second = artifact.consume().await;

    // THEN: First read returns the bytes, second returns nothing, file is gone
    assert_eq!(first.expect("first consume").expect("read ok"), b"hello");
    assert!(second.is_none());
    assert!(!path.exists());
    assert!(!artifact.is_pending());
}

/// **VALUE**: Verifies removal is idempotent and tolerates a file deleted behind
/// our back.
///
/// **BUG THIS CATCHES**: Would catch teardown panicking or erroring on NotFound.
#[test]
fn given_externally_deleted_artifact_when_removed_twice_then_no_panic() {
    let dir = TempDir::new().expect("temp dir");
    let artifact = TemporaryArtifact::create(dir.path(), b"x").expect("create artifact");
    std::fs::remove_file(artifact.path()).expect("delete behind the artifact's back");

    artifact.remove();
    artifact.remove();

    assert!(!artifact.is_pending());
}

/// **VALUE**: Verifies dropping an unconsumed artifact deletes the file.
#[test]
fn given_pending_artifact_when_dropped_then_file_deleted() {
    let dir = TempDir::new().expect("temp dir");
    let artifact = TemporaryArtifact::create(dir.path(), b"x").expect("create artifact");
    let path = artifact.path().to_path_buf();

    drop(artifact);

    assert!(!path.exists());
}

/// **VALUE**: Verifies creation in a missing directory is a TempFile error.
#[test]
fn given_missing_directory_when_create_artifact_then_returns_temp_file_error() {
    let dir = TempDir::new().expect("temp dir");

    let result = TemporaryArtifact::create(&dir.path().join("nope"), b"x");

    assert!(matches!(result, Err(ServerError::TempFile { .. })));
}

// ============================================
// Child unit helpers
// ============================================

/// **VALUE**: Verifies `pysrun serve [PORT]` port parsing, including the fallback.
#[test]
fn given_port_arguments_when_parse_child_port_then_parses_or_defaults() {
    assert_eq!(parse_child_port(Some("18042")), 18042);
    assert_eq!(parse_child_port(Some(" 18043 ")), 18043);
    assert_eq!(parse_child_port(Some("abc")), CHILD_DEFAULT_PORT);
    assert_eq!(parse_child_port(Some("70000")), CHILD_DEFAULT_PORT);
    assert_eq!(parse_child_port(None), CHILD_DEFAULT_PORT);
}

/// **VALUE**: Verifies the ready-marker regex matches the child's line and
/// extracts host and port.
///
/// **BUG THIS CATCHES**: Would catch the parent waiting forever because the
/// marker text and the regex drifted apart.
#[test]
fn given_ready_line_when_regex_applied_then_extracts_host_and_port() {
    // GIVEN: The child's ready line
    let line = "pysrun-serve: listening on http://127.0.0.1:18007";

    // WHEN: Matching
    let caps = get_ready_regex().captures(line).expect("ready line should match");

    // THEN: Host and port captured
    assert_eq!(&caps["host"], "127.0.0.1");
    assert_eq!(&caps["port"], "18007");
    assert!(get_ready_regex().captures("Server listening on http://127.0.0.1:1").is_none());
}

/// **VALUE**: Verifies the child command line carries the port, lifetime and linger.
///
/// **BUG THIS CATCHES**: Would catch durations passed in whole seconds, which
/// turns a 500 ms linger into 0 and stops the child earlier than a task unit.
#[test]
fn given_options_when_build_serve_command_then_passes_port_lifetime_and_linger() {
    // GIVEN: Options with a lifetime and linger
    let dir = TempDir::new().expect("temp dir");
    let options = ServerOptions::new(document())
        .with_working_directory(dir.path())
        .with_max_lifetime(Duration::from_millis(30_250))
        .with_linger(Some(Duration::from_millis(500)));

    // WHEN: Building the command
    let cmd = build_serve_command(Path::new("/usr/bin/pysrun"), 18003, &options);

    // THEN: Arguments are in order and the working directory is set
    let std_cmd = cmd.as_std();
    let args: Vec<String> = std_cmd
        .get_args()
        .map(|a| a.to_string_lossy().to_string())
        .collect();
    assert_eq!(std_cmd.get_program(), "/usr/bin/pysrun");
    assert_eq!(
        args,
        vec![SERVE_COMMAND, "18003", LIFETIME_FLAG, "30250", LINGER_FLAG, "500"]
    );
    assert_eq!(std_cmd.get_current_dir(), Some(dir.path()));
}
