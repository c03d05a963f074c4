use crate::helpers::{DOCUMENT, document};

use runner_core::error::server::ServerError;
use runner_core::port::find_free_port;
use runner_core::server::{
    DocumentBacking, NOT_FOUND_BODY, ServerOptions, ServingUnitKind, start,
};

use std::net::TcpListener;
use std::time::Duration;

use tempfile::TempDir;

// ============================================================================
// Public API tests for the ephemeral document server
// ============================================================================

fn options_in(dir: &TempDir) -> ServerOptions {
    ServerOptions::new(document())
        .with_working_directory(dir.path())
        .with_max_lifetime(Duration::from_secs(30))
}

fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{port}")
}

/// **VALUE**: Verifies the document is served on the root path as UTF-8 HTML,
/// repeatedly, and that the fetch is signalled on the handle.
///
/// **WHY THIS MATTERS**: This is the request the browser frame makes. Wrong
/// content type and the browser shows source instead of running PyScript.
#[tokio::test]
async fn given_memory_backing_when_root_fetched_then_returns_document_as_html() {
    // GIVEN: A started server with memory backing
    let dir = TempDir::new().expect("temp dir");
    let reserved = find_free_port(18000..18099).expect("free port");
    let port = reserved.port();
    let mut handle = start(options_in(&dir), reserved).await.expect("server starts");
    assert!(!handle.primary_fetched());

    // WHEN: Fetching the root path twice, once with a query string
    let first = reqwest::get(format!("{}/", base_url(port))).await.expect("first fetch");
    let content_type = first
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let status = first.status();
    let body = first.text().await.expect("body");
    let second = reqwest::get(format!("{}/?cache=1", base_url(port)))
        .await
        .expect("second fetch");

    // THEN: Both return the document, the fetch is recorded
    assert_eq!(status, 200);
    assert_eq!(content_type.as_deref(), Some("text/html; charset=utf-8"));
    assert_eq!(body, DOCUMENT);
    assert_eq!(second.status(), 200);
    assert!(handle.primary_fetched());
    assert!(handle.wait_for_primary_fetch().await);

    handle.stop().await;
}

/// **VALUE**: Verifies unknown paths return 404 with the fixed body.
#[tokio::test]
async fn given_unknown_path_when_fetched_then_returns_404_not_found() {
    let dir = TempDir::new().expect("temp dir");
    let reserved = find_free_port(18000..18099).expect("free port");
    let port = reserved.port();
    let mut handle = start(options_in(&dir), reserved).await.expect("server starts");

    let response = reqwest::get(format!("{}/missing.png", base_url(port)))
        .await
        .expect("fetch");

    assert_eq!(response.status(), 404);
    assert_eq!(response.text().await.expect("body"), NOT_FOUND_BODY);
    assert!(!handle.primary_fetched(), "404 must not count as a document fetch");

    handle.stop().await;
}

/// **VALUE**: Verifies files next to the notebook are served with a content
/// type inferred from the extension.
///
/// **WHY THIS MATTERS**: Scripts load assets (CSS, data files) relative to the
/// page. A wrong content type makes the browser refuse stylesheets.
#[tokio::test]
async fn given_static_file_in_working_directory_when_fetched_then_served_with_type() {
    // GIVEN: A stylesheet in the working directory
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("style.css"), "body { color: red; }").expect("write css");
    let reserved = find_free_port(18000..18099).expect("free port");
    let port = reserved.port();
    let mut handle = start(options_in(&dir), reserved).await.expect("server starts");

    // WHEN: Fetching it
    let response = reqwest::get(format!("{}/style.css", base_url(port)))
        .await
        .expect("fetch");

    // THEN: Served with a CSS content type
    assert_eq!(response.status(), 200);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/css"), "got {content_type}");
    assert_eq!(response.text().await.expect("body"), "body { color: red; }");

    handle.stop().await;
}

/// **VALUE**: Verifies temp-file backing serves the document once, then deletes it.
///
/// **BUG THIS CATCHES**: Would catch the temp file being left on disk, or served
/// a second time.
#[tokio::test]
async fn given_temp_file_backing_when_fetched_twice_then_second_is_404_and_file_deleted() {
    // GIVEN: A temp-file backed server on the default path
    let dir = TempDir::new().expect("temp dir");
    let reserved = find_free_port(18000..18099).expect("free port");
    let port = reserved.port();
    let options = options_in(&dir).with_backing(DocumentBacking::TempFile);
    let mut handle = start(options, reserved).await.expect("server starts");
    let served_path = handle.served_path().to_string();
    let file = handle.artifact_path().expect("artifact owned").to_path_buf();
    assert!(served_path.starts_with("/pys-"), "served path was {served_path}");
    assert!(file.exists());

    // WHEN: Fetching twice
    let first = reqwest::get(format!("{}{served_path}", base_url(port)))
        .await
        .expect("first fetch");
    let first_status = first.status();
    let first_body = first.text().await.expect("first body");
    let second = reqwest::get(format!("{}{served_path}", base_url(port)))
        .await
        .expect("second fetch");

    // THEN: Served once, then gone
    assert_eq!(first_status, 200);
    assert_eq!(first_body, DOCUMENT);
    assert_eq!(second.status(), 404);
    assert!(!file.exists());

    handle.stop().await;
}

/// **VALUE**: Verifies the temporary document is only reachable through its
/// served path, never through the static file fallback.
///
/// **WHY THIS MATTERS**: The static fallback serves the working directory. If
/// the document file were reachable there, any spelling of its name that misses
/// the exact route would serve it again without consuming it.
///
/// **BUG THIS CATCHES**: Would catch the artifact being written into the served
/// tree, where `/pys%2D<rest>.html` or the plain file name under a custom served
/// path return the document repeatedly and leave the file on disk.
#[tokio::test]
async fn given_temp_file_backing_when_name_variants_fetched_then_not_served_by_fallback() {
    // GIVEN: A temp-file backed server on a custom path
    let dir = TempDir::new().expect("temp dir");
    let reserved = find_free_port(18000..18099).expect("free port");
    let port = reserved.port();
    let options = options_in(&dir)
        .with_backing(DocumentBacking::TempFile)
        .with_served_path("/cell.html");
    let mut handle = start(options, reserved).await.expect("server starts");
    let file = handle.artifact_path().expect("artifact owned").to_path_buf();
    let file_name = file
        .file_name()
        .and_then(|name| name.to_str())
        .expect("utf-8 file name")
        .to_string();
    assert!(!file.starts_with(dir.path()), "artifact must live outside the served tree");

    // WHEN: Fetching the plain name and a percent-encoded variant
    let rest = file_name.trim_start_matches("pys-");
    for path in [format!("/{file_name}"), format!("/pys%2D{rest}")] {
        let response = reqwest::get(format!("{}{path}", base_url(port)))
            .await
            .expect("fetch");

        // THEN: Neither reaches the document
        assert_eq!(response.status(), 404, "{path} must not be served");
    }
    assert!(!handle.primary_fetched());
    assert!(file.exists(), "artifact still pending for its served path");

    // AND: The served path still delivers it exactly once
    let served = reqwest::get(format!("{}/cell.html", base_url(port)))
        .await
        .expect("served fetch");
    assert_eq!(served.status(), 200);
    assert_eq!(served.text().await.expect("body"), DOCUMENT);
    assert!(handle.primary_fetched());
    assert!(!file.exists());

    handle.stop().await;
}

/// **VALUE**: Verifies stopping an unfetched temp-file server removes the file.
#[tokio::test]
async fn given_unfetched_temp_file_when_stopped_then_file_deleted() {
    let dir = TempDir::new().expect("temp dir");
    let reserved = find_free_port(18000..18099).expect("free port");
    let options = options_in(&dir).with_backing(DocumentBacking::TempFile);
    let mut handle = start(options, reserved).await.expect("server starts");
    let file = handle.artifact_path().expect("artifact owned").to_path_buf();
    assert!(file.exists());

    handle.stop().await;

    assert!(!file.exists());
    assert!(handle.artifact_path().is_none());
}

/// **VALUE**: Verifies temp-file backing refuses to write its document inside
/// the tree it serves statically.
#[tokio::test]
async fn given_working_directory_containing_temp_dir_when_temp_file_start_then_invalid_options() {
    let reserved = find_free_port(18000..18099).expect("free port");
    let options = ServerOptions::new(document())
        .with_working_directory(std::env::temp_dir())
        .with_backing(DocumentBacking::TempFile);

    let result = start(options, reserved).await;

    assert!(matches!(result, Err(ServerError::InvalidOptions { .. })));
}

/// **VALUE**: Verifies stop is idempotent and releases the port.
///
/// **WHY THIS MATTERS**: The run flow and drop paths may both stop the server.
/// A second stop must not panic, and the port must be reusable afterwards.
#[tokio::test]
async fn given_running_server_when_stopped_twice_then_port_can_be_rebound() {
    // GIVEN: A running server
    let dir = TempDir::new().expect("temp dir");
    let reserved = find_free_port(18000..18099).expect("free port");
    let port = reserved.port();
    let mut handle = start(options_in(&dir), reserved).await.expect("server starts");

    // WHEN: Stopping twice
    handle.stop().await;
    handle.stop().await;

    // THEN: Stopped, and the port binds again
    assert!(handle.is_stopped());
    TcpListener::bind(("127.0.0.1", port)).expect("port should be free after stop");
}

/// **VALUE**: Verifies the server stops by itself when its lifetime runs out.
///
/// **BUG THIS CATCHES**: Would catch a lifetime timer that is never armed,
/// leaving servers running until the process exits.
#[tokio::test]
async fn given_short_lifetime_when_elapsed_then_server_stops_accepting() {
    // GIVEN: A server with a one second lifetime
    let dir = TempDir::new().expect("temp dir");
    let reserved = find_free_port(18000..18099).expect("free port");
    let port = reserved.port();
    let options = options_in(&dir).with_max_lifetime(Duration::from_secs(1));
    let mut handle = start(options, reserved).await.expect("server starts");

    // WHEN: Waiting past the lifetime
    tokio::time::sleep(Duration::from_millis(1500)).await;

    // THEN: The port no longer accepts connections
    assert!(tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_err());
    handle.stop().await;
}

/// **VALUE**: Verifies the server stops shortly after the first fetch when a
/// linger is configured, well before the lifetime.
#[tokio::test]
async fn given_linger_when_document_fetched_then_server_stops_early() {
    // GIVEN: A long lifetime and a zero linger
    let dir = TempDir::new().expect("temp dir");
    let reserved = find_free_port(18000..18099).expect("free port");
    let port = reserved.port();
    let options = options_in(&dir).with_linger(Some(Duration::ZERO));
    let mut handle = start(options, reserved).await.expect("server starts");

    // WHEN: Fetching the document
    let response = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .expect("client")
        .get(format!("{}/", base_url(port)))
        .send()
        .await
        .expect("fetch");
    assert_eq!(response.status(), 200);
    drop(response);
    tokio::time::sleep(Duration::from_millis(500)).await;

    // THEN: The server is gone although the lifetime is 30s
    assert!(tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_err());
    handle.stop().await;
}

/// **VALUE**: Verifies invalid options fail before the serving unit starts.
#[tokio::test]
async fn given_relative_served_path_when_start_then_returns_invalid_options() {
    let dir = TempDir::new().expect("temp dir");
    let reserved = find_free_port(18000..18099).expect("free port");
    let options = options_in(&dir).with_served_path("page.html");

    let result = start(options, reserved).await;

    assert!(matches!(result, Err(ServerError::InvalidOptions { .. })));
}

/// **VALUE**: Verifies a child that exits before printing the ready marker
/// produces a start error carrying its exit status.
///
/// **WHY THIS MATTERS**: Without diagnostics the user only sees a blank frame.
#[tokio::test]
async fn given_child_exiting_immediately_when_start_then_start_error_with_exit_status() {
    // GIVEN: A child program that exits with failure and ignores its arguments
    let dir = TempDir::new().expect("temp dir");
    let reserved = find_free_port(18000..18099).expect("free port");
    let options = options_in(&dir)
        .with_unit(ServingUnitKind::Child)
        .with_child_program("false")
        .with_ready_timeout(Duration::from_secs(5));

    // WHEN: Starting
    let result = start(options, reserved).await;

    // THEN: Start error with the exit status
    match result {
        Err(error) => {
            let diagnostics = error
                .start_diagnostics()
                .unwrap_or_else(|| panic!("Expected Start error, got {error:?}"));
            assert!(diagnostics.exit_status.is_some(), "exit status should be captured");
        }
        Ok(_) => panic!("`false` must not become ready"),
    }
}
