use runner_core::port::find_free_port;
use runner_core::render::RenderedDocument;
use runner_core::server::{ServerOptions, ServingUnitKind, start};

use std::time::Duration;

use tempfile::TempDir;
use tokio::time::timeout;

// ============================================================================
// The child serving unit, driven through the real `pysrun serve` binary
// ============================================================================

const DOCUMENT: &str = "<!doctype html><html><body>child</body></html>";

fn child_options(dir: &TempDir) -> ServerOptions {
    ServerOptions::new(RenderedDocument::new(DOCUMENT))
        .with_working_directory(dir.path())
        .with_unit(ServingUnitKind::Child)
        .with_child_program(env!("CARGO_BIN_EXE_pysrun"))
        .with_max_lifetime(Duration::from_secs(30))
        .with_ready_timeout(Duration::from_secs(10))
}

/// **VALUE**: Verifies the child process serves the document it was handed on
/// stdin and reports the fetch back to the parent.
///
/// **WHY THIS MATTERS**: The child unit is the isolated alternative to the
/// in-process server. The parent only learns about readiness and fetches from
/// the child's stdout markers.
///
/// **BUG THIS CATCHES**: Would catch if the ready or fetched markers drift between
/// what the child prints and what the parent parses.
#[tokio::test]
async fn given_child_unit_when_document_fetched_then_served_and_fetch_signalled() {
    // GIVEN: A child serving unit started through the public API
    let dir = TempDir::new().expect("temp dir");
    let reserved = find_free_port(18000..18099).expect("free port");
    let mut handle = start(child_options(&dir), reserved)
        .await
        .expect("child starts");
    let port = handle.port();

    // WHEN: Fetching the root path
    let response = reqwest::get(format!("http://127.0.0.1:{port}/"))
        .await
        .expect("fetch");
    let status = response.status();
    let body = response.text().await.expect("body");

    // THEN: The document comes back and the parent sees the fetch
    assert_eq!(status, 200);
    assert_eq!(body, DOCUMENT);
    let fetched = timeout(Duration::from_secs(10), handle.wait_for_primary_fetch())
        .await
        .expect("fetch signalled in time");
    assert!(fetched);

    handle.stop().await;
    assert!(handle.is_stopped());
}

/// **VALUE**: Verifies stopping the child frees its port.
///
/// **BUG THIS CATCHES**: Would catch if stop() forgets to kill the child and the
/// port stays bound until the lifetime elapses.
#[tokio::test]
async fn given_running_child_when_stopped_then_port_can_be_rebound() {
    // GIVEN: A running child unit
    let dir = TempDir::new().expect("temp dir");
    let reserved = find_free_port(18000..18099).expect("free port");
    let mut handle = start(child_options(&dir), reserved)
        .await
        .expect("child starts");
    let port = handle.port();

    // WHEN: Stopping it
    handle.stop().await;

    // THEN: The port can be bound again
    let rebound = std::net::TcpListener::bind(("127.0.0.1", port));
    assert!(rebound.is_ok(), "Port {port} should be free after stop");
}
