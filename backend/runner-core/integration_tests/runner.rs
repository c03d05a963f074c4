use crate::helpers::{InstantClock, RecordingDisplay};

use runner_core::command::CellMagic;
use runner_core::config::AppConfig;
use runner_core::error::{CoreError, RenderError};
use runner_core::options::RunOptions;
use runner_core::render::RenderedDocument;
use runner_core::runner::{RunOutcome, Runner, TokioClock};
use runner_core::server::ServingUnitKind;

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

// ============================================================================
// Run flow tests: options in, frame out, server gone afterwards
// ============================================================================

fn config_in(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.server.working_directory = Some(dir.path().to_path_buf());
    config
}

/// **VALUE**: Verifies HTML mode shows the document and starts no server.
#[tokio::test]
async fn given_htmlmode_when_run_then_shows_html_without_frame() {
    // GIVEN: genpys with a script
    let dir = TempDir::new().expect("temp dir");
    let runner = Runner::with_clock(config_in(&dir), Arc::new(InstantClock)).expect("runner");
    let options = runner
        .options_for(CellMagic::GenPys, "", "print(1)")
        .expect("options");
    let mut display = RecordingDisplay::default();

    // WHEN: Running
    let outcome = runner.run(options, &mut display).await.expect("run");

    // THEN: HTML shown, no frame
    assert!(matches!(outcome, RunOutcome::Rendered(_)));
    assert_eq!(display.html.len(), 1);
    assert!(display.html[0].contains("print(1)"));
    assert!(display.frames.is_empty());
}

/// **VALUE**: Verifies the serve flow shows a localhost frame with the
/// requested size and tears the server down afterwards.
///
/// **WHY THIS MATTERS**: This is the main path of `runpys`. After it returns
/// the port must be free for the next cell.
#[tokio::test]
async fn given_frame_mode_when_run_then_shows_frame_and_releases_port() {
    // GIVEN: runpys with a size, and a clock that ends the lifetime at once
    let dir = TempDir::new().expect("temp dir");
    let runner = Runner::with_clock(config_in(&dir), Arc::new(InstantClock)).expect("runner");
    let options = runner
        .options_for(CellMagic::RunPys, "320 240", "print('hi')")
        .expect("options");
    let mut display = RecordingDisplay::default();

    // WHEN: Running
    let outcome = runner.run(options, &mut display).await.expect("run");

    // THEN: One frame at http://localhost:<port>/ and the port is free again
    let RunOutcome::Served { port, url, fetched } = outcome else {
        panic!("Expected Served, got {outcome:?}");
    };
    assert_eq!(url, format!("http://localhost:{port}/"));
    assert!(!fetched);
    assert_eq!(display.frames.len(), 1);
    assert_eq!(display.frames[0].url, url);
    assert_eq!((display.frames[0].width, display.frames[0].height), (320, 240));
    TcpListener::bind(("127.0.0.1", port)).expect("port should be released");
}

/// **VALUE**: Verifies a fetch of the frame ends the run after the linger
/// instead of waiting out the whole lifetime.
///
/// **BUG THIS CATCHES**: Would catch the runner ignoring the fetch signal and
/// blocking the notebook for the full lifetime.
#[tokio::test]
async fn given_frame_fetched_when_run_then_returns_after_linger() {
    // GIVEN: Real time, a long lifetime, zero linger and a display that fetches
    let dir = TempDir::new().expect("temp dir");
    let runner = Runner::with_clock(config_in(&dir), Arc::new(TokioClock)).expect("runner");
    let mut options = runner
        .options_for(CellMagic::RunPys, "", "print('hi')")
        .expect("options");
    options.linger = Duration::ZERO;
    let mut display = RecordingDisplay {
        fetch_on_show: true,
        ..Default::default()
    };

    // WHEN: Running
    let outcome = tokio::time::timeout(Duration::from_secs(20), runner.run(options, &mut display))
        .await
        .expect("run should end well before the lifetime")
        .expect("run");

    // THEN: Served and fetched
    assert!(matches!(outcome, RunOutcome::Served { fetched: true, .. }));
}

/// **VALUE**: Verifies a caller-supplied renderer replaces the built-in page.
///
/// **WHY THIS MATTERS**: Hosts with their own page layout still want the
/// serve, frame and teardown flow around it.
///
/// **BUG THIS CATCHES**: Would catch the run flow calling the template directly
/// and ignoring the configured renderer.
#[tokio::test]
async fn given_custom_renderer_when_run_then_its_document_is_shown() {
    // GIVEN: A renderer that wraps the script in its own page
    let dir = TempDir::new().expect("temp dir");
    let runner = Runner::with_clock(config_in(&dir), Arc::new(InstantClock))
        .expect("runner")
        .with_renderer(|options: &RunOptions| {
            Ok(RenderedDocument::new(format!(
                "<html><pre>{}</pre></html>",
                options.py_script
            )))
        });
    let options = runner
        .options_for(CellMagic::GenPys, "", "x = 1")
        .expect("options");
    let mut display = RecordingDisplay::default();

    // WHEN: Running
    let outcome = runner.run(options, &mut display).await.expect("run");

    // THEN: The custom page is what was shown
    let RunOutcome::Rendered(document) = outcome else {
        panic!("Expected Rendered outcome");
    };
    assert_eq!(document.as_str(), "<html><pre>x = 1</pre></html>");
    assert_eq!(display.html, vec!["<html><pre>x = 1</pre></html>".to_string()]);
}

/// **VALUE**: Verifies renderer errors propagate like template errors, before
/// any port is taken or anything is shown.
#[tokio::test]
async fn given_failing_custom_renderer_when_run_then_returns_render_error() {
    let dir = TempDir::new().expect("temp dir");
    let runner = Runner::with_clock(config_in(&dir), Arc::new(InstantClock))
        .expect("runner")
        .with_renderer(|_: &RunOptions| Err(RenderError::invalid_mode("custom")));
    let options = runner
        .options_for(CellMagic::RunPys, "", "pass")
        .expect("options");
    let mut display = RecordingDisplay::default();

    let result = runner.run(options, &mut display).await;

    assert!(matches!(
        result,
        Err(CoreError::Render(RenderError::InvalidMode { .. }))
    ));
    assert!(display.frames.is_empty());
    assert!(display.html.is_empty());
}

/// **VALUE**: Verifies validation errors surface before anything is shown.
#[tokio::test]
async fn given_invalid_py_type_when_run_then_returns_render_error_and_shows_nothing() {
    let dir = TempDir::new().expect("temp dir");
    let runner = Runner::with_clock(config_in(&dir), Arc::new(InstantClock)).expect("runner");
    let options = RunOptions {
        py_type: "ruby".into(),
        ..RunOptions::default()
    };
    let mut display = RecordingDisplay::default();

    let result = runner.run(options, &mut display).await;

    assert!(matches!(
        result,
        Err(CoreError::Render(RenderError::InvalidMode { .. }))
    ));
    assert!(display.frames.is_empty());
    assert!(display.html.is_empty());
    assert!(display.reports.is_empty());
}

/// **VALUE**: Verifies a serving unit that fails to start is reported and no
/// frame is shown.
///
/// **WHY THIS MATTERS**: A frame pointing at a dead server is a blank box with
/// no explanation.
#[tokio::test]
async fn given_child_unit_that_cannot_start_when_run_then_reports_and_shows_no_frame() {
    // GIVEN: A child unit whose program does not exist
    let dir = TempDir::new().expect("temp dir");
    let mut config = config_in(&dir);
    config.server.unit = ServingUnitKind::Child;
    config.server.child_program = Some(dir.path().join("no-such-program"));
    let runner = Runner::with_clock(config, Arc::new(InstantClock)).expect("runner");
    let mut display = RecordingDisplay::default();

    // WHEN: Running
    let outcome = runner
        .run(RunOptions::default(), &mut display)
        .await
        .expect("start failures are outcomes, not errors");

    // THEN: Reported, no frame
    assert!(matches!(outcome, RunOutcome::StartFailed { .. }));
    assert_eq!(display.reports.len(), 1);
    assert!(display.frames.is_empty());
}

/// **VALUE**: Verifies session defaults from config sit between the built-in
/// defaults and the magic line.
#[tokio::test]
async fn given_session_defaults_when_options_for_then_line_overrides_defaults() {
    // GIVEN: Session defaults for background and width
    let dir = TempDir::new().expect("temp dir");
    let mut config = config_in(&dir);
    config.defaults.background = Some("black".into());
    config.defaults.add_src = Some(vec!["session.js".into()]);
    let runner = Runner::with_clock(config, Arc::new(InstantClock)).expect("runner");

    // WHEN: Resolving an empty and a sized line
    let empty = runner
        .options_for(CellMagic::RunPys, "", "pass")
        .expect("empty line");
    let sized = runner
        .options_for(CellMagic::RunPys, "640 480 navy", "pass")
        .expect("sized line");

    // THEN: Empty line uses the session defaults, the sized line overrides them
    assert_eq!(empty.background, "black");
    assert_eq!(empty.width, 500);
    assert_eq!(empty.add_src, vec!["session.js"]);
    assert_eq!(sized.background, "navy");
    assert_eq!(sized.width, 640);
}
