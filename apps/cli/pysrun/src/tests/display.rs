// Unit tests for the console display surface

use crate::display::ConsoleDisplay;

use runner_core::render::RenderedDocument;
use runner_core::runner::{DisplaySurface, Frame};

fn buffers() -> ConsoleDisplay<Vec<u8>, Vec<u8>> {
    ConsoleDisplay::new(Vec::new(), Vec::new())
}

#[test]
fn given_frame_when_shown_then_prints_iframe_and_url() {
    // GIVEN: A frame for a served document
    let mut display = buffers();
    let frame = Frame {
        url: String::from("http://localhost:18000/"),
        width: 320,
        height: 240,
    };

    // WHEN: Showing it
    display.show_frame(&frame);

    // THEN: The iframe goes to stdout, nothing to stderr
    let (out, err) = display.into_parts();
    let out = String::from_utf8(out).expect("utf-8");
    assert!(out.contains("<iframe"), "Got: {out}");
    assert!(out.contains("http://localhost:18000/"));
    assert!(out.contains("320"));
    assert!(err.is_empty());
}

#[test]
fn given_document_when_shown_as_html_then_printed_verbatim() {
    let mut display = buffers();

    display.show_html(&RenderedDocument::new("<html>cell</html>"));

    let (out, _) = display.into_parts();
    assert_eq!(String::from_utf8(out).expect("utf-8"), "<html>cell</html>\n");
}

/// **BUG THIS CATCHES**: Would catch if start-failure reports land on stdout and
/// get mixed into generated HTML that callers pipe elsewhere.
#[test]
fn given_report_when_shown_then_written_to_error_stream_only() {
    let mut display = buffers();

    display.report("Server failed to start");

    let (out, err) = display.into_parts();
    assert!(out.is_empty());
    assert_eq!(
        String::from_utf8(err).expect("utf-8"),
        "Server failed to start\n"
    );
}
