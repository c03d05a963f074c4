// Shared fixtures for the integration tests

use runner_core::render::RenderedDocument;
use runner_core::runner::{Clock, DisplaySurface, Frame};

use std::time::Duration;

use async_trait::async_trait;

pub const DOCUMENT: &str = "<!DOCTYPE html><html><body>integration</body></html>";

pub fn document() -> RenderedDocument {
    RenderedDocument::new(DOCUMENT)
}

/// Rewrite `http://localhost:<port>` to the loopback address the server binds.
pub fn loopback(url: &str) -> String {
    url.replacen("localhost", "127.0.0.1", 1)
}

/// A clock whose waits finish immediately.
pub struct InstantClock;

#[async_trait]
impl Clock for InstantClock {
    async fn sleep(&self, _duration: Duration) {}
}

/// Records everything the runner shows.
#[derive(Default)]
pub struct RecordingDisplay {
    pub frames: Vec<Frame>,
    pub html: Vec<String>,
    pub reports: Vec<String>,
    /// Fetch the frame URL in the background as soon as it is shown.
    pub fetch_on_show: bool,
}

impl DisplaySurface for RecordingDisplay {
    fn show_frame(&mut self, frame: &Frame) {
        if self.fetch_on_show {
            let url = loopback(&frame.url);
            tokio::spawn(async move {
                let _ = reqwest::get(url).await;
            });
        }
        self.frames.push(frame.clone());
    }

    fn show_html(&mut self, document: &RenderedDocument) {
        self.html.push(document.to_string());
    }

    fn report(&mut self, message: &str) {
        self.reports.push(message.to_string());
    }
}
