use runner_core::render::RenderedDocument;
use runner_core::runner::{DisplaySurface, Frame};

use std::io::{Stderr, Stdout, Write, stderr, stdout};

use log::warn;

/// Display surface for a terminal: output on `out`, reports on `err`.
pub struct ConsoleDisplay<O: Write + Send, E: Write + Send> {
    out: O,
    err: E,
}

impl ConsoleDisplay<Stdout, Stderr> {
    pub fn stdio() -> Self {
        Self::new(stdout(), stderr())
    }
}

impl<O: Write + Send, E: Write + Send> ConsoleDisplay<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    pub fn into_parts(self) -> (O, E) {
        (self.out, self.err)
    }
}

impl<O: Write + Send, E: Write + Send> DisplaySurface for ConsoleDisplay<O, E> {
    fn show_frame(&mut self, frame: &Frame) {
        if let Err(e) = writeln!(self.out, "{}\n{}", frame.to_iframe(), frame.url)
            .and_then(|_| self.out.flush())
        {
            warn!("Failed to write frame: {e}");
        }
    }

    fn show_html(&mut self, document: &RenderedDocument) {
        if let Err(e) = writeln!(self.out, "{document}").and_then(|_| self.out.flush()) {
            warn!("Failed to write document: {e}");
        }
    }

    fn report(&mut self, message: &str) {
        if let Err(e) = writeln!(self.err, "{message}") {
            warn!("Failed to write report: {e}");
        }
    }
}
