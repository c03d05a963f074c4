use crate::render::RenderedDocument;
use crate::render::template::escape_attr;

/// What the host shows: a frame pointing at the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// The frame as an `<iframe>` element.
    pub fn to_iframe(&self) -> String {
        format!(
            r#"<iframe src="{}" width="{}" height="{}" frameborder="0"></iframe>"#,
            escape_attr(&self.url),
            self.width,
            self.height
        )
    }
}

/// Where results of a run end up (a notebook output area, a terminal, a test recorder).
pub trait DisplaySurface: Send {
    fn show_frame(&mut self, frame: &Frame);

    fn show_html(&mut self, document: &RenderedDocument);

    /// Human-readable failure report, e.g. a server start diagnostic.
    fn report(&mut self, message: &str);
}
