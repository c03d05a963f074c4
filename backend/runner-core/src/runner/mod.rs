//! The run flow: options in, frame (or HTML) out, server torn down afterwards.

mod clock;
mod display;

pub use clock::{Clock, TokioClock};
pub use display::{DisplaySurface, Frame};

use crate::command::CellMagic;
use crate::config::AppConfig;
use crate::error::{CoreError, RenderError};
use crate::error::server::{ServerError, StartDiagnostics};
use crate::options::RunOptions;
use crate::port::find_free_port;
use crate::render::{RenderedDocument, load_script_file, render_document};
use crate::resolver::{UrlResolver, for_environment};
use crate::server::{self, ServerHandle, ServerOptions};

use std::env::current_dir;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// `htmlmode`: the document went to the display, no server was started.
    Rendered(RenderedDocument),
    /// The server never became ready; the diagnostics were reported.
    StartFailed {
        message: String,
        diagnostics: StartDiagnostics,
    },
    /// The frame was shown and the server has been stopped.
    Served {
        port: u16,
        url: String,
        fetched: bool,
    },
}

/// Turns resolved options into a page. Defaults to [`render_document`].
pub type Renderer = Box<dyn Fn(&RunOptions) -> Result<RenderedDocument, RenderError> + Send + Sync>;

pub struct Runner {
    config: AppConfig,
    resolver: Box<dyn UrlResolver>,
    renderer: Renderer,
    clock: Arc<dyn Clock>,
}

impl Runner {
    /// Runner for `config` using real time.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Server`] if the configured environment has no usable URL resolver.
    pub fn new(config: AppConfig) -> Result<Self, CoreError> {
        Self::with_clock(config, Arc::new(TokioClock))
    }

    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Result<Self, CoreError> {
        let resolver = for_environment(&config.environment)?;
        Ok(Self {
            config,
            resolver,
            renderer: Box::new(|options: &RunOptions| render_document(options)),
            clock,
        })
    }

    pub fn with_resolver(mut self, resolver: Box<dyn UrlResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Generate pages with `renderer` instead of the built-in template.
    ///
    /// The script file is still loaded first, and the result is served or
    /// shown exactly like a built-in page.
    pub fn with_renderer<F>(mut self, renderer: F) -> Self
    where
        F: Fn(&RunOptions) -> Result<RenderedDocument, RenderError> + Send + Sync + 'static,
    {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Resolve a magic invocation: built-in defaults, then `[defaults]`, then the line.
    pub fn options_for(
        &self,
        magic: CellMagic,
        line: &str,
        cell: &str,
    ) -> Result<RunOptions, CoreError> {
        let from_line = magic.invoke(line, cell)?;
        Ok(RunOptions::layered([self.config.defaults.clone(), from_line]))
    }

    /// Server options for one run of `options`.
    pub fn server_options(
        &self,
        document: RenderedDocument,
        options: &RunOptions,
    ) -> Result<ServerOptions, ServerError> {
        let server = &self.config.server;
        let working_directory = match &server.working_directory {
            Some(dir) => dir.clone(),
            None => current_dir()?,
        };

        let mut server_options = ServerOptions::new(document)
            .with_port_range(server.port_range())
            .with_max_lifetime(server.max_lifetime())
            .with_linger(Some(options.linger))
            .with_working_directory(working_directory)
            .with_backing(server.backing)
            .with_unit(server.unit)
            .with_ready_timeout(server.ready_timeout());
        if let Some(program) = &server.child_program {
            server_options = server_options.with_child_program(program);
        }

        Ok(server_options)
    }

    /// Render `options` and show the result on `display`.
    ///
    /// In frame mode this serves the document, shows the frame and returns
    /// once the server has been stopped: after the first fetch plus the
    /// linger, or after the lifetime budget, whichever comes first.
    ///
    /// # Errors
    ///
    /// Validation, port and resolver errors are returned before anything is
    /// shown. A server that fails to start is reported on `display` and
    /// yields [`RunOutcome::StartFailed`] instead.
    pub async fn run<D>(&self, mut options: RunOptions, display: &mut D) -> Result<RunOutcome, CoreError>
    where
        D: DisplaySurface + ?Sized,
    {
        load_script_file(&mut options)?;
        let document = (self.renderer)(&options)?;

        if options.htmlmode {
            debug!("HTML mode, showing document without serving");
            display.show_html(&document);
            return Ok(RunOutcome::Rendered(document));
        }

        let reserved = find_free_port(self.config.server.port_range())?;
        let port = reserved.port();
        let server_options = self.server_options(document, &options)?;

        let mut handle = match server::start(server_options, reserved).await {
            Ok(handle) => handle,
            Err(e) => return self.start_failed(e, display),
        };

        let url = match self.resolver.frame_url(port, handle.served_path()) {
            Ok(url) => url,
            Err(e) => {
                handle.stop().await;
                return Err(e.into());
            }
        };

        display.show_frame(&Frame {
            url: url.clone(),
            width: options.width,
            height: options.height,
        });
        info!("Frame shown for {url}");

        let lingered = tokio::select! {
            lingered = self.linger_after_fetch(&mut handle, options.linger) => lingered,
            _ = self.clock.sleep(self.config.server.max_lifetime()) => false,
        };
        let fetched = lingered || handle.primary_fetched();

        handle.stop().await;

        Ok(RunOutcome::Served { port, url, fetched })
    }

    fn start_failed<D>(&self, error: ServerError, display: &mut D) -> Result<RunOutcome, CoreError>
    where
        D: DisplaySurface + ?Sized,
    {
        let Some(diagnostics) = error.start_diagnostics().cloned() else {
            return Err(error.into());
        };

        warn!("Server failed to start: {error}");
        let message = error.to_string();
        display.report(&format!("{message}\n{diagnostics}"));

        Ok(RunOutcome::StartFailed {
            message,
            diagnostics,
        })
    }

    async fn linger_after_fetch(&self, handle: &mut ServerHandle, linger: Duration) -> bool {
        if !handle.wait_for_primary_fetch().await {
            debug!("Server on port {} finished without a fetch", handle.port());
            return false;
        }

        debug!("Document fetched, lingering for {linger:?}");
        self.clock.sleep(linger).await;
        true
    }
}
