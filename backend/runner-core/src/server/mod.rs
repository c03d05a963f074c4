//! Ephemeral single-document HTTP server.
//!
//! One server instance serves one rendered document on loopback:
//!
//! - `GET <served path>` returns the document as `text/html`
//! - any other path is looked up as a static file under the working directory
//! - unknown paths get `404 Not Found`
//!
//! The server stops when its lifetime budget runs out, when the document was
//! fetched and the linger period passed, or when the owner calls
//! [`ServerHandle::stop`], whichever happens first. The listening socket, the
//! background unit and any temporary file are released on every path.
//!
//! # Serving units
//!
//! - [`ServingUnitKind::Task`]: a tokio task in this process, serving the
//!   socket reserved by the port scan
//! - [`ServingUnitKind::Child`]: a `pysrun serve <port>` child process that
//!   receives the document on stdin and reports readiness on stdout

mod artifact;
mod child;
mod handle;
mod readiness;
mod routes;
mod task;

pub use artifact::TemporaryArtifact;
pub use child::{
    CHILD_DEFAULT_PORT, ChildServeArgs, FETCHED_MARKER, LIFETIME_FLAG, LINGER_FLAG,
    READY_MARKER_PREFIX, SERVE_COMMAND, get_ready_regex, parse_child_port, serve_child,
};
pub use handle::ServerHandle;

#[cfg(test)]
pub(crate) use child::build_serve_command;

use crate::error::server::ServerError;
use crate::port::{ReservedPort, default_port_range};
use crate::render::RenderedDocument;

use std::env::current_dir;
use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

pub const ROOT_PATH: &str = "/";
pub const NOT_FOUND_BODY: &str = "404 Not Found";
pub const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(60);
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the document lives while it is being served.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentBacking {
    /// Held in memory, served on every fetch of the served path.
    #[default]
    Memory,
    /// Written to a uniquely named file in the system temp directory, served once, then deleted.
    TempFile,
}

/// What runs the accept loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServingUnitKind {
    #[default]
    Task,
    Child,
}

/// Everything needed to start one server.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub port_range: Range<u16>,
    pub max_lifetime: Duration,
    /// Stop this long after the first successful fetch of the document.
    pub linger: Option<Duration>,
    pub document: RenderedDocument,
    pub served_path: String,
    pub working_directory: PathBuf,
    pub backing: DocumentBacking,
    pub unit: ServingUnitKind,
    pub ready_timeout: Duration,
    pub child_program: Option<PathBuf>,
}

impl ServerOptions {
    /// Options with the default port range, lifetime and the current directory.
    pub fn new(document: RenderedDocument) -> Self {
        Self {
            port_range: default_port_range(),
            max_lifetime: DEFAULT_MAX_LIFETIME,
            linger: None,
            document,
            served_path: String::from(ROOT_PATH),
            working_directory: current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            backing: DocumentBacking::default(),
            unit: ServingUnitKind::default(),
            ready_timeout: DEFAULT_READY_TIMEOUT,
            child_program: None,
        }
    }

    pub fn with_port_range(mut self, range: Range<u16>) -> Self {
        self.port_range = range;
        self
    }

    pub fn with_max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    pub fn with_linger(mut self, linger: Option<Duration>) -> Self {
        self.linger = linger;
        self
    }

    pub fn with_served_path(mut self, path: impl Into<String>) -> Self {
        self.served_path = path.into();
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = dir.into();
        self
    }

    pub fn with_backing(mut self, backing: DocumentBacking) -> Self {
        self.backing = backing;
        self
    }

    pub fn with_unit(mut self, unit: ServingUnitKind) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn with_child_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.child_program = Some(program.into());
        self
    }

    /// Check the invariants before anything is acquired.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.port_range.start >= self.port_range.end {
            return Err(ServerError::invalid_options(format!(
                "port range {}..{} is empty",
                self.port_range.start, self.port_range.end
            )));
        }

        if self.max_lifetime.is_zero() {
            return Err(ServerError::invalid_options("max lifetime must be positive"));
        }

        let path = self.served_path.as_str();
        if !path.starts_with('/') || path.contains(['{', '}', '*', ':', '?', '#']) {
            return Err(ServerError::invalid_options(format!(
                "served path '{path}' must start with '/' and be a plain path"
            )));
        }

        if !self.working_directory.is_dir() {
            return Err(ServerError::invalid_options(format!(
                "working directory {} does not exist",
                self.working_directory.display()
            )));
        }

        Ok(())
    }
}

/// Start serving `options.document` on an already reserved port.
///
/// Returns once the serving unit accepts connections.
///
/// # Errors
///
/// - [`ServerError::InvalidOptions`] - options violate an invariant
/// - [`ServerError::TempFile`] - the temporary document could not be written
/// - [`ServerError::Start`] - the serving unit never became ready
pub async fn start(options: ServerOptions, reserved: ReservedPort) -> Result<ServerHandle, ServerError> {
    options.validate()?;

    let port = reserved.port();
    info!("Starting {:?} server on port {port}", options.unit);

    match options.unit {
        ServingUnitKind::Task => task::start_task(options, reserved).await,
        ServingUnitKind::Child => child::start_child(options, reserved).await,
    }
}
