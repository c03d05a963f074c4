use common::ErrorLocation;

use std::error::Error as StdError;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::io::Error as IoError;
use std::panic::Location;
use std::path::PathBuf;

use thiserror::Error as ThisError;

/// What the serving unit left behind when it failed to become ready.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartDiagnostics {
    pub exit_status: Option<String>,
    pub stdout: String,
    pub stderr: String,
}

impl Display for StartDiagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match &self.exit_status {
            Some(status) => writeln!(f, "exit status: {status}")?,
            None => writeln!(f, "exit status: still running")?,
        }
        if !self.stdout.is_empty() {
            writeln!(f, "--- stdout ---")?;
            writeln!(f, "{}", self.stdout.trim_end())?;
        }
        if !self.stderr.is_empty() {
            writeln!(f, "--- stderr ---")?;
            writeln!(f, "{}", self.stderr.trim_end())?;
        }
        Ok(())
    }
}

#[derive(Debug, ThisError)]
pub enum ServerError {
    #[error("Bind Error: {message} {location}")]
    Bind {
        message: String,
        location: ErrorLocation,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("Server Start Error: {message} {location}")]
    Start {
        message: String,
        diagnostics: StartDiagnostics,
        location: ErrorLocation,
    },

    #[error("Temp File Error: {path}: {message} {location}")]
    TempFile {
        path: PathBuf,
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid Server Options Error: {message} {location}")]
    InvalidOptions {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },
}

impl ServerError {
    #[track_caller]
    pub fn start(message: impl Into<String>, diagnostics: StartDiagnostics) -> Self {
        ServerError::Start {
            message: message.into(),
            diagnostics,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn invalid_options(message: impl Into<String>) -> Self {
        ServerError::InvalidOptions {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Diagnostics worth showing the user, if this is a start failure.
    pub fn start_diagnostics(&self) -> Option<&StartDiagnostics> {
        match self {
            ServerError::Start { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}

impl From<IoError> for ServerError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        ServerError::Io {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
