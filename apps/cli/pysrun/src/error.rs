use common::ErrorLocation;

use runner_core::error::CoreError;

use thiserror::Error;

/// Errors surfaced by the `pysrun` binary.
#[derive(Debug, Error)]
pub enum PysrunError {
    /// Error from this app (logger, stdin, arguments)
    #[error("Pysrun Error: {message} {location}")]
    Pysrun {
        message: String,
        location: ErrorLocation,
    },

    /// Error from runner-core (rendering, port scan, server, config)
    #[error(transparent)]
    Core(#[from] CoreError),
}
