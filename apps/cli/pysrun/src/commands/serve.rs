//! `pysrun serve [PORT]`: the child serving unit.

use crate::cli::ServeArgs;
use crate::error::PysrunError;

use runner_core::error::CoreError;
use runner_core::server::{ChildServeArgs, parse_child_port, serve_child};

use common::ErrorLocation;

use std::env::current_dir;
use std::panic::Location;
use std::time::Duration;

/// Translate CLI arguments into the child entry point's arguments.
pub fn child_args(args: &ServeArgs) -> Result<ChildServeArgs, PysrunError> {
    let working_directory = current_dir().map_err(|e| PysrunError::Pysrun {
        message: format!("Failed to read current directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    Ok(ChildServeArgs {
        port: parse_child_port(args.port.as_deref()),
        lifetime: Duration::from_millis(args.lifetime_ms.max(1)),
        linger: args.linger_ms.map(Duration::from_millis),
        working_directory,
    })
}

pub async fn execute(args: ServeArgs) -> Result<(), PysrunError> {
    let child_args = child_args(&args)?;
    serve_child(child_args).await.map_err(CoreError::from)?;
    Ok(())
}
