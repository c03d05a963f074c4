//! `pysrun run` and `pysrun gen`.

use crate::cli::MagicArgs;
use crate::error::PysrunError;

use runner_core::command::CellMagic;
use runner_core::config::AppConfig;
use runner_core::error::CoreError;
use runner_core::options::{PartialRunOptions, RunOptions};
use runner_core::runner::{DisplaySurface, RunOutcome, Runner};

use common::ErrorLocation;

use std::io::{IsTerminal, Read, stdin};
use std::panic::Location;

use log::{debug, info, trace};

/// Resolve the options for one invocation.
///
/// Layers, lowest first: built-in defaults, `[defaults]` from the config,
/// `--options` JSON, then the magic line with the script.
pub fn resolve_options(
    magic: CellMagic,
    args: &MagicArgs,
    config: &AppConfig,
    script: &str,
) -> Result<RunOptions, PysrunError> {
    let mut session = config.defaults.clone();

    if let Some(json) = args.options.as_deref() {
        let value = serde_json::from_str(json).map_err(|e| PysrunError::Pysrun {
            message: format!("--options is not valid JSON: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;
        session = session.then(PartialRunOptions::from_json(value).map_err(CoreError::from)?);
    }

    let magic_layer = match args.line.as_deref() {
        Some(line) => magic.invoke(line, script),
        None => magic.invoke_tokens(args.args.clone(), script),
    }
    .map_err(CoreError::from)?;
    session = session.then(magic_layer);

    if let Some(path) = &args.script_file {
        session = session.then(PartialRunOptions {
            py_file: Some(path.clone()),
            ..Default::default()
        });
    }

    trace!("Resolved options layer: {session:?}");
    Ok(RunOptions::default().overlay(session))
}

/// Script text from stdin, or empty when stdin is a terminal or a file is given.
pub fn read_script(args: &MagicArgs) -> Result<String, PysrunError> {
    if args.script_file.is_some() || stdin().is_terminal() {
        return Ok(String::new());
    }

    let mut script = String::new();
    stdin()
        .read_to_string(&mut script)
        .map_err(|e| PysrunError::Pysrun {
            message: format!("Failed to read script from stdin: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;
    debug!("Read {} bytes of script from stdin", script.len());
    Ok(script)
}

/// Run one magic invocation against `display`.
pub async fn execute<D>(
    magic: CellMagic,
    args: MagicArgs,
    config: AppConfig,
    display: &mut D,
) -> Result<RunOutcome, PysrunError>
where
    D: DisplaySurface + ?Sized,
{
    let script = read_script(&args)?;
    let options = resolve_options(magic, &args, &config, &script)?;

    info!("Running {} ({}x{}, {})", magic.name(), options.width, options.height, options.py_type);

    let runner = Runner::new(config)?;
    Ok(runner.run(options, display).await?)
}
