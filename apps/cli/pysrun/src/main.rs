use pysrun::cli::{Cli, Command};
use pysrun::commands::{load_config, magic, serve};
use pysrun::display::ConsoleDisplay;
use pysrun::error::PysrunError;
use pysrun::logger::{initialize as LoggerInitialize, level_for_verbosity};

use runner_core::command::CellMagic;
use runner_core::runner::RunOutcome;

use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = LoggerInitialize(level_for_verbosity(cli.verbose), cli.log_dir.as_deref()) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, PysrunError> {
    let (cell_magic, args) = match cli.command {
        Command::Serve(args) => {
            serve::execute(args).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Run(args) => (CellMagic::RunPys, args),
        Command::Gen(args) => (CellMagic::GenPys, args),
    };

    let config = load_config(cli.config.as_deref())?;
    let mut display = ConsoleDisplay::stdio();

    match magic::execute(cell_magic, args, config, &mut display).await? {
        RunOutcome::Rendered(_) => Ok(ExitCode::SUCCESS),
        RunOutcome::Served { port, fetched, .. } => {
            info!("Server on port {port} finished (fetched: {fetched})");
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::StartFailed { .. } => Ok(ExitCode::FAILURE),
    }
}
