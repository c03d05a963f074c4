//! Command-line surface of `pysrun`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Run Python cells in the browser through a PyScript page served from localhost
#[derive(Parser, Debug)]
#[command(name = "pysrun")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to <config dir>/pysrun/config.toml)
    #[arg(long, global = true, env = "PYSRUN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write logs to <DIR>/pysrun.log
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the cell and print the frame pointing at it (the `runpys` magic)
    Run(MagicArgs),

    /// Print the generated HTML without serving it (the `genpys` magic)
    Gen(MagicArgs),

    /// Serve a document read from stdin (the child serving unit)
    Serve(ServeArgs),
}

/// Arguments shared by `run` and `gen`.
#[derive(Args, Debug, Clone, Default)]
pub struct MagicArgs {
    /// Positional magic arguments:
    /// width height background py_type py_val py_conf js_src py_ver viewport
    #[arg(value_name = "ARGS", allow_hyphen_values = true, conflicts_with = "line")]
    pub args: Vec<String>,

    /// The raw magic line, split like a shell would
    #[arg(long)]
    pub line: Option<String>,

    /// Read the script from this file instead of stdin
    #[arg(long, value_name = "PATH")]
    pub script_file: Option<PathBuf>,

    /// Extra options as a JSON object (e.g. '{"add_src": ["x.js"], "duration": 2}')
    #[arg(long, value_name = "JSON")]
    pub options: Option<String>,
}

/// Arguments of the child serving unit.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Port to bind on 127.0.0.1 (18000 when absent or not a number)
    pub port: Option<String>,

    /// Stop after this many milliseconds
    #[arg(long, default_value_t = 60_000)]
    pub lifetime_ms: u64,

    /// Stop this many milliseconds after the document was first fetched
    #[arg(long)]
    pub linger_ms: Option<u64>,
}
