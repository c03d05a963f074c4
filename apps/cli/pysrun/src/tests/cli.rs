// Unit tests for command-line parsing

use crate::cli::{Cli, Command};

use std::path::PathBuf;

use clap::Parser;

#[test]
fn given_positional_args_when_parse_run_then_collects_magic_args() {
    // WHEN: Parsing `run` with positional magic arguments
    let cli = Cli::try_parse_from(["pysrun", "run", "400", "300", "ivory", "mpy"])
        .expect("valid command line");

    // THEN: The arguments are kept in order, untouched
    let Command::Run(args) = cli.command else {
        panic!("Expected run subcommand");
    };
    assert_eq!(args.args, vec!["400", "300", "ivory", "mpy"]);
    assert!(args.line.is_none());
    assert_eq!(cli.verbose, 0);
}

/// **VALUE**: Verifies `--line` and positional arguments cannot be mixed.
///
/// **BUG THIS CATCHES**: Would catch if the conflict is dropped and one of the
/// two silently wins.
#[test]
fn given_line_and_positional_args_when_parse_then_rejected() {
    let result = Cli::try_parse_from(["pysrun", "run", "--line", "400 300", "640"]);

    assert!(result.is_err(), "--line and ARGS must conflict");
}

#[test]
fn given_gen_with_options_when_parse_then_fields_set() {
    let cli = Cli::try_parse_from([
        "pysrun",
        "-vv",
        "--config",
        "/tmp/pysrun.toml",
        "gen",
        "--line",
        "'' '' '' py '{\"x\": 1}'",
        "--options",
        "{\"duration\": 2}",
        "--script-file",
        "cell.py",
    ])
    .expect("valid command line");

    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.config, Some(PathBuf::from("/tmp/pysrun.toml")));

    let Command::Gen(args) = cli.command else {
        panic!("Expected gen subcommand");
    };
    assert_eq!(args.line.as_deref(), Some("'' '' '' py '{\"x\": 1}'"));
    assert_eq!(args.options.as_deref(), Some("{\"duration\": 2}"));
    assert_eq!(args.script_file, Some(PathBuf::from("cell.py")));
    assert!(args.args.is_empty());
}

/// **VALUE**: Verifies the child unit accepts a non-numeric port.
///
/// **WHY THIS MATTERS**: A bad port must fall back to the default inside the child,
/// not be rejected by the argument parser before the child can print anything.
#[test]
fn given_serve_with_text_port_when_parse_then_port_kept_as_text() {
    let cli = Cli::try_parse_from(["pysrun", "serve", "abc", "--lifetime-ms", "1500"])
        .expect("valid command line");

    let Command::Serve(args) = cli.command else {
        panic!("Expected serve subcommand");
    };
    assert_eq!(args.port.as_deref(), Some("abc"));
    assert_eq!(args.lifetime_ms, 1500);
    assert_eq!(args.linger_ms, None);
}

#[test]
fn given_serve_without_flags_when_parse_then_defaults_apply() {
    let cli = Cli::try_parse_from(["pysrun", "serve"]).expect("valid command line");

    let Command::Serve(args) = cli.command else {
        panic!("Expected serve subcommand");
    };
    assert_eq!(args.port, None);
    assert_eq!(args.lifetime_ms, 60_000);
}
