// Unit tests for option resolution and the serve argument translation

use crate::cli::{MagicArgs, ServeArgs};
use crate::commands::load_config;
use crate::commands::magic::resolve_options;
use crate::commands::serve::child_args;
use crate::error::PysrunError;

use runner_core::command::CellMagic;
use runner_core::config::AppConfig;
use runner_core::error::CoreError;
use runner_core::options::DimensionInput;
use runner_core::server::CHILD_DEFAULT_PORT;

use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;

fn config_with_default_width(width: u32) -> AppConfig {
    let mut config = AppConfig::default();
    config.defaults.width = Some(DimensionInput::from(width));
    config
}

/// **VALUE**: Verifies the precedence of the option layers.
///
/// **WHY THIS MATTERS**: Config defaults, `--options` and the magic line all set
/// the same fields. The most specific source must win.
///
/// **BUG THIS CATCHES**: Would catch if layers are applied in the wrong order.
#[test]
fn given_all_layers_when_resolve_options_then_magic_line_wins() {
    // GIVEN: Config says 320, JSON says 640 and sets a height
    let config = config_with_default_width(320);
    let json_only = MagicArgs {
        options: Some(String::from(r#"{"width": 640, "height": 100}"#)),
        ..Default::default()
    };

    // WHEN/THEN: No magic args, JSON beats config
    let options = resolve_options(CellMagic::RunPys, &json_only, &config, "pass")
        .expect("valid options");
    assert_eq!(options.width, 640);
    assert_eq!(options.height, 100);
    assert_eq!(options.py_script, "pass");
    assert!(!options.htmlmode);

    // WHEN/THEN: A positional width beats both
    let with_args = MagicArgs {
        args: vec![String::from("800")],
        ..json_only
    };
    let options = resolve_options(CellMagic::GenPys, &with_args, &config, "pass")
        .expect("valid options");
    assert_eq!(options.width, 800);
    assert_eq!(options.height, 100);
    assert!(options.htmlmode);
}

#[test]
fn given_only_config_defaults_when_resolve_options_then_defaults_apply() {
    let config = config_with_default_width(320);

    let options = resolve_options(CellMagic::RunPys, &MagicArgs::default(), &config, "")
        .expect("valid options");

    assert_eq!(options.width, 320);
}

#[test]
fn given_line_when_resolve_options_then_line_is_tokenized() {
    let args = MagicArgs {
        line: Some(String::from("640 480 'light blue'")),
        ..Default::default()
    };

    let options = resolve_options(CellMagic::RunPys, &args, &AppConfig::default(), "")
        .expect("valid options");

    assert_eq!(options.width, 640);
    assert_eq!(options.height, 480);
    assert_eq!(options.background, "light blue");
}

#[test]
fn given_script_file_when_resolve_options_then_py_file_set() {
    let args = MagicArgs {
        script_file: Some(PathBuf::from("cell.py")),
        ..Default::default()
    };

    let options = resolve_options(CellMagic::GenPys, &args, &AppConfig::default(), "")
        .expect("valid options");

    assert_eq!(options.py_file, Some(PathBuf::from("cell.py")));
}

/// **BUG THIS CATCHES**: Would catch if malformed `--options` is ignored instead of
/// failing the run.
#[test]
fn given_invalid_options_json_when_resolve_options_then_returns_error() {
    let not_json = MagicArgs {
        options: Some(String::from("{width")),
        ..Default::default()
    };
    let not_object = MagicArgs {
        options: Some(String::from("[1, 2]")),
        ..Default::default()
    };
    let config = AppConfig::default();

    assert!(matches!(
        resolve_options(CellMagic::RunPys, &not_json, &config, ""),
        Err(PysrunError::Pysrun { .. })
    ));
    assert!(matches!(
        resolve_options(CellMagic::RunPys, &not_object, &config, ""),
        Err(PysrunError::Core(CoreError::Render(_)))
    ));
}

#[test]
fn given_unterminated_quote_when_resolve_options_then_returns_command_error() {
    let args = MagicArgs {
        line: Some(String::from("640 'oops")),
        ..Default::default()
    };

    let result = resolve_options(CellMagic::RunPys, &args, &AppConfig::default(), "");

    assert!(matches!(
        result,
        Err(PysrunError::Core(CoreError::Command(_)))
    ));
}

#[test]
fn given_missing_config_file_when_load_config_then_defaults() {
    let dir = TempDir::new().expect("temp dir");

    let config = load_config(Some(&dir.path().join("absent.toml"))).expect("defaults");

    assert!(config.defaults.width.is_none());
}

#[test]
fn given_malformed_config_file_when_load_config_then_returns_config_error() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "version = [").expect("write config");

    let result = load_config(Some(&path));

    assert!(matches!(result, Err(PysrunError::Core(CoreError::Config(_)))));
}

#[test]
fn given_serve_args_when_child_args_then_port_and_durations_translated() {
    let args = ServeArgs {
        port: Some(String::from("not-a-port")),
        lifetime_ms: 0,
        linger_ms: Some(500),
    };

    let child = child_args(&args).expect("current dir readable");

    assert_eq!(child.port, CHILD_DEFAULT_PORT);
    assert_eq!(child.lifetime, Duration::from_millis(1));
    assert_eq!(child.linger, Some(Duration::from_millis(500)));
}
