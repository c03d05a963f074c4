// Unit tests for config loading and validation

use crate::config::{AppConfig, EnvironmentMode};
use crate::error::config::ConfigError;
use crate::server::{DocumentBacking, ServingUnitKind};

use std::fs;
use std::time::Duration;

use tempfile::TempDir;

/// **VALUE**: Verifies a missing config file yields defaults instead of an error.
///
/// **WHY THIS MATTERS**: First runs have no config file at all.
#[test]
fn given_missing_file_when_load_then_returns_defaults() {
    let dir = TempDir::new().expect("temp dir");

    let config = AppConfig::load(&dir.path().join("config.toml")).expect("defaults");

    assert_eq!(config.server.port_range(), 18000..18099);
    assert_eq!(config.server.max_lifetime(), Duration::from_secs(60));
    assert_eq!(config.server.ready_timeout(), Duration::from_secs(5));
    assert_eq!(config.server.backing, DocumentBacking::Memory);
    assert_eq!(config.server.unit, ServingUnitKind::Task);
    assert_eq!(config.environment.mode, EnvironmentMode::Local);
}

/// **VALUE**: Verifies every section parses, including session defaults with
/// the `duration` alias.
#[test]
fn given_full_file_when_load_then_reads_all_sections() {
    // GIVEN: A config file with every section
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
version = 1

[server]
port_range_start = 19000
port_range_end = 19010
max_lifetime_secs = 30
backing = "temp_file"
unit = "child"

[environment]
mode = "hosted"
proxy_url_template = "https://proxy.example.com/{port}/"

[defaults]
background = "black"
width = 640
duration = 2
add_src = ["extra.js"]
"#,
    )
    .expect("write config");

    // WHEN: Loading
    let config = AppConfig::load(&path).expect("config should load");

    // THEN: Values are read
    assert_eq!(config.server.port_range(), 19000..19010);
    assert_eq!(config.server.max_lifetime(), Duration::from_secs(30));
    assert_eq!(config.server.backing, DocumentBacking::TempFile);
    assert_eq!(config.server.unit, ServingUnitKind::Child);
    assert_eq!(config.environment.mode, EnvironmentMode::Hosted);
    assert_eq!(config.defaults.background.as_deref(), Some("black"));
    assert_eq!(config.defaults.linger_secs, Some(2));
    assert_eq!(config.defaults.add_src, Some(vec!["extra.js".to_string()]));
}

/// **VALUE**: Verifies malformed TOML is a ParseError naming the file.
#[test]
fn given_malformed_toml_when_load_then_returns_parse_error() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("config.toml");
    fs::write(&path, "[server\nport_range_start = ").expect("write config");

    match AppConfig::load(&path) {
        Err(ConfigError::ParseError { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("Expected ParseError, got {other:?}"),
    }
}

/// **VALUE**: Verifies validation rejects values that would break the server.
///
/// **BUG THIS CATCHES**: Would catch an inverted port range or zero lifetime
/// reaching the scanner/server, or hosted mode without a proxy template.
#[test]
fn given_invalid_values_when_validate_then_returns_validation_error() {
    let mut inverted = AppConfig::default();
    inverted.server.port_range_start = 18100;
    inverted.server.port_range_end = 18000;

    let mut zero_lifetime = AppConfig::default();
    zero_lifetime.server.max_lifetime_secs = 0;

    let mut hosted_without_template = AppConfig::default();
    hosted_without_template.environment.mode = EnvironmentMode::Hosted;

    let mut template_without_port = AppConfig::default();
    template_without_port.environment.mode = EnvironmentMode::Hosted;
    template_without_port.environment.proxy_url_template = Some("https://proxy/".into());

    let mut future_version = AppConfig::default();
    future_version.version = 99;

    for config in [
        inverted,
        zero_lifetime,
        hosted_without_template,
        template_without_port,
        future_version,
    ] {
        assert!(
            matches!(config.validate(), Err(ConfigError::ValidationError { .. })),
            "Expected ValidationError for {config:?}"
        );
    }

    assert!(AppConfig::default().validate().is_ok());
}
