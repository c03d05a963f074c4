use crate::error::config::ConfigError;
use crate::options::PartialRunOptions;
use crate::server::{DocumentBacking, ServingUnitKind};
use crate::{DEFAULT_PORT_RANGE_END, DEFAULT_PORT_RANGE_START};

use common::ErrorLocation;

use std::ops::Range;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_DIR_NAME: &str = "pysrun";
const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_VERSION: u32 = 1;

// ============================================
// ENUMS WITH DEFAULTS
// ============================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentMode {
    /// Browser and server share the machine.
    #[default]
    Local,
    /// Ports are only reachable through the host's proxy.
    Hosted,
}

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port_range_start")]
    pub port_range_start: u16,
    #[serde(default = "default_port_range_end")]
    pub port_range_end: u16,
    #[serde(default = "default_max_lifetime_secs")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
    #[serde(default)]
    pub backing: DocumentBacking,
    #[serde(default)]
    pub unit: ServingUnitKind,
    /// Static files are served from here; defaults to the current directory.
    pub working_directory: Option<PathBuf>,
    /// Binary started for the child serving unit; defaults to the running executable.
    pub child_program: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port_range_start: default_port_range_start(),
            port_range_end: default_port_range_end(),
            max_lifetime_secs: default_max_lifetime_secs(),
            ready_timeout_secs: default_ready_timeout_secs(),
            backing: DocumentBacking::default(),
            unit: ServingUnitKind::default(),
            working_directory: None,
            child_program: None,
        }
    }
}

impl ServerConfig {
    pub fn port_range(&self) -> Range<u16> {
        self.port_range_start..self.port_range_end
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub mode: EnvironmentMode,
    /// Proxy URL with a `{port}` placeholder, used when `mode = "hosted"`.
    pub proxy_url_template: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub environment: EnvironmentConfig,

    /// Session defaults applied when a magic line is empty.
    #[serde(default)]
    pub defaults: PartialRunOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: ServerConfig::default(),
            environment: EnvironmentConfig::default(),
            defaults: PartialRunOptions::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_port_range_start() -> u16 {
    DEFAULT_PORT_RANGE_START
}
fn default_port_range_end() -> u16 {
    DEFAULT_PORT_RANGE_END
}
fn default_max_lifetime_secs() -> u64 {
    60
}
fn default_ready_timeout_secs() -> u64 {
    5
}

// ============================================
// IMPLEMENTATION
// ============================================

impl AppConfig {
    /// `<config dir>/pysrun/config.toml`, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load config from `path`.
    ///
    /// # Returns
    ///
    /// Returns defaults if the file does not exist.
    /// Returns `Err(ConfigError)` if the file exists but is unreadable, malformed or invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("Config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            warn!("Failed to read config file: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        let config: AppConfig = toml::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config TOML: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", path.display());
        Ok(config)
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(validation_error(format!(
                "Invalid version: {} (expected 1-{})",
                self.version, CONFIG_VERSION
            )));
        }

        if self.server.port_range_start >= self.server.port_range_end {
            return Err(validation_error(format!(
                "Invalid port range: {}..{} (start must be below end)",
                self.server.port_range_start, self.server.port_range_end
            )));
        }

        if self.server.max_lifetime_secs == 0 {
            return Err(validation_error("max_lifetime_secs must be greater than 0"));
        }

        if self.server.ready_timeout_secs == 0 {
            return Err(validation_error("ready_timeout_secs must be greater than 0"));
        }

        if self.environment.mode == EnvironmentMode::Hosted {
            match self.environment.proxy_url_template.as_deref() {
                None | Some("") => {
                    return Err(validation_error(
                        "hosted environment requires proxy_url_template",
                    ));
                }
                Some(template) if !template.contains(crate::resolver::PORT_PLACEHOLDER) => {
                    return Err(validation_error(format!(
                        "proxy_url_template '{template}' has no {{port}} placeholder"
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

#[track_caller]
fn validation_error(reason: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        location: ErrorLocation::from(Location::caller()),
        reason: reason.into(),
    }
}
