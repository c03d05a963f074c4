pub mod magic;
pub mod serve;

use crate::error::PysrunError;

use runner_core::config::AppConfig;
use runner_core::error::CoreError;

use std::path::Path;

use log::debug;

/// Load `path`, or the default config location, or fall back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, PysrunError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match AppConfig::default_path() {
            Some(path) => path,
            None => {
                debug!("No config directory on this platform, using defaults");
                return Ok(AppConfig::default());
            }
        },
    };

    AppConfig::load(&path).map_err(|e| PysrunError::Core(CoreError::from(e)))
}
