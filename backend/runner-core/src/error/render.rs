//! Errors raised while validating options and rendering the document.
//!
//! All of these fire before any server resource is acquired.

use common::ErrorLocation;

use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum RenderError {
    #[error("Invalid Argument Type Error: {message} {location}")]
    InvalidArgumentType {
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid Mode Error: '{mode}' is not one of py, mpy, py-game {location}")]
    InvalidMode {
        mode: String,
        location: ErrorLocation,
    },

    #[error("Invalid Configuration Error: {field}: {message} {location}")]
    InvalidConfiguration {
        field: &'static str,
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid Script List Error: {message} {location}")]
    InvalidScriptList {
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid Version Error: '{version}' {location}")]
    InvalidVersion {
        version: String,
        location: ErrorLocation,
    },

    #[error("Script File Error: {path}: {source} {location}")]
    ScriptFile {
        path: PathBuf,
        location: ErrorLocation,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    #[track_caller]
    pub fn invalid_argument_type(message: impl Into<String>) -> Self {
        RenderError::InvalidArgumentType {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn invalid_mode(mode: impl Into<String>) -> Self {
        RenderError::InvalidMode {
            mode: mode.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn invalid_configuration(field: &'static str, message: impl Into<String>) -> Self {
        RenderError::InvalidConfiguration {
            field,
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn invalid_script_list(message: impl Into<String>) -> Self {
        RenderError::InvalidScriptList {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn invalid_version(version: impl Into<String>) -> Self {
        RenderError::InvalidVersion {
            version: version.into(),
            location: ErrorLocation::caller(),
        }
    }
}
