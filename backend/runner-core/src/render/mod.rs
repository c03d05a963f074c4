//! HTML document generation.
//!
//! [`render_document`] validates every JSON-shaped and enumerated option and
//! substitutes them into a fixed PyScript page skeleton. It is a pure
//! function: identical options always produce identical text.

pub mod template;

use crate::error::RenderError;
use crate::options::{PyType, RunOptions};

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::fs::read_to_string;
use std::ops::Deref;
use std::panic::Location;
use std::sync::{Arc, OnceLock};

use common::ErrorLocation;
use log::debug;
use regex::Regex;
use serde_json::{Map as JsonMap, Value as JsonValue};

/// PyScript release used when `py_ver` is `none`.
pub const PYSCRIPT_DEFAULT_VERSION: &str = "2024.10.2";
const VERSION_NONE: &str = "none";
const VERSION_PATTERN: &str = r"^[0-9A-Za-z][0-9A-Za-z.\-]*$";

static VERSION_REGEX: OnceLock<Regex> = OnceLock::new();

pub(crate) fn get_version_regex() -> &'static Regex {
    VERSION_REGEX.get_or_init(|| Regex::new(VERSION_PATTERN).expect("valid regex pattern"))
}

/// A generated page. Cheap to clone, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument(Arc<str>);

impl RenderedDocument {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Deref for RenderedDocument {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Display for RenderedDocument {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.write_str(&self.0)
    }
}

/// Render the PyScript page for `options`.
///
/// # Errors
///
/// - [`RenderError::InvalidMode`] - `py_type` is not `py`, `mpy` or `py-game`
/// - [`RenderError::InvalidConfiguration`] - `py_conf` or `py_val` is not a JSON object
/// - [`RenderError::InvalidScriptList`] - `js_src` is not a JSON array of strings
/// - [`RenderError::InvalidVersion`] - `py_ver` is neither `none` nor a version string
#[track_caller]
pub fn render_document(options: &RunOptions) -> Result<RenderedDocument, RenderError> {
    let py_type: PyType = options.py_type.parse()?;
    let version = resolve_version(&options.py_ver)?;

    let config = options
        .py_conf
        .as_deref()
        .map(|text| parse_object("py_conf", text).map(|_| text.trim()))
        .transpose()?;

    let values = embedded_values(options)?;

    let mut script_sources = options.add_src.clone();
    if let Some(js_src) = options.js_src.as_deref() {
        script_sources.extend(parse_script_list(js_src)?);
    }

    let parts = template::Parts {
        version: &version,
        viewport: &options.viewport,
        background: &options.background,
        script_type: py_type.script_type(),
        config_element: py_type.config_element(),
        ready_event: py_type.ready_event(),
        stylesheets: &options.add_css,
        style: non_empty(options.add_style.as_deref()),
        script_sources: &script_sources,
        loader_extra: non_empty(options.add_script.as_deref()),
        config,
        values: values.as_deref(),
        script: &options.py_script,
    };

    let html = template::assemble(&parts);
    debug!(
        "Rendered {py_type} document ({} bytes, {} external scripts)",
        html.len(),
        script_sources.len()
    );

    Ok(RenderedDocument::new(html))
}

/// Replace `py_script` with the contents of `py_file`, if one is set.
///
/// # Errors
///
/// Returns [`RenderError::ScriptFile`] if the file cannot be read as UTF-8.
pub fn load_script_file(options: &mut RunOptions) -> Result<(), RenderError> {
    let Some(path) = options.py_file.as_ref() else {
        return Ok(());
    };

    debug!("Reading script from {}", path.display());
    options.py_script = read_to_string(path).map_err(|e| RenderError::ScriptFile {
        path: path.clone(),
        location: ErrorLocation::from(Location::caller()),
        source: e,
    })?;

    Ok(())
}

#[track_caller]
fn resolve_version(py_ver: &str) -> Result<String, RenderError> {
    let version = py_ver.trim();
    if version.eq_ignore_ascii_case(VERSION_NONE) {
        return Ok(String::from(PYSCRIPT_DEFAULT_VERSION));
    }

    if !get_version_regex().is_match(version) {
        return Err(RenderError::invalid_version(py_ver));
    }

    Ok(version.to_string())
}

#[track_caller]
fn parse_object(field: &'static str, text: &str) -> Result<JsonMap<String, JsonValue>, RenderError> {
    match serde_json::from_str::<JsonValue>(text) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(other) => Err(RenderError::invalid_configuration(
            field,
            format!("expected a JSON object, got {other}"),
        )),
        Err(e) => Err(RenderError::invalid_configuration(field, e.to_string())),
    }
}

#[track_caller]
pub(crate) fn parse_script_list(text: &str) -> Result<Vec<String>, RenderError> {
    let parsed: JsonValue = serde_json::from_str(text)
        .map_err(|e| RenderError::invalid_script_list(format!("js_src: {e}")))?;

    let JsonValue::Array(entries) = parsed else {
        return Err(RenderError::invalid_script_list(
            "js_src must be a JSON list",
        ));
    };

    entries
        .into_iter()
        .map(|entry| match entry {
            JsonValue::String(url) => Ok(url),
            other => Err(RenderError::invalid_script_list(format!(
                "js_src entries must be strings, got {other}"
            ))),
        })
        .collect()
}

/// `py_val` merged with the caller's explicit values, serialized once.
#[track_caller]
fn embedded_values(options: &RunOptions) -> Result<Option<String>, RenderError> {
    let mut merged = match options.py_val.as_deref() {
        Some(text) => parse_object("py_val", text)?,
        None => JsonMap::new(),
    };

    for (key, value) in &options.values {
        merged.insert(key.clone(), value.clone());
    }

    if merged.is_empty() {
        return Ok(None);
    }

    serde_json::to_string(&JsonValue::Object(merged))
        .map(Some)
        .map_err(|e| RenderError::invalid_configuration("py_val", e.to_string()))
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.is_empty())
}
