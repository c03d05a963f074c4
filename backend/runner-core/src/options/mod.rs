//! Invocation parameters and their layered defaults.
//!
//! Options arrive in layers: the built-in defaults, the session defaults from
//! the config file, then whatever the magic line or CLI supplied. Each layer
//! is a [`PartialRunOptions`]; [`RunOptions::overlay`] applies one layer with
//! a fixed rule per field:
//!
//! | field | rule |
//! |---|---|
//! | scalars, `js_src` | replace when set |
//! | `add_src`, `add_css` | append |
//! | `values` | merge by key, later layer wins |

mod dimension;
mod py_type;

pub use dimension::{DEFAULT_FRAME_SIZE, DimensionInput};
pub use py_type::PyType;

use crate::error::RenderError;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub const DEFAULT_BACKGROUND: &str = "white";
pub const DEFAULT_PY_TYPE: &str = "mpy";
pub const DEFAULT_PY_VERSION: &str = "none";
pub const DEFAULT_VIEWPORT: &str = "width=device-width, initial-scale=1.0";
pub const DEFAULT_LINGER_SECS: u64 = 5;

const LIST_FIELDS: [&str; 2] = ["add_src", "add_css"];

/// Fully resolved parameters for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOptions {
    pub width: u32,
    pub height: u32,
    pub background: String,
    pub py_type: String,
    pub py_val: Option<String>,
    pub py_conf: Option<String>,
    pub js_src: Option<String>,
    pub py_ver: String,
    pub viewport: String,
    pub py_script: String,
    pub htmlmode: bool,
    pub py_file: Option<PathBuf>,
    /// How long the server keeps running after the document was fetched.
    pub linger: Duration,
    pub add_src: Vec<String>,
    pub add_script: Option<String>,
    pub add_css: Vec<String>,
    pub add_style: Option<String>,
    /// Caller-supplied values handed to the script alongside `py_val`.
    pub values: BTreeMap<String, JsonValue>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_FRAME_SIZE,
            height: DEFAULT_FRAME_SIZE,
            background: String::from(DEFAULT_BACKGROUND),
            py_type: String::from(DEFAULT_PY_TYPE),
            py_val: None,
            py_conf: None,
            js_src: None,
            py_ver: String::from(DEFAULT_PY_VERSION),
            viewport: String::from(DEFAULT_VIEWPORT),
            py_script: String::new(),
            htmlmode: false,
            py_file: None,
            linger: Duration::from_secs(DEFAULT_LINGER_SECS),
            add_src: Vec::new(),
            add_script: None,
            add_css: Vec::new(),
            add_style: None,
            values: BTreeMap::new(),
        }
    }
}

/// One layer of options. Unset fields leave the layer below untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialRunOptions {
    pub width: Option<DimensionInput>,
    pub height: Option<DimensionInput>,
    pub background: Option<String>,
    pub py_type: Option<String>,
    pub py_val: Option<String>,
    pub py_conf: Option<String>,
    pub js_src: Option<String>,
    pub py_ver: Option<String>,
    pub viewport: Option<String>,
    pub py_script: Option<String>,
    pub htmlmode: Option<bool>,
    pub py_file: Option<PathBuf>,
    #[serde(rename = "duration")]
    pub linger_secs: Option<u64>,
    pub add_src: Option<Vec<String>>,
    pub add_script: Option<String>,
    pub add_css: Option<Vec<String>>,
    pub add_style: Option<String>,
    pub values: Option<BTreeMap<String, JsonValue>>,
}

impl PartialRunOptions {
    /// Build a layer from a dynamically typed mapping (e.g. handed over by a notebook host).
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidArgumentType`] if `value` is not an object, if a list
    /// field (`add_src`, `add_css`) is not an array, or if a field has the wrong type.
    #[track_caller]
    pub fn from_json(value: JsonValue) -> Result<Self, RenderError> {
        let Some(map) = value.as_object() else {
            return Err(RenderError::invalid_argument_type(format!(
                "options must be a mapping, got {}",
                json_type_name(&value)
            )));
        };

        for field in LIST_FIELDS {
            if let Some(entry) = map.get(field)
                && !entry.is_array()
                && !entry.is_null()
            {
                return Err(RenderError::invalid_argument_type(format!(
                    "{field} must be a list, got {}",
                    json_type_name(entry)
                )));
            }
        }

        serde_json::from_value(value)
            .map_err(|e| RenderError::invalid_argument_type(format!("options: {e}")))
    }

    /// Stack `other` on top of this layer, producing a single layer.
    pub fn then(mut self, other: PartialRunOptions) -> Self {
        replace(&mut self.width, other.width);
        replace(&mut self.height, other.height);
        replace(&mut self.background, other.background);
        replace(&mut self.py_type, other.py_type);
        replace(&mut self.py_val, other.py_val);
        replace(&mut self.py_conf, other.py_conf);
        replace(&mut self.js_src, other.js_src);
        replace(&mut self.py_ver, other.py_ver);
        replace(&mut self.viewport, other.viewport);
        replace(&mut self.py_script, other.py_script);
        replace(&mut self.htmlmode, other.htmlmode);
        replace(&mut self.py_file, other.py_file);
        replace(&mut self.linger_secs, other.linger_secs);
        replace(&mut self.add_script, other.add_script);
        replace(&mut self.add_style, other.add_style);

        self.add_src = append_lists(self.add_src, other.add_src);
        self.add_css = append_lists(self.add_css, other.add_css);
        self.values = match (self.values, other.values) {
            (Some(mut base), Some(top)) => {
                base.extend(top);
                Some(base)
            }
            (base, top) => top.or(base),
        };
        self
    }
}

impl RunOptions {
    /// Apply one layer on top of these options.
    pub fn overlay(mut self, layer: PartialRunOptions) -> Self {
        if let Some(width) = layer.width {
            self.width = width.resolve("width");
        }
        if let Some(height) = layer.height {
            self.height = height.resolve("height");
        }
        if let Some(background) = layer.background {
            self.background = background;
        }
        if let Some(py_type) = layer.py_type {
            self.py_type = py_type;
        }
        if layer.py_val.is_some() {
            self.py_val = layer.py_val;
        }
        if layer.py_conf.is_some() {
            self.py_conf = layer.py_conf;
        }
        if layer.js_src.is_some() {
            self.js_src = layer.js_src;
        }
        if let Some(py_ver) = layer.py_ver {
            self.py_ver = py_ver;
        }
        if let Some(viewport) = layer.viewport {
            self.viewport = viewport;
        }
        if let Some(py_script) = layer.py_script {
            self.py_script = py_script;
        }
        if let Some(htmlmode) = layer.htmlmode {
            self.htmlmode = htmlmode;
        }
        if layer.py_file.is_some() {
            self.py_file = layer.py_file;
        }
        if let Some(secs) = layer.linger_secs {
            self.linger = Duration::from_secs(secs);
        }
        if let Some(add_src) = layer.add_src {
            self.add_src.extend(add_src);
        }
        if layer.add_script.is_some() {
            self.add_script = layer.add_script;
        }
        if let Some(add_css) = layer.add_css {
            self.add_css.extend(add_css);
        }
        if layer.add_style.is_some() {
            self.add_style = layer.add_style;
        }
        if let Some(values) = layer.values {
            self.values.extend(values);
        }
        self
    }

    /// Defaults with every layer applied in order.
    pub fn layered(layers: impl IntoIterator<Item = PartialRunOptions>) -> Self {
        let combined = layers
            .into_iter()
            .fold(PartialRunOptions::default(), PartialRunOptions::then);
        RunOptions::default().overlay(combined)
    }
}

fn replace<T>(base: &mut Option<T>, top: Option<T>) {
    if top.is_some() {
        *base = top;
    }
}

fn append_lists(base: Option<Vec<String>>, top: Option<Vec<String>>) -> Option<Vec<String>> {
    match (base, top) {
        (Some(mut base), Some(top)) => {
            base.extend(top);
            Some(base)
        }
        (base, top) => top.or(base),
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "list",
        JsonValue::Object(_) => "mapping",
    }
}
