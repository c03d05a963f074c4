use crate::error::RenderError;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::str::FromStr;

/// Which PyScript interpreter runs the cell.
///
/// `py` and `py-game` run on Pyodide (CPython compatible), `mpy` on MicroPython.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyType {
    Py,
    Mpy,
    PyGame,
}

impl PyType {
    pub const ALLOWED: [&'static str; 3] = ["py", "mpy", "py-game"];

    /// Value of the `type` attribute on the script element.
    pub fn script_type(&self) -> &'static str {
        match self {
            PyType::Py => "py",
            PyType::Mpy => "mpy",
            PyType::PyGame => "py-game",
        }
    }

    /// Element name carrying the interpreter configuration.
    pub fn config_element(&self) -> &'static str {
        match self {
            PyType::Py | PyType::PyGame => "py-config",
            PyType::Mpy => "mpy-config",
        }
    }

    /// DOM event fired once the interpreter is up.
    pub fn ready_event(&self) -> &'static str {
        match self {
            PyType::Py | PyType::PyGame => "py:ready",
            PyType::Mpy => "mpy:ready",
        }
    }
}

impl FromStr for PyType {
    type Err = RenderError;

    #[track_caller]
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "py" => Ok(PyType::Py),
            "mpy" => Ok(PyType::Mpy),
            "py-game" => Ok(PyType::PyGame),
            _ => Err(RenderError::invalid_mode(value)),
        }
    }
}

impl Display for PyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.write_str(self.script_type())
    }
}
