//! Magic-line parsing.
//!
//! The host passes the text after the magic name, e.g.
//! `%%runpys 640 480 black py '{}' '{"packages":["numpy"]}'`, and the cell body.
//! This module turns that into an options layer.

mod tokenize;

pub use tokenize::tokenize;

use crate::error::command::CommandError;
use crate::options::{DimensionInput, PartialRunOptions};

use common::ErrorLocation;

use std::panic::Location;

use log::trace;

/// Positional parameters of the magic line, in order.
pub const POSITIONAL_FIELDS: [&str; 9] = [
    "width",
    "height",
    "background",
    "py_type",
    "py_val",
    "py_conf",
    "js_src",
    "py_ver",
    "viewport",
];

const EMPTY_OBJECT: &str = "{}";
const EMPTY_LIST: &str = "[]";

/// The two cell magics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellMagic {
    /// Serve the page and show it in a frame.
    RunPys,
    /// Only show the generated HTML.
    GenPys,
}

impl CellMagic {
    pub fn name(&self) -> &'static str {
        match self {
            CellMagic::RunPys => "runpys",
            CellMagic::GenPys => "genpys",
        }
    }

    /// Options layer for one magic invocation.
    ///
    /// An empty line yields only the cell body and the mode, so session defaults
    /// from lower layers stay in effect.
    pub fn invoke(&self, line: &str, cell: &str) -> Result<PartialRunOptions, CommandError> {
        self.invoke_tokens(tokenize(line)?, cell)
    }

    /// Like [`invoke`](Self::invoke) for a line that was already split, e.g. by a shell.
    pub fn invoke_tokens(
        &self,
        tokens: Vec<String>,
        cell: &str,
    ) -> Result<PartialRunOptions, CommandError> {
        let mut layer = parse_tokens(tokens)?;
        layer.py_script = Some(cell.to_string());
        layer.htmlmode = Some(matches!(self, CellMagic::GenPys));
        Ok(layer)
    }
}

/// Parse a magic line into an options layer.
///
/// # Errors
///
/// - [`CommandError::UnterminatedQuote`] - a quoted token is never closed
/// - [`CommandError::TooManyArguments`] - more than nine positional tokens
#[track_caller]
pub fn parse_line(line: &str) -> Result<PartialRunOptions, CommandError> {
    let tokens = tokenize(line)?;
    parse_tokens(tokens)
}

/// Build an options layer from already-split positional tokens.
#[track_caller]
pub fn parse_tokens(tokens: Vec<String>) -> Result<PartialRunOptions, CommandError> {
    if tokens.len() > POSITIONAL_FIELDS.len() {
        return Err(CommandError::TooManyArguments {
            max: POSITIONAL_FIELDS.len(),
            actual: tokens.len(),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    trace!("Magic line tokens: {tokens:?}");

    let mut layer = PartialRunOptions::default();
    for (field, token) in POSITIONAL_FIELDS.iter().zip(tokens) {
        match *field {
            "width" => layer.width = Some(DimensionInput::Text(token)),
            "height" => layer.height = Some(DimensionInput::Text(token)),
            "background" => layer.background = Some(token),
            "py_type" => layer.py_type = Some(token),
            "py_val" => layer.py_val = unless_sentinel(token, EMPTY_OBJECT),
            "py_conf" => layer.py_conf = unless_sentinel(token, EMPTY_OBJECT),
            "js_src" => layer.js_src = unless_sentinel(token, EMPTY_LIST),
            "py_ver" => layer.py_ver = Some(token),
            "viewport" => layer.viewport = Some(token),
            _ => {}
        }
    }

    Ok(layer)
}

fn unless_sentinel(token: String, sentinel: &str) -> Option<String> {
    (token != sentinel).then_some(token)
}
