use log::warn;
use serde::{Deserialize, Serialize};

/// Frame width/height used when none (or an unusable one) is given.
pub const DEFAULT_FRAME_SIZE: u32 = 500;

/// A frame dimension as supplied by the caller: a number or decimal text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DimensionInput {
    Pixels(u32),
    Text(String),
}

impl DimensionInput {
    /// Pixel value, or [`DEFAULT_FRAME_SIZE`] when the text is not a plain decimal number.
    pub fn resolve(&self, field: &str) -> u32 {
        match self {
            DimensionInput::Pixels(pixels) => *pixels,
            DimensionInput::Text(text) => {
                let is_decimal = !text.is_empty() && text.chars().all(|c| c.is_ascii_digit());
                match text.parse::<u32>() {
                    Ok(pixels) if is_decimal => pixels,
                    _ => {
                        warn!("Ignoring {field} '{text}', using {DEFAULT_FRAME_SIZE}");
                        DEFAULT_FRAME_SIZE
                    }
                }
            }
        }
    }
}

impl From<u32> for DimensionInput {
    fn from(pixels: u32) -> Self {
        DimensionInput::Pixels(pixels)
    }
}

impl From<&str> for DimensionInput {
    fn from(text: &str) -> Self {
        DimensionInput::Text(text.to_string())
    }
}
