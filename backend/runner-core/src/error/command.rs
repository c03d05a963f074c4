use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum CommandError {
    #[error("Unterminated Quote Error: missing closing {quote} in '{line}' {location}")]
    UnterminatedQuote {
        quote: char,
        line: String,
        location: ErrorLocation,
    },

    #[error("Too Many Arguments Error: expected at most {max}, got {actual} {location}")]
    TooManyArguments {
        max: usize,
        actual: usize,
        location: ErrorLocation,
    },
}
