use crate::error::command::CommandError;

use common::ErrorLocation;

use std::panic::Location;

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Between,
    Bare,
    Single,
    Double,
}

/// Split a line into words the way a POSIX shell would.
///
/// Whitespace separates words; `'...'` keeps everything literally, `"..."`
/// honours `\"` and `\\`; outside quotes a backslash escapes the next char.
/// Adjacent quoted and bare segments join into one word (`a'b c'` is `ab c`).
#[track_caller]
pub fn tokenize(line: &str) -> Result<Vec<String>, CommandError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut state = State::Between;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Between | State::Bare => match c {
                c if c.is_whitespace() => {
                    if state == State::Bare {
                        words.push(std::mem::take(&mut current));
                        state = State::Between;
                    }
                }
                '\'' => state = State::Single,
                '"' => state = State::Double,
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                    state = State::Bare;
                }
                _ => {
                    current.push(c);
                    state = State::Bare;
                }
            },
            State::Single => match c {
                '\'' => state = State::Bare,
                _ => current.push(c),
            },
            State::Double => match c {
                '"' => state = State::Bare,
                '\\' if matches!(chars.peek(), Some('"') | Some('\\')) => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                _ => current.push(c),
            },
        }
    }

    match state {
        State::Single | State::Double => Err(CommandError::UnterminatedQuote {
            quote: if state == State::Single { '\'' } else { '"' },
            line: line.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }),
        State::Bare => {
            words.push(current);
            Ok(words)
        }
        State::Between => Ok(words),
    }
}
