use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum PortError {
    #[error("No Free Port Error: every port in {start}..{end} is in use {location}")]
    NoFreePort {
        start: u16,
        end: u16,
        location: ErrorLocation,
    },

    #[error("Invalid Port Range Error: start {start} must be below end {end} {location}")]
    InvalidRange {
        start: u16,
        end: u16,
        location: ErrorLocation,
    },
}
