//! Shared building blocks for the pysrun workspace.
//!
//! ## Architecture
//!
//! - **common** (this crate): types every other crate depends on
//! - **runner-core**: rendering, port scanning and the ephemeral document server
//! - **pysrun**: the command-line front end wiring everything together

pub mod error;

pub use error::error_location::ErrorLocation;
