pub mod command;
pub mod config;
pub mod error;
pub mod options;
pub mod port;
pub mod render;
pub mod resolver;
pub mod runner;
pub mod server;

#[cfg(test)]
mod tests;

pub const LOOPBACK_HOSTNAME: &str = "127.0.0.1";
pub const LOCALHOST_NAME: &str = "localhost";
pub const LOCALHOST_BASE_URL: &str = const_format::concatcp!("http://", LOCALHOST_NAME);
pub const LOOPBACK_BASE_URL: &str = const_format::concatcp!("http://", LOOPBACK_HOSTNAME);

/// First port of the default scan range.
pub const DEFAULT_PORT_RANGE_START: u16 = 18000;
/// End (exclusive) of the default scan range.
pub const DEFAULT_PORT_RANGE_END: u16 = 18099;
