//! Free-port scanning over a fixed range.
//!
//! A port counts as free when nothing accepts a loopback connection on it and
//! we can bind it ourselves. The bound listener is handed back and held until
//! the server takes it over, so no other process can grab the port in between.

use crate::error::port::PortError;
use crate::{DEFAULT_PORT_RANGE_END, DEFAULT_PORT_RANGE_START, LOOPBACK_HOSTNAME};

use common::ErrorLocation;

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::ops::Range;
use std::panic::Location;
use std::time::Duration;

use log::{debug, trace};

const CONNECT_PROBE_TIMEOUT: Duration = Duration::from_millis(200);

/// Half-open range of ports to scan.
pub fn default_port_range() -> Range<u16> {
    DEFAULT_PORT_RANGE_START..DEFAULT_PORT_RANGE_END
}

/// A loopback port we already hold a listening socket for.
#[derive(Debug)]
pub struct ReservedPort {
    port: u16,
    listener: TcpListener,
}

impl ReservedPort {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Give up the socket, e.g. to pass it to the serving unit.
    pub fn into_listener(self) -> TcpListener {
        self.listener
    }

    /// Close the socket so another process (a child server) can bind the port.
    pub fn release(self) -> u16 {
        let port = self.port;
        drop(self.listener);
        port
    }
}

/// Find the lowest free port in `range` and keep it bound.
///
/// # Errors
///
/// - [`PortError::InvalidRange`] - `range.start >= range.end`
/// - [`PortError::NoFreePort`] - every port in the range is taken
#[track_caller]
pub fn find_free_port(range: Range<u16>) -> Result<ReservedPort, PortError> {
    if range.start >= range.end {
        return Err(PortError::InvalidRange {
            start: range.start,
            end: range.end,
            location: ErrorLocation::from(Location::caller()),
        });
    }

    debug!("Scanning ports {}..{}", range.start, range.end);

    for port in range.clone() {
        if is_accepting(port) {
            trace!("Port {port} accepts connections, skipping");
            continue;
        }

        match TcpListener::bind((LOOPBACK_HOSTNAME, port)) {
            Ok(listener) => {
                debug!("Reserved free port {port}");
                return Ok(ReservedPort { port, listener });
            }
            Err(e) => {
                trace!("Port {port} could not be bound: {e}");
            }
        }
    }

    Err(PortError::NoFreePort {
        start: range.start,
        end: range.end,
        location: ErrorLocation::from(Location::caller()),
    })
}

fn is_accepting(port: u16) -> bool {
    let address = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    match TcpStream::connect_timeout(&address, CONNECT_PROBE_TIMEOUT) {
        Ok(_) => true,
        Err(e) if e.kind() == ErrorKind::ConnectionRefused => false,
        Err(e) => {
            trace!("Probe of port {port} failed: {e}");
            false
        }
    }
}
