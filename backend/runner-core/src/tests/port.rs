// Unit tests for the free-port scanner

use crate::error::port::PortError;
use crate::port::{default_port_range, find_free_port};

use std::net::TcpListener;

/// Bind an OS-assigned loopback port and return it with its listener.
fn occupied_port() -> (u16, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    (port, listener)
}

/// **VALUE**: Verifies an inverted or empty range is rejected up front.
///
/// **BUG THIS CATCHES**: Would catch the scanner looping zero times and then
/// reporting "no free port", which hides a configuration mistake.
#[test]
fn given_empty_range_when_find_free_port_then_returns_invalid_range() {
    for (start, end) in [(18010, 18000), (18000, 18000)] {
        match find_free_port(start..end) {
            Err(PortError::InvalidRange { start: s, end: e, .. }) => {
                assert_eq!((s, e), (start, end));
            }
            other => panic!("Expected InvalidRange for {start}..{end}, got {other:?}"),
        }
    }
}

/// **VALUE**: Verifies a port someone is listening on is never handed out.
///
/// **WHY THIS MATTERS**: Serving on an occupied port would either fail to start
/// or, worse, point the frame at someone else's server.
#[test]
fn given_only_port_in_range_is_occupied_when_find_free_port_then_returns_no_free_port() {
    // GIVEN: A one-port range that is already taken
    let (port, _listener) = occupied_port();

    // WHEN: Scanning just that port
    let result = find_free_port(port..port + 1);

    // THEN: NoFreePort naming the range
    match result {
        Err(PortError::NoFreePort { start, end, .. }) => {
            assert_eq!(start, port);
            assert_eq!(end, port + 1);
        }
        other => panic!("Expected NoFreePort, got {other:?}"),
    }
}

/// **VALUE**: Verifies the returned port stays reserved while the caller holds it.
///
/// **WHY THIS MATTERS**: Between the scan and the server start another process
/// could grab the port. Holding the bound socket closes that window.
///
/// **BUG THIS CATCHES**: Would catch a scanner that binds, drops and returns only
/// the number.
#[test]
fn given_reserved_port_when_scanning_again_then_reserved_port_is_skipped() {
    // GIVEN: A free port found in a small window above an ephemeral port
    let (base, listener) = occupied_port();
    drop(listener);
    let range = base..base.saturating_add(5);
    let reserved = find_free_port(range.clone()).expect("a port should be free");

    // WHEN: Scanning the same range while holding the reservation
    let second = find_free_port(range).expect("another port should be free");

    // THEN: The second scan does not return the held port
    assert_ne!(reserved.port(), second.port());
    assert!(reserved.port() >= base);
}

/// **VALUE**: Verifies releasing a reservation makes the port bindable again.
#[test]
fn given_reserved_port_when_released_then_port_can_be_bound() {
    let (base, listener) = occupied_port();
    drop(listener);
    let reserved = find_free_port(base..base.saturating_add(5)).expect("free port");

    let port = reserved.release();

    TcpListener::bind(("127.0.0.1", port)).expect("released port should be bindable");
}

/// **VALUE**: Verifies the documented default range.
#[test]
fn given_nothing_when_default_port_range_then_is_18000_to_18099() {
    assert_eq!(default_port_range(), 18000..18099);
}
