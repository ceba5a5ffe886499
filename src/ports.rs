//! Host port allocation for publishing container serving ports.

use std::io;
use std::net::TcpListener;

/// Find a TCP port that is currently unused on the loopback interface.
///
/// Binds port 0 to let the OS pick a free port, reads the assignment, and
/// releases the listener. The port is free at probe time only: another
/// process may grab it between the probe and the container publishing it.
/// That check-then-use race is an accepted limitation of local port
/// publishing, not something this function can close.
pub fn find_available_port() -> io::Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    let port = listener.local_addr()?.port();
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returns_nonzero_port() {
        let port = find_available_port().expect("Failed to allocate port");
        assert_ne!(port, 0);
    }

    #[test]
    fn test_port_is_bindable_after_probe() {
        let port = find_available_port().expect("Failed to allocate port");
        // The probe must not keep the port bound.
        TcpListener::bind(("127.0.0.1", port)).expect("Probed port still bound");
    }
}
