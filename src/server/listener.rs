// Listener module
// Creates the TCP listener with address reuse and a bounded accept backlog

use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Create a `TcpListener` with optional `SO_REUSEADDR` and a bounded backlog.
///
/// Address reuse lets the server rebind immediately after a restart while the
/// old socket is still in TIME_WAIT. The backlog bounds the queue of accepted
/// but not yet handled connections under bursts.
///
/// # Arguments
///
/// * `addr` - The socket address to bind to
/// * `reuse_address` - Whether to set `SO_REUSEADDR` before binding
/// * `backlog` - Accept queue depth
pub fn create_reusable_listener(
    addr: SocketAddr,
    reuse_address: bool,
    backlog: i32,
) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    if reuse_address {
        socket.set_reuse_address(true)?;
    }

    // Non-blocking mode for async compatibility
    socket.set_nonblocking(true)?;

    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

/// Render a fatal bind failure as a user-facing diagnostic.
///
/// A port already bound by another process is the one startup condition
/// treated as fatal, so it gets a message that says what to do about it.
pub fn bind_diagnostic(addr: &SocketAddr, err: &std::io::Error) -> String {
    if err.kind() == std::io::ErrorKind::AddrInUse {
        format!(
            "Port {} is already in use. Stop the other process or change server.port.",
            addr.port()
        )
    } else {
        format!("Failed to bind {addr}: {err}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_and_reuse() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let listener = create_reusable_listener(addr, true, 16).expect("bind ephemeral port");
        assert!(listener.local_addr().unwrap().port() > 0);
    }

    #[tokio::test]
    async fn test_port_in_use_diagnostic() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let first = create_reusable_listener(addr, false, 16).expect("bind");
        let bound = first.local_addr().unwrap();

        // SO_REUSEADDR off on both sides, so the second bind must fail
        let err = create_reusable_listener(bound, false, 16).expect_err("port is taken");
        let message = bind_diagnostic(&bound, &err);
        assert!(message.contains(&bound.port().to_string()));
    }
}
