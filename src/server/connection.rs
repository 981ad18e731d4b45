// Connection handling module
// Accepts a single TCP connection and serves it on a detached worker task

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Accept and process a connection, checking limits and logging.
///
/// Each connection runs on its own detached task; nothing here blocks the
/// accept loop, and nothing from one connection can reach another.
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            // Exceeded limit: rollback counter and reject
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    if state.config.logging.access_log {
        logger::log_connection_accepted(&peer_addr);
    }

    handle_connection(stream, Arc::clone(state), Arc::clone(conn_counter));
}

/// Serve a single connection in a detached task.
///
/// The task owns the stream for its whole lifetime; the counter is
/// decremented on every exit path. The only deadline is on reading request
/// headers - a transfer in progress is never cut off, however long it runs.
fn handle_connection(
    stream: tokio::net::TcpStream,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let mut builder = http1::Builder::new();
        builder.keep_alive(state.config.performance.keep_alive_timeout > 0);

        let read_timeout = state.config.performance.read_timeout;
        if read_timeout > 0 {
            builder.timer(TokioTimer::new());
            builder.header_read_timeout(std::time::Duration::from_secs(read_timeout));
        }

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&service_state);
                async move { handler::handle_request(req, state).await }
            }),
        );

        if let Err(err) = conn.await {
            // Clients abort mid-stream all the time when seeking; only
            // real protocol or I/O faults are worth a log line
            if !is_peer_disconnect(&err) {
                logger::log_connection_error(&err);
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Whether a connection error just means the peer went away.
fn is_peer_disconnect(err: &hyper::Error) -> bool {
    if err.is_incomplete_message() || err.is_canceled() {
        return true;
    }
    source_chain_has_disconnect(err)
}

/// Walk an error's source chain looking for the benign disconnect kinds
/// (reset, aborted, broken pipe).
fn source_chain_has_disconnect(err: &(dyn Error + 'static)) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<std::io::Error>() {
            return matches!(
                io_err.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            );
        }
        source = cause.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::net::SocketAddr;
    use std::path::{Path, PathBuf};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn temp_root(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mediaserve-conn-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn test_state(root: &Path) -> Arc<AppState> {
        let mut cfg = Config::load().expect("default config");
        cfg.files.root = root.to_string_lossy().into_owned();
        cfg.logging.access_log = false;
        Arc::new(AppState::new(cfg).expect("state"))
    }

    /// Bind an ephemeral port and run a real accept loop over it
    async fn spawn_test_server(state: Arc<AppState>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let counter = Arc::new(AtomicUsize::new(0));
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &counter);
                    }
                    Err(_) => break,
                }
            }
        });
        addr
    }

    async fn fetch(addr: SocketAddr, request: &str) -> Vec<u8> {
        let mut stream = TcpStream::connect(addr).await.expect("connect");
        stream
            .write_all(request.as_bytes())
            .await
            .expect("write request");
        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await.expect("read reply");
        reply
    }

    #[tokio::test]
    async fn test_client_abort_mid_download_is_absorbed() {
        let root = temp_root("abort");
        let data: Vec<u8> = (0..2 * 1024 * 1024).map(|i| (i % 239) as u8).collect();
        std::fs::write(root.join("big.bin"), &data).unwrap();
        let state = test_state(&root);
        let addr = spawn_test_server(state).await;

        // Start a download and drop the socket with most of the body unread
        {
            let mut stream = TcpStream::connect(addr).await.expect("connect");
            stream
                .write_all(b"GET /big.bin HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .await
                .expect("write request");
            let mut chunk = [0u8; 1024];
            let n = stream.read(&mut chunk).await.expect("read first chunk");
            assert!(n > 0, "expected response bytes before aborting");
        }

        // The server must still answer a fresh connection afterwards
        let reply = fetch(
            addr,
            "GET /big.bin HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(
            reply.starts_with(b"HTTP/1.1 200"),
            "follow-up request failed after client abort"
        );
    }

    #[tokio::test]
    async fn test_range_request_over_the_wire() {
        let root = temp_root("wire-range");
        std::fs::write(root.join("a.bin"), b"0123456789abcdefghij").unwrap();
        let state = test_state(&root);
        let addr = spawn_test_server(state).await;

        let reply = fetch(
            addr,
            "GET /a.bin HTTP/1.1\r\nHost: localhost\r\nRange: bytes=5-9\r\nConnection: close\r\n\r\n",
        )
        .await;
        let text = String::from_utf8_lossy(&reply);
        assert!(text.starts_with("HTTP/1.1 206"));
        assert!(text.contains("Content-Range: bytes 5-9/20"));
        assert!(text.ends_with("56789"));
    }

    #[derive(Debug)]
    struct ChainedError(std::io::Error);

    impl std::fmt::Display for ChainedError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "connection error: {}", self.0)
        }
    }

    impl Error for ChainedError {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_disconnect_filter_recognizes_benign_kinds() {
        for kind in [
            std::io::ErrorKind::ConnectionReset,
            std::io::ErrorKind::ConnectionAborted,
            std::io::ErrorKind::BrokenPipe,
        ] {
            let err = ChainedError(std::io::Error::from(kind));
            assert!(
                source_chain_has_disconnect(&err),
                "{kind:?} should be treated as a peer disconnect"
            );
        }
    }

    #[test]
    fn test_disconnect_filter_keeps_real_faults() {
        let err = ChainedError(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(!source_chain_has_disconnect(&err));

        let no_source = std::fmt::Error;
        assert!(!source_chain_has_disconnect(&no_source));
    }
}
