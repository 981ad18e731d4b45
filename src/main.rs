use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::sync::Notify;

mod config;
mod handler;
mod http;
mod logger;
mod server;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::Config::load()?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let reuse_address = cfg.listener.reuse_address;
    let backlog = cfg.listener.backlog;

    // Port already taken is fatal: report and exit, never retry or rebind
    let listener = match server::create_reusable_listener(addr, reuse_address, backlog) {
        Ok(l) => l,
        Err(e) => {
            let diagnostic = server::bind_diagnostic(&addr, &e);
            logger::log_error(&diagnostic);
            return Err(diagnostic.into());
        }
    };

    let state = Arc::new(config::AppState::new(cfg)?);
    let active_connections = Arc::new(AtomicUsize::new(0));

    logger::log_server_start(&addr, &state.config, &state.document_root);

    let shutdown = Arc::new(Notify::new());
    server::start_signal_handler(Arc::clone(&shutdown));

    run_accept_loop(listener, state, active_connections, shutdown).await;

    logger::log_shutdown();
    Ok(())
}

/// Dispatcher loop: accept connections until a shutdown signal arrives.
///
/// Workers are detached; shutdown does not wait for in-flight connections.
async fn run_accept_loop(
    listener: tokio::net::TcpListener,
    state: Arc<config::AppState>,
    active_connections: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        server::accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                        );
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = shutdown.notified() => {
                break;
            }
        }
    }
}
