// Signal handling module
//
// SIGINT (Ctrl+C) and SIGTERM trigger shutdown: the accept loop stops and the
// process exits. In-flight connection workers are detached and torn down with
// the process.

use std::sync::Arc;
use tokio::sync::Notify;

/// Start the shutdown signal listener (Unix)
#[cfg(unix)]
pub fn start_signal_handler(shutdown: Arc<Notify>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
        let mut sigint =
            signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                println!("\n[Signal] SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                println!("\n[Signal] SIGINT received, shutting down...");
            }
        }
        shutdown.notify_waiters();
    });
}

/// Windows fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub fn start_signal_handler(shutdown: Arc<Notify>) {
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            println!("\n[Signal] Ctrl+C received, shutting down...");
            shutdown.notify_waiters();
        }
    });
}
