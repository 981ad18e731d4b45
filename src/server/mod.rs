// Server module entry point
// Listener construction, per-connection workers, and shutdown signals

pub mod connection;
pub mod listener;
pub mod signal;

// Re-export commonly used items
pub use connection::accept_connection;
pub use listener::{bind_diagnostic, create_reusable_listener};
pub use signal::start_signal_handler;
