use crate::config::Config;
use hyper::{Method, Uri, Version};
use std::net::SocketAddr;

pub fn log_server_start(addr: &SocketAddr, config: &Config, document_root: &std::path::Path) {
    println!("======================================");
    println!("Static media server started");
    println!("Listening on: http://{}", addr);
    println!("Document root: {}", document_root.display());
    println!("Log level: {}", config.logging.level);
    if let Some(workers) = config.server.workers {
        println!("Worker threads: {}", workers);
    }
    println!("Range requests and CORS enabled");
    println!("======================================\n");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    println!("[Connection] Accepted from: {}", peer_addr);
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    eprintln!("[Error] Failed to serve connection: {:?}", err);
}

pub fn log_request(method: &Method, uri: &Uri, version: Version) {
    println!("[Request] {} {} {:?}", method, uri, version);
}

pub fn log_headers_count(count: usize, show: bool) {
    if show {
        println!("[Headers] Count: {}", count);
    }
}

pub fn log_response(status: u16, size: usize) {
    println!("[Response] Sent {} ({} bytes)\n", status, size);
}

pub fn log_warning(message: &str) {
    eprintln!("[WARN] {}", message);
}

pub fn log_error(message: &str) {
    eprintln!("[ERROR] {}", message);
}

pub fn log_shutdown() {
    println!("\nServer stopped.");
}
