// Configuration module
// Layered loading: config.toml (optional) -> SERVER_* env vars -> defaults

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub listener: ListenerConfig,
    pub files: FilesConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
}

/// Server binding configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// TCP listener tuning
#[derive(Debug, Deserialize, Clone)]
pub struct ListenerConfig {
    /// Enable SO_REUSEADDR so a quick restart does not hit TIME_WAIT
    pub reuse_address: bool,
    /// Accept queue depth
    pub backlog: i32,
}

/// Static file serving configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FilesConfig {
    /// Document root; all request paths resolve under this directory
    pub root: String,
    /// Files probed when a request resolves to a directory
    pub index_files: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    pub show_headers: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    /// Keep-alive is enabled while this is non-zero
    pub keep_alive_timeout: u64,
    /// Deadline for reading request headers, seconds; 0 disables it.
    /// Transfers in progress are never subject to a deadline.
    pub read_timeout: u64,
    pub max_connections: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("SERVER"))
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8082)?
            .set_default("listener.reuse_address", true)?
            .set_default("listener.backlog", 128)?
            .set_default("files.root", ".")?
            .set_default("files.index_files", vec!["index.html", "index.htm"])?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.show_headers", false)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

/// Shared, read-only application state
///
/// One instance per process; workers only ever read from it.
pub struct AppState {
    pub config: Config,
    /// Canonicalized document root; the traversal guard compares against this
    pub document_root: PathBuf,
}

impl AppState {
    pub fn new(config: Config) -> std::io::Result<Self> {
        let document_root = PathBuf::from(&config.files.root).canonicalize()?;
        Ok(Self {
            config,
            document_root,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_all_sections() {
        let cfg = Config::load().expect("defaults should deserialize");
        assert_eq!(cfg.server.port, 8082);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert!(cfg.listener.reuse_address);
        assert_eq!(cfg.listener.backlog, 128);
        assert_eq!(cfg.files.root, ".");
        assert!(cfg.files.index_files.contains(&"index.html".to_string()));
    }

    #[test]
    fn state_canonicalizes_root() {
        let mut cfg = Config::load().expect("defaults should deserialize");
        cfg.files.root = ".".to_string();
        let state = AppState::new(cfg).expect("cwd should canonicalize");
        assert!(state.document_root.is_absolute());
    }
}
