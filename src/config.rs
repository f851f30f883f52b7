use std::path::PathBuf;

pub const DEFAULT_DATABASE_PATH: &str = "depot.db";
pub const DEFAULT_CONNECTIONS: usize = 4;
pub const DEFAULT_STATEMENT_CACHE_CAPACITY: usize = 64;

pub const DEFAULT_LISTEN_ADDRESS: &str = "127.0.0.1:15151";
pub const DEFAULT_WORKERS: usize = 4;
/// Upper bound for the payload a peer may announce in a frame header.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    /// Number of pooled sessions.
    pub connections: usize,
    /// Prepared statements kept per session.
    pub statement_cache_capacity: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: PathBuf::from(DEFAULT_DATABASE_PATH),
            connections: DEFAULT_CONNECTIONS,
            statement_cache_capacity: DEFAULT_STATEMENT_CACHE_CAPACITY,
        }
    }
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DatabaseConfig {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_connections(mut self, connections: usize) -> Self {
        self.connections = connections.max(1);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub workers: usize,
    pub max_payload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            address: DEFAULT_LISTEN_ADDRESS.to_string(),
            workers: DEFAULT_WORKERS,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}
