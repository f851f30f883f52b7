pub mod config;
pub mod model;
pub mod protocol;
pub mod storage;

pub use config::{DatabaseConfig, ServerConfig};
pub use protocol::{Message, MessageTransport, MessageType, StoreServer};
pub use storage::Store;
