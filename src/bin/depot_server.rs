use std::{error::Error, path::PathBuf, process, sync::Arc};

use clap::Parser;
use depot::{
    DatabaseConfig, ServerConfig, Store, StoreServer,
    config::{DEFAULT_CONNECTIONS, DEFAULT_LISTEN_ADDRESS, DEFAULT_WORKERS},
};
use log::info;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the store database
    database: PathBuf,
    /// Listen for new connections at address
    #[arg(default_value = DEFAULT_LISTEN_ADDRESS)]
    address: String,
    /// Number of pooled database sessions
    #[arg(long, default_value_t = DEFAULT_CONNECTIONS)]
    connections: usize,
    /// Number of connection worker threads
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let config = DatabaseConfig::new(cli.database).with_connections(cli.connections);
    let store = Arc::new(Store::open(config)?);

    let handle = Arc::clone(&store);
    ctrlc::set_handler(move || {
        info!("shutting down");
        handle.close();
        process::exit(0);
    })?;

    let server = StoreServer::new(
        ServerConfig {
            address: cli.address,
            workers: cli.workers,
            ..Default::default()
        },
        store,
    );
    server.listen()?;
    Ok(())
}
