use std::{
    net::{TcpListener, TcpStream},
    sync::Arc,
};

use log::{debug, info, warn};

use crate::config::ServerConfig;
use crate::storage::Store;

use super::{
    ClientHandler, Reply, ThreadPool, response::ServerErrorMessage,
    transport::{MessageTransport, TransportError},
};

/// Accepts store clients and serves each connection on a worker thread.
pub struct StoreServer {
    config: ServerConfig,
    store: Arc<Store>,
    pool: ThreadPool,
}

impl StoreServer {
    pub fn new(config: ServerConfig, store: Arc<Store>) -> Self {
        let pool = ThreadPool::new(config.workers);
        Self {
            config,
            store,
            pool,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds the configured address and serves until the listener fails.
    pub fn listen(self) -> Result<(), TransportError> {
        let listener = TcpListener::bind(&self.config.address)?;
        self.serve(listener)
    }

    pub fn serve(self, listener: TcpListener) -> Result<(), TransportError> {
        info!(
            "listening at {} with {} workers",
            listener.local_addr()?,
            self.pool.len()
        );

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let store = Arc::clone(&self.store);
                    let max_payload_size = self.config.max_payload_size;
                    self.pool.execute(move || {
                        if let Err(e) = handle_connection(stream, store, max_payload_size) {
                            warn!("connection ended with error: {e}");
                        }
                    });
                }
                Err(e) => warn!("broken connection: {e:?}"),
            }
        }
        Ok(())
    }
}

fn handle_connection(
    stream: TcpStream,
    store: Arc<Store>,
    max_payload_size: usize,
) -> Result<(), TransportError> {
    let peer = stream.peer_addr()?.to_string();
    info!("{peer} connected");

    let mut transport = MessageTransport::new(stream).with_max_payload_size(max_payload_size);
    let mut handler = ClientHandler::new(store, peer.clone());

    loop {
        let message = match transport.read_message() {
            Ok(Some(message)) => message,
            Ok(None) => break,
            // The whole frame was consumed, so the stream is still in sync.
            Err(TransportError::Deserialize(e)) if !e.is_framing() => {
                warn!("{peer} sent an undecodable message: {e}");
                transport.write_shape(&ServerErrorMessage::new(e.to_string()))?;
                continue;
            }
            Err(e) => return Err(e),
        };

        match handler.handle(message) {
            Reply::Respond(response) => {
                debug!("answering {peer} with {}", response.message_type());
                transport.write_message(&response)?;
            }
            Reply::Silent => {}
            Reply::Close => break,
        }
    }

    info!("{peer} disconnected");
    Ok(())
}
