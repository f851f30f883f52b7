use log::{debug, warn};
use rand::Rng;
use rusqlite::ToSql;

use crate::config::DatabaseConfig;

use super::error::StorageError;
use super::{Row, Session};

/// Fixed set of lazily connected sessions.
///
/// Acquisition never blocks: the first session not marked busy wins, and when
/// every session is busy a random one is handed out anyway. The caller then
/// waits on that session's lock inside [`Session::execute`].
pub struct ConnectionPool {
    config: DatabaseConfig,
    sessions: Vec<Session>,
}

impl ConnectionPool {
    /// Builds the pool without touching the database.
    pub fn new(config: DatabaseConfig) -> Self {
        let sessions = (0..config.connections.max(1))
            .map(|id| Session::new(id, &config))
            .collect();
        ConnectionPool { config, sessions }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Tries to open every session. Sessions that fail stay disconnected and
    /// are retried on their next acquisition.
    pub fn connect(&self) {
        for session in &self.sessions {
            if let Err(e) = session.connect() {
                warn!("session {} could not connect yet: {e}", session.id());
            }
        }
    }

    pub fn acquire(&self) -> Result<&Session, StorageError> {
        if let Some(session) = self.sessions.iter().find(|s| !s.is_busy()) {
            session.check_connection()?;
            return Ok(session);
        }

        let index = rand::thread_rng().gen_range(0..self.sessions.len());
        debug!("all sessions busy, falling back to session {index}");
        let session = &self.sessions[index];
        session.check_connection()?;
        Ok(session)
    }

    pub fn execute(
        &self,
        query: &str,
        params: &[(&str, &dyn ToSql)],
    ) -> Result<Vec<Row>, StorageError> {
        self.acquire()?.execute(query, params)
    }

    pub fn close(&self) {
        for session in &self.sessions {
            session.close();
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        self.close();
    }
}
