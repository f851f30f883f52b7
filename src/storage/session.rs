use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, trace, warn};
use rusqlite::types::Value;
use rusqlite::{Connection, ToSql};

use crate::config::DatabaseConfig;

use super::Row;
use super::error::StorageError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

struct SessionState {
    connection: Option<Connection>,
    /// Query texts currently held in the connection's statement cache.
    statements: HashSet<String>,
}

/// One pooled database connection.
pub struct Session {
    id: usize,
    path: PathBuf,
    cache_capacity: usize,
    state: Mutex<SessionState>,
    busy: AtomicBool,
    prepared: AtomicUsize,
}

/// Keeps a session marked busy until dropped.
pub struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Session {
    pub fn new(id: usize, config: &DatabaseConfig) -> Self {
        Session {
            id,
            path: config.path.clone(),
            cache_capacity: config.statement_cache_capacity.max(1),
            state: Mutex::new(SessionState {
                connection: None,
                statements: HashSet::new(),
            }),
            busy: AtomicBool::new(false),
            prepared: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn mark_busy(&self) -> BusyGuard<'_> {
        self.busy.store(true, Ordering::Release);
        BusyGuard(&self.busy)
    }

    /// Number of statements this session has compiled so far.
    pub fn statements_prepared(&self) -> usize {
        self.prepared.load(Ordering::Relaxed)
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connection.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self) -> Result<Connection, StorageError> {
        let connection = Connection::open(&self.path)?;
        connection.set_prepared_statement_cache_capacity(self.cache_capacity);
        connection.busy_timeout(BUSY_TIMEOUT)?;
        info!("session {} connected to {}", self.id, self.path.display());
        Ok(connection)
    }

    /// Opens the connection unless the session already has one.
    pub fn connect(&self) -> Result<(), StorageError> {
        let mut state = self.lock();
        if state.connection.is_none() {
            state.connection = Some(self.open()?);
            state.statements.clear();
        }
        Ok(())
    }

    pub fn ping(&self) -> bool {
        self.lock().connection.as_ref().is_some_and(ping)
    }

    /// Makes sure the session holds a live connection, reopening it with an
    /// empty statement cache if the liveness check fails.
    pub fn check_connection(&self) -> Result<(), StorageError> {
        let mut state = self.lock();
        if state.connection.as_ref().is_some_and(ping) {
            return Ok(());
        }

        if state.connection.take().is_some() {
            warn!("session {} failed its liveness check, reconnecting", self.id);
        }
        state.statements.clear();
        state.connection = Some(self.open()?);
        Ok(())
    }

    pub fn close(&self) {
        let mut state = self.lock();
        state.statements.clear();
        if let Some(connection) = state.connection.take() {
            match connection.close() {
                Ok(()) => info!("session {} closed", self.id),
                Err((_, e)) => warn!("session {} did not close cleanly: {e}", self.id),
            }
        }
    }

    /// Runs one statement with named parameters and materializes every
    /// resulting row.
    pub fn execute(
        &self,
        query: &str,
        params: &[(&str, &dyn ToSql)],
    ) -> Result<Vec<Row>, StorageError> {
        let mut state = self.lock();
        let _busy = self.mark_busy();

        let SessionState {
            connection,
            statements,
        } = &mut *state;
        let connection = connection.as_ref().ok_or(StorageError::NotConnected(self.id))?;

        let cached = statements.contains(query);
        if !cached && statements.len() >= self.cache_capacity {
            debug!("session {} statement cache full, flushing", self.id);
            connection.flush_prepared_statement_cache();
            statements.clear();
        }
        if !cached {
            trace!("session {} preparing: {query}", self.id);
        }
        let mut statement = connection.prepare_cached(query)?;
        if !cached {
            self.prepared.fetch_add(1, Ordering::Relaxed);
            statements.insert(query.to_string());
        }

        statement.clear_bindings();
        for &(name, value) in params {
            let index = statement
                .parameter_index(name)?
                .ok_or_else(|| StorageError::UnknownParameter(name.to_string()))?;
            statement.raw_bind_parameter(index, value)?;
        }

        let columns: Vec<String> = statement
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = Vec::new();
        if columns.is_empty() {
            statement.raw_execute()?;
            return Ok(rows);
        }

        let mut cursor = statement.raw_query();
        while let Some(raw) = cursor.next()? {
            let mut row = Row::default();
            for (i, column) in columns.iter().enumerate() {
                row.insert(column.clone(), Value::from(raw.get_ref(i)?));
            }
            rows.push(row);
        }
        Ok(rows)
    }
}

fn ping(connection: &Connection) -> bool {
    connection.query_row("SELECT 1", [], |_| Ok(())).is_ok()
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    fn session(dir: &TempDir) -> Session {
        Session::new(0, &DatabaseConfig::new(dir.path().join("session.db")))
    }

    #[test]
    fn execute_requires_connection() {
        let dir = TempDir::new("session").unwrap();
        let session = session(&dir);
        assert!(!session.ping());
        assert!(matches!(
            session.execute("SELECT 1", &[]),
            Err(StorageError::NotConnected(0))
        ));
    }

    #[test]
    fn connect_is_idempotent() {
        let dir = TempDir::new("session").unwrap();
        let session = session(&dir);
        session.connect().unwrap();
        session.connect().unwrap();
        assert!(session.is_connected());
        assert!(session.ping());
    }

    #[test]
    fn named_parameters_and_rows() {
        let dir = TempDir::new("session").unwrap();
        let session = session(&dir);
        session.connect().unwrap();

        session
            .execute("CREATE TABLE t (name TEXT, size INTEGER)", &[])
            .unwrap();
        for (name, size) in [("a", 1), ("b", 2), ("c", 3)] {
            session
                .execute(
                    "INSERT INTO t (name, size) VALUES (@name, @size)",
                    &[("@name", &name), ("@size", &size)],
                )
                .unwrap();
        }

        let rows = session
            .execute(
                "SELECT name, size FROM t WHERE size >= @min ORDER BY size",
                &[("@min", &2)],
            )
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get::<String>("name").unwrap(), "b");
        assert_eq!(rows[1].get::<i64>("size").unwrap(), 3);
        assert!(!session.is_busy());
    }

    #[test]
    fn statement_cache_reuse() {
        let dir = TempDir::new("session").unwrap();
        let session = session(&dir);
        session.connect().unwrap();

        let query = "SELECT @value AS value";
        let first = session.execute(query, &[("@value", &1)]).unwrap();
        let second = session.execute(query, &[("@value", &2)]).unwrap();

        assert_eq!(session.statements_prepared(), 1);
        assert_eq!(first[0].get::<i32>("value").unwrap(), 1);
        assert_eq!(second[0].get::<i32>("value").unwrap(), 2);

        session.execute("SELECT 2", &[]).unwrap();
        assert_eq!(session.statements_prepared(), 2);
    }

    #[test]
    fn unknown_parameter() {
        let dir = TempDir::new("session").unwrap();
        let session = session(&dir);
        session.connect().unwrap();
        let err = session
            .execute("SELECT @value", &[("@other", &1)])
            .unwrap_err();
        assert!(matches!(err, StorageError::UnknownParameter(name) if name == "@other"));
    }

    #[test]
    fn failed_prepare_is_not_cached() {
        let dir = TempDir::new("session").unwrap();
        let session = session(&dir);
        session.connect().unwrap();

        let query = "SELECT v FROM later";
        assert!(matches!(session.execute(query, &[]), Err(StorageError::Sqlite(_))));
        assert_eq!(session.statements_prepared(), 0);

        session.execute("CREATE TABLE later (v INTEGER)", &[]).unwrap();
        assert!(session.execute(query, &[]).unwrap().is_empty());
        assert_eq!(session.statements_prepared(), 2);
    }

    #[test]
    fn reconnect_clears_cache() {
        let dir = TempDir::new("session").unwrap();
        let session = session(&dir);
        session.connect().unwrap();
        session.execute("SELECT 1", &[]).unwrap();

        session.close();
        assert!(!session.is_connected());
        session.check_connection().unwrap();
        assert!(session.ping());

        session.execute("SELECT 1", &[]).unwrap();
        assert_eq!(session.statements_prepared(), 2);
    }
}
