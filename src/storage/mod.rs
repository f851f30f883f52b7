//! Pooled relational data layer.
//!
//! # Overview
//!
//! [`ConnectionPool`] owns a fixed set of [`Session`]s. Each session wraps one
//! SQLite connection together with its prepared-statement cache and is guarded
//! by its own lock, so a prepare/bind/execute sequence never interleaves with
//! another caller on the same session. Sessions connect lazily and reopen
//! themselves when a liveness check fails.
//!
//! [`Store`] is the domain facade on top: named CRUD operations for
//! developers, plugins, sources, resources and resource data, the published
//! queries that apply the publish state cascade, and credential checks.
//!
//! Every statement binds its parameters by name (`@username`, `@id`) and
//! returns fully materialized [`Row`]s.
mod credentials;
mod plugins;
mod pool;
mod resources;
mod row;
mod schema;
mod session;
pub(crate) mod store;

pub use credentials::{PBKDF2_ITERATIONS, PasswordHash};
pub use pool::ConnectionPool;
pub use row::Row;
pub use session::{BusyGuard, Session};
pub use store::Store;

pub mod error {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum StorageError {
        #[error("session {0} is not connected")]
        NotConnected(usize),

        #[error("[sqlite]: {0}")]
        Sqlite(#[from] rusqlite::Error),

        #[error("[row error][{action}]: {error}")]
        Row { action: String, error: String },

        #[error("query does not declare a parameter named {0}")]
        UnknownParameter(String),

        #[error("[credentials][{username}]: {cause}")]
        Credentials { username: String, cause: String },
    }
}
