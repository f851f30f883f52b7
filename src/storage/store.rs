use log::{debug, info};
use rusqlite::ToSql;

use crate::config::DatabaseConfig;
use crate::model::{Developer, PublishState};

use super::credentials::PasswordHash;
use super::error::StorageError;
use super::schema::{CASCADE_PARAMS, TABLES};
use super::{ConnectionPool, Row};

/// Domain operations over the pooled database.
pub struct Store {
    pool: ConnectionPool,
}

impl Store {
    /// Creates the store and tries to connect every pooled session. An
    /// unreachable database is not an error here.
    pub fn new(config: DatabaseConfig) -> Self {
        let pool = ConnectionPool::new(config);
        pool.connect();
        Store { pool }
    }

    /// [`Store::new`] followed by [`Store::initialize_schema`].
    pub fn open(config: DatabaseConfig) -> Result<Self, StorageError> {
        let store = Store::new(config);
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn initialize_schema(&self) -> Result<(), StorageError> {
        for table in TABLES {
            self.execute(table, &[])?;
        }
        info!("schema ready at {}", self.pool.config().path.display());
        Ok(())
    }

    pub fn close(&self) {
        self.pool.close();
    }

    pub(crate) fn execute(
        &self,
        query: &str,
        params: &[(&str, &dyn ToSql)],
    ) -> Result<Vec<Row>, StorageError> {
        self.pool.execute(query, params)
    }

    pub fn create_developer(&self, developer: &Developer) -> Result<(), StorageError> {
        debug!(
            "creating developer {} (admin: {})",
            developer.username, developer.is_admin
        );
        let password = PasswordHash::generate(&developer.password);
        self.execute(
            "INSERT INTO developers (username, firstname, lastname, email, password, passwordsalt, passworditerations, isadmin) \
             VALUES (@username, @firstname, @lastname, @email, @password, @passwordsalt, @passworditerations, @isadmin)",
            &[
                ("@username", &developer.username),
                ("@firstname", &developer.firstname),
                ("@lastname", &developer.lastname),
                ("@email", &developer.email),
                ("@password", &password.hash),
                ("@passwordsalt", &password.salt),
                ("@passworditerations", &password.iterations),
                ("@isadmin", &developer.is_admin),
            ],
        )?;
        Ok(())
    }

    /// Unknown usernames are reported as a mismatch.
    pub fn check_developer_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, StorageError> {
        let rows = self.execute(
            "SELECT password, passwordsalt, passworditerations FROM developers WHERE username = @username",
            &[("@username", &username)],
        )?;
        let Some(row) = rows.first() else {
            return Ok(false);
        };

        let stored = PasswordHash {
            hash: row.get("password")?,
            salt: row.get("passwordsalt")?,
            iterations: row.get("passworditerations")?,
        };
        stored.verify(username, password)
    }

    pub fn get_developer(&self, username: &str) -> Result<Option<Developer>, StorageError> {
        let rows = self.execute(
            "SELECT username, firstname, lastname, email, isadmin FROM developers WHERE username = @username",
            &[("@username", &username)],
        )?;
        rows.first().map(developer_from_row).transpose()
    }

    pub fn get_developers(&self) -> Result<Vec<Developer>, StorageError> {
        self.execute(
            "SELECT username, firstname, lastname, email, isadmin FROM developers ORDER BY username",
            &[],
        )?
        .iter()
        .map(developer_from_row)
        .collect()
    }

    pub fn update_developer(&self, developer: &Developer) -> Result<(), StorageError> {
        debug!(
            "updating developer {} (admin: {})",
            developer.username, developer.is_admin
        );
        self.execute(
            "UPDATE developers SET firstname = @firstname, lastname = @lastname, email = @email, isadmin = @isadmin \
             WHERE username = @username",
            &[
                ("@username", &developer.username),
                ("@firstname", &developer.firstname),
                ("@lastname", &developer.lastname),
                ("@email", &developer.email),
                ("@isadmin", &developer.is_admin),
            ],
        )?;
        Ok(())
    }

    /// Updates the profile fields but leaves the admin flag alone.
    pub fn update_developer_no_admin(&self, developer: &Developer) -> Result<(), StorageError> {
        debug!("updating profile of developer {}", developer.username);
        self.execute(
            "UPDATE developers SET firstname = @firstname, lastname = @lastname, email = @email \
             WHERE username = @username",
            &[
                ("@username", &developer.username),
                ("@firstname", &developer.firstname),
                ("@lastname", &developer.lastname),
                ("@email", &developer.email),
            ],
        )?;
        Ok(())
    }

    /// Stores a new hash of `password` under a fresh salt.
    pub fn update_developer_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(), StorageError> {
        debug!("updating password of developer {username}");
        let password = PasswordHash::generate(password);
        self.execute(
            "UPDATE developers SET password = @password, passwordsalt = @passwordsalt, passworditerations = @passworditerations \
             WHERE username = @username",
            &[
                ("@username", &username),
                ("@password", &password.hash),
                ("@passwordsalt", &password.salt),
                ("@passworditerations", &password.iterations),
            ],
        )?;
        Ok(())
    }

    pub fn delete_developer(&self, username: &str) -> Result<(), StorageError> {
        debug!("deleting developer {username}");
        self.execute(
            "DELETE FROM developers WHERE username = @username",
            &[("@username", &username)],
        )?;
        Ok(())
    }
}

fn developer_from_row(row: &Row) -> Result<Developer, StorageError> {
    Ok(Developer {
        username: row.get("username")?,
        password: String::new(),
        firstname: row.get("firstname")?,
        lastname: row.get("lastname")?,
        email: row.get("email")?,
        is_admin: row.get("isadmin")?,
    })
}

/// The cascade of `state` stretched over the four placeholders in
/// [`CASCADE_PARAMS`].
pub(crate) fn cascade_states(state: PublishState) -> [PublishState; 4] {
    let cascade = state.cascade();
    std::array::from_fn(|i| cascade[i.min(cascade.len() - 1)])
}

pub(crate) fn cascade_params(states: &[PublishState; 4]) -> Vec<(&'static str, &dyn ToSql)> {
    CASCADE_PARAMS
        .iter()
        .zip(states)
        .map(|(&name, state)| (name, state as &dyn ToSql))
        .collect()
}
