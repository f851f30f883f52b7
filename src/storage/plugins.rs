use chrono::Utc;
use log::debug;
use rusqlite::ToSql;

use crate::model::{BuildState, Plugin, PluginAndSource, PublishState, Source};

use super::error::StorageError;
use super::store::{cascade_params, cascade_states};
use super::{Row, Store};

const PLUGIN_COLUMNS: &str =
    "id, username, name, shortdescription, longdescription, authornames, authoremails, authorinstitutes, icon";

const SOURCE_COLUMNS: &str = "pluginid, pluginversion, buildversion, zipfilename, buildstate, buildlog, \
     assemblyfilename, uploaddate, builddate, publishstate";

/// Every plugin joined with its newest source among those whose publish state
/// is in the bound cascade.
macro_rules! published_plugins {
    ($($filter:literal)?) => {
        concat!(
            "SELECT p.id, p.username, p.name, p.shortdescription, p.longdescription, p.authornames, ",
            "p.authoremails, p.authorinstitutes, p.icon, s.pluginid, s.pluginversion, s.buildversion, ",
            "s.zipfilename, s.buildstate, s.buildlog, s.assemblyfilename, s.uploaddate, s.builddate, s.publishstate ",
            "FROM plugins p INNER JOIN sources s ON s.pluginid = p.id ",
            "WHERE s.publishstate IN (@state0, @state1, @state2, @state3) ",
            "AND s.pluginversion = (SELECT MAX(q.pluginversion) FROM sources q ",
            "WHERE q.pluginid = p.id AND q.publishstate IN (@state0, @state1, @state2, @state3)) ",
            $($filter,)?
            "ORDER BY p.id"
        )
    };
}

impl Store {
    /// Inserts a plugin owned by `plugin.username` and returns its new id.
    pub fn create_plugin(&self, plugin: &Plugin) -> Result<i32, StorageError> {
        let rows = self.execute(
            "INSERT INTO plugins (username, name, shortdescription, longdescription, authornames, authoremails, authorinstitutes, icon) \
             VALUES (@username, @name, @shortdescription, @longdescription, @authornames, @authoremails, @authorinstitutes, @icon) \
             RETURNING id",
            &[
                ("@username", &plugin.username),
                ("@name", &plugin.name),
                ("@shortdescription", &plugin.short_description),
                ("@longdescription", &plugin.long_description),
                ("@authornames", &plugin.author_names),
                ("@authoremails", &plugin.author_emails),
                ("@authorinstitutes", &plugin.author_institutes),
                ("@icon", &plugin.icon),
            ],
        )?;
        let id = returned_id(&rows)?;
        debug!("created plugin {id} ({}) for {}", plugin.name, plugin.username);
        Ok(id)
    }

    /// Rewrites the descriptive fields. The owner never changes.
    pub fn update_plugin(&self, plugin: &Plugin) -> Result<(), StorageError> {
        debug!("updating plugin {} ({})", plugin.id, plugin.name);
        self.execute(
            "UPDATE plugins SET name = @name, shortdescription = @shortdescription, longdescription = @longdescription, \
             authornames = @authornames, authoremails = @authoremails, authorinstitutes = @authorinstitutes, icon = @icon \
             WHERE id = @id",
            &[
                ("@id", &plugin.id),
                ("@name", &plugin.name),
                ("@shortdescription", &plugin.short_description),
                ("@longdescription", &plugin.long_description),
                ("@authornames", &plugin.author_names),
                ("@authoremails", &plugin.author_emails),
                ("@authorinstitutes", &plugin.author_institutes),
                ("@icon", &plugin.icon),
            ],
        )?;
        Ok(())
    }

    pub fn delete_plugin(&self, id: i32) -> Result<(), StorageError> {
        debug!("deleting plugin {id}");
        self.execute("DELETE FROM plugins WHERE id = @id", &[("@id", &id)])?;
        Ok(())
    }

    pub fn get_plugin(&self, id: i32) -> Result<Option<Plugin>, StorageError> {
        let query = format!("SELECT {PLUGIN_COLUMNS} FROM plugins WHERE id = @id");
        let rows = self.execute(&query, &[("@id", &id)])?;
        rows.first().map(plugin_from_row).transpose()
    }

    /// All plugins, or only those owned by `username`.
    pub fn get_plugins(&self, username: Option<&str>) -> Result<Vec<Plugin>, StorageError> {
        let rows = match username {
            Some(username) => self.execute(
                &format!("SELECT {PLUGIN_COLUMNS} FROM plugins WHERE username = @username ORDER BY id"),
                &[("@username", &username)],
            )?,
            None => self.execute(&format!("SELECT {PLUGIN_COLUMNS} FROM plugins ORDER BY id"), &[])?,
        };
        rows.iter().map(plugin_from_row).collect()
    }

    pub fn get_published_plugins(
        &self,
        state: PublishState,
    ) -> Result<Vec<PluginAndSource>, StorageError> {
        let states = cascade_states(state);
        let rows = self.execute(published_plugins!(), &cascade_params(&states))?;
        rows.iter().map(plugin_and_source_from_row).collect()
    }

    /// The newest source of plugin `id` visible at `state`, if any.
    pub fn get_published_plugin(
        &self,
        id: i32,
        state: PublishState,
    ) -> Result<Option<PluginAndSource>, StorageError> {
        let states = cascade_states(state);
        let mut params = cascade_params(&states);
        params.push(("@id", &id));
        let rows = self.execute(published_plugins!("AND p.id = @id "), &params)?;
        rows.first().map(plugin_and_source_from_row).transpose()
    }

    /// Registers a new version. File names start out empty and the version is
    /// not published.
    pub fn create_source(&self, source: &Source) -> Result<(), StorageError> {
        debug!(
            "creating source {}/{} ({})",
            source.plugin_id, source.plugin_version, source.build_state
        );
        self.execute(
            "INSERT INTO sources (pluginid, pluginversion, zipfilename, assemblyfilename, buildstate, buildlog, publishstate) \
             VALUES (@pluginid, @pluginversion, '', '', @buildstate, @buildlog, @publishstate)",
            &[
                ("@pluginid", &source.plugin_id),
                ("@pluginversion", &source.plugin_version),
                ("@buildstate", &source.build_state),
                ("@buildlog", &source.build_log),
                ("@publishstate", &PublishState::NotPublished),
            ],
        )?;
        Ok(())
    }

    /// Records an uploaded source archive together with its build status.
    pub fn update_source(&self, source: &Source) -> Result<(), StorageError> {
        debug!(
            "updating source {}/{}: zip={} state={}",
            source.plugin_id, source.plugin_version, source.zip_file_name, source.build_state
        );
        self.execute(
            "UPDATE sources SET zipfilename = @zipfilename, buildstate = @buildstate, buildlog = @buildlog, uploaddate = @uploaddate \
             WHERE pluginid = @pluginid AND pluginversion = @pluginversion",
            &[
                ("@pluginid", &source.plugin_id),
                ("@pluginversion", &source.plugin_version),
                ("@zipfilename", &source.zip_file_name),
                ("@buildstate", &source.build_state),
                ("@buildlog", &source.build_log),
                ("@uploaddate", &source.upload_date),
            ],
        )?;
        Ok(())
    }

    /// Records a built assembly; the build date becomes now.
    pub fn update_source_assembly(
        &self,
        plugin_id: i32,
        plugin_version: i32,
        assembly_file_name: &str,
    ) -> Result<(), StorageError> {
        debug!("updating assembly of source {plugin_id}/{plugin_version}: {assembly_file_name}");
        self.execute(
            "UPDATE sources SET assemblyfilename = @assemblyfilename, builddate = @builddate \
             WHERE pluginid = @pluginid AND pluginversion = @pluginversion",
            &[
                ("@pluginid", &plugin_id),
                ("@pluginversion", &plugin_version),
                ("@assemblyfilename", &assembly_file_name),
                ("@builddate", &Utc::now()),
            ],
        )?;
        Ok(())
    }

    pub fn update_source_build(&self, source: &Source) -> Result<(), StorageError> {
        debug!(
            "updating build of source {}/{}: state={} build={}",
            source.plugin_id, source.plugin_version, source.build_state, source.build_version
        );
        self.execute(
            "UPDATE sources SET zipfilename = @zipfilename, buildstate = @buildstate, buildlog = @buildlog, buildversion = @buildversion \
             WHERE pluginid = @pluginid AND pluginversion = @pluginversion",
            &[
                ("@pluginid", &source.plugin_id),
                ("@pluginversion", &source.plugin_version),
                ("@zipfilename", &source.zip_file_name),
                ("@buildstate", &source.build_state),
                ("@buildlog", &source.build_log),
                ("@buildversion", &source.build_version),
            ],
        )?;
        Ok(())
    }

    pub fn update_source_publish_state(
        &self,
        plugin_id: i32,
        plugin_version: i32,
        state: PublishState,
    ) -> Result<(), StorageError> {
        debug!("publishing source {plugin_id}/{plugin_version} as {state}");
        self.execute(
            "UPDATE sources SET publishstate = @publishstate WHERE pluginid = @pluginid AND pluginversion = @pluginversion",
            &[
                ("@pluginid", &plugin_id),
                ("@pluginversion", &plugin_version),
                ("@publishstate", &state),
            ],
        )?;
        Ok(())
    }

    pub fn delete_source(&self, plugin_id: i32, plugin_version: i32) -> Result<(), StorageError> {
        debug!("deleting source {plugin_id}/{plugin_version}");
        self.execute(
            "DELETE FROM sources WHERE pluginid = @pluginid AND pluginversion = @pluginversion",
            &[("@pluginid", &plugin_id), ("@pluginversion", &plugin_version)],
        )?;
        Ok(())
    }

    pub fn get_source(
        &self,
        plugin_id: i32,
        plugin_version: i32,
    ) -> Result<Option<Source>, StorageError> {
        let query = format!(
            "SELECT {SOURCE_COLUMNS} FROM sources WHERE pluginid = @pluginid AND pluginversion = @pluginversion"
        );
        let rows = self.execute(
            &query,
            &[("@pluginid", &plugin_id), ("@pluginversion", &plugin_version)],
        )?;
        rows.first().map(source_from_row).transpose()
    }

    pub fn get_sources(&self, plugin_id: i32) -> Result<Vec<Source>, StorageError> {
        let query =
            format!("SELECT {SOURCE_COLUMNS} FROM sources WHERE pluginid = @pluginid ORDER BY pluginversion");
        self.sources_where(&query, &[("@pluginid", &plugin_id)])
    }

    /// Sources across all plugins in one build state, e.g. everything still
    /// waiting for the build server.
    pub fn get_sources_by_build_state(
        &self,
        state: BuildState,
    ) -> Result<Vec<Source>, StorageError> {
        let query = format!(
            "SELECT {SOURCE_COLUMNS} FROM sources WHERE buildstate = @buildstate ORDER BY pluginid, pluginversion"
        );
        self.sources_where(&query, &[("@buildstate", &state)])
    }

    fn sources_where(
        &self,
        query: &str,
        params: &[(&str, &dyn ToSql)],
    ) -> Result<Vec<Source>, StorageError> {
        self.execute(query, params)?
            .iter()
            .map(source_from_row)
            .collect()
    }
}

pub(crate) fn returned_id(rows: &[Row]) -> Result<i32, StorageError> {
    rows.first()
        .ok_or_else(|| StorageError::Row {
            action: "read inserted id".into(),
            error: "insert returned no row".into(),
        })?
        .get("id")
}

fn plugin_from_row(row: &Row) -> Result<Plugin, StorageError> {
    Ok(Plugin {
        id: row.get("id")?,
        username: row.get("username")?,
        name: row.get("name")?,
        short_description: row.get("shortdescription")?,
        long_description: row.get("longdescription")?,
        author_names: row.get("authornames")?,
        author_emails: row.get("authoremails")?,
        author_institutes: row.get("authorinstitutes")?,
        icon: row.get_or_default("icon")?,
    })
}

fn source_from_row(row: &Row) -> Result<Source, StorageError> {
    Ok(Source {
        plugin_id: row.get("pluginid")?,
        plugin_version: row.get("pluginversion")?,
        build_version: row.get("buildversion")?,
        zip_file_name: row.get("zipfilename")?,
        build_state: row.get("buildstate")?,
        build_log: row.get("buildlog")?,
        assembly_file_name: row.get("assemblyfilename")?,
        upload_date: row.get_or_default("uploaddate")?,
        build_date: row.get_or_default("builddate")?,
        publish_state: row.get("publishstate")?,
    })
}

fn plugin_and_source_from_row(row: &Row) -> Result<PluginAndSource, StorageError> {
    Ok(PluginAndSource {
        plugin: plugin_from_row(row)?,
        source: source_from_row(row)?,
        file_size: 0,
    })
}
