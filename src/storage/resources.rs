use chrono::Utc;
use log::debug;

use crate::model::{PublishState, Resource, ResourceAndResourceData, ResourceData};

use super::error::StorageError;
use super::plugins::returned_id;
use super::store::{cascade_params, cascade_states};
use super::{Row, Store};

const RESOURCE_DATA_COLUMNS: &str = "resourceid, version, datafilename, uploaddate, publishstate";

macro_rules! published_resources {
    ($($filter:literal)?) => {
        concat!(
            "SELECT r.id, r.username, r.name, r.description, ",
            "d.resourceid, d.version, d.datafilename, d.uploaddate, d.publishstate ",
            "FROM resources r INNER JOIN resourcesdata d ON d.resourceid = r.id ",
            "WHERE d.publishstate IN (@state0, @state1, @state2, @state3) ",
            "AND d.version = (SELECT MAX(q.version) FROM resourcesdata q ",
            "WHERE q.resourceid = r.id AND q.publishstate IN (@state0, @state1, @state2, @state3)) ",
            $($filter,)?
            "ORDER BY r.id"
        )
    };
}

impl Store {
    pub fn create_resource(&self, resource: &Resource) -> Result<i32, StorageError> {
        let rows = self.execute(
            "INSERT INTO resources (username, name, description) VALUES (@username, @name, @description) RETURNING id",
            &[
                ("@username", &resource.username),
                ("@name", &resource.name),
                ("@description", &resource.description),
            ],
        )?;
        let id = returned_id(&rows)?;
        debug!("created resource {id} ({}) for {}", resource.name, resource.username);
        Ok(id)
    }

    pub fn update_resource(&self, resource: &Resource) -> Result<(), StorageError> {
        debug!("updating resource {} ({})", resource.id, resource.name);
        self.execute(
            "UPDATE resources SET name = @name, description = @description WHERE id = @id",
            &[
                ("@id", &resource.id),
                ("@name", &resource.name),
                ("@description", &resource.description),
            ],
        )?;
        Ok(())
    }

    pub fn delete_resource(&self, id: i32) -> Result<(), StorageError> {
        debug!("deleting resource {id}");
        self.execute("DELETE FROM resources WHERE id = @id", &[("@id", &id)])?;
        Ok(())
    }

    pub fn get_resource(&self, id: i32) -> Result<Option<Resource>, StorageError> {
        let rows = self.execute(
            "SELECT id, username, name, description FROM resources WHERE id = @id",
            &[("@id", &id)],
        )?;
        rows.first().map(resource_from_row).transpose()
    }

    pub fn get_resources(&self, username: Option<&str>) -> Result<Vec<Resource>, StorageError> {
        let rows = match username {
            Some(username) => self.execute(
                "SELECT id, username, name, description FROM resources WHERE username = @username ORDER BY id",
                &[("@username", &username)],
            )?,
            None => self.execute(
                "SELECT id, username, name, description FROM resources ORDER BY id",
                &[],
            )?,
        };
        rows.iter().map(resource_from_row).collect()
    }

    pub fn get_published_resources(
        &self,
        state: PublishState,
    ) -> Result<Vec<ResourceAndResourceData>, StorageError> {
        let states = cascade_states(state);
        let rows = self.execute(published_resources!(), &cascade_params(&states))?;
        rows.iter().map(resource_and_data_from_row).collect()
    }

    pub fn get_published_resource(
        &self,
        id: i32,
        state: PublishState,
    ) -> Result<Option<ResourceAndResourceData>, StorageError> {
        let states = cascade_states(state);
        let mut params = cascade_params(&states);
        params.push(("@id", &id));
        let rows = self.execute(published_resources!("AND r.id = @id "), &params)?;
        rows.first().map(resource_and_data_from_row).transpose()
    }

    /// Registers a new data version. It starts out unpublished.
    pub fn create_resource_data(&self, data: &ResourceData) -> Result<(), StorageError> {
        debug!(
            "creating resource data {}/{} ({})",
            data.resource_id, data.resource_version, data.data_filename
        );
        self.execute(
            "INSERT INTO resourcesdata (resourceid, version, datafilename, uploaddate, publishstate) \
             VALUES (@resourceid, @version, @datafilename, @uploaddate, @publishstate)",
            &[
                ("@resourceid", &data.resource_id),
                ("@version", &data.resource_version),
                ("@datafilename", &data.data_filename),
                ("@uploaddate", &data.upload_date),
                ("@publishstate", &PublishState::NotPublished),
            ],
        )?;
        Ok(())
    }

    pub fn update_resource_data(&self, data: &ResourceData) -> Result<(), StorageError> {
        debug!(
            "updating resource data {}/{}: file={} state={}",
            data.resource_id, data.resource_version, data.data_filename, data.publish_state
        );
        self.execute(
            "UPDATE resourcesdata SET datafilename = @datafilename, uploaddate = @uploaddate, publishstate = @publishstate \
             WHERE resourceid = @resourceid AND version = @version",
            &[
                ("@resourceid", &data.resource_id),
                ("@version", &data.resource_version),
                ("@datafilename", &data.data_filename),
                ("@uploaddate", &data.upload_date),
                ("@publishstate", &data.publish_state),
            ],
        )?;
        Ok(())
    }

    /// Records an uploaded data file; the upload date becomes now.
    pub fn update_resource_data_file(
        &self,
        resource_id: i32,
        version: i32,
        data_filename: &str,
    ) -> Result<(), StorageError> {
        debug!("updating file of resource data {resource_id}/{version}: {data_filename}");
        self.execute(
            "UPDATE resourcesdata SET datafilename = @datafilename, uploaddate = @uploaddate \
             WHERE resourceid = @resourceid AND version = @version",
            &[
                ("@resourceid", &resource_id),
                ("@version", &version),
                ("@datafilename", &data_filename),
                ("@uploaddate", &Utc::now()),
            ],
        )?;
        Ok(())
    }

    pub fn update_resource_data_publish_state(
        &self,
        resource_id: i32,
        version: i32,
        state: PublishState,
    ) -> Result<(), StorageError> {
        debug!("publishing resource data {resource_id}/{version} as {state}");
        self.execute(
            "UPDATE resourcesdata SET publishstate = @publishstate WHERE resourceid = @resourceid AND version = @version",
            &[
                ("@resourceid", &resource_id),
                ("@version", &version),
                ("@publishstate", &state),
            ],
        )?;
        Ok(())
    }

    pub fn delete_resource_data(&self, resource_id: i32, version: i32) -> Result<(), StorageError> {
        debug!("deleting resource data {resource_id}/{version}");
        self.execute(
            "DELETE FROM resourcesdata WHERE resourceid = @resourceid AND version = @version",
            &[("@resourceid", &resource_id), ("@version", &version)],
        )?;
        Ok(())
    }

    pub fn get_resource_data(
        &self,
        resource_id: i32,
        version: i32,
    ) -> Result<Option<ResourceData>, StorageError> {
        let query = format!(
            "SELECT {RESOURCE_DATA_COLUMNS} FROM resourcesdata WHERE resourceid = @resourceid AND version = @version"
        );
        let rows = self.execute(
            &query,
            &[("@resourceid", &resource_id), ("@version", &version)],
        )?;
        rows.first().map(resource_data_from_row).transpose()
    }

    /// Data versions of one resource, or of all resources.
    pub fn get_resource_datas(
        &self,
        resource_id: Option<i32>,
    ) -> Result<Vec<ResourceData>, StorageError> {
        let rows = match resource_id {
            Some(resource_id) => self.execute(
                &format!(
                    "SELECT {RESOURCE_DATA_COLUMNS} FROM resourcesdata WHERE resourceid = @resourceid ORDER BY version"
                ),
                &[("@resourceid", &resource_id)],
            )?,
            None => self.execute(
                &format!("SELECT {RESOURCE_DATA_COLUMNS} FROM resourcesdata ORDER BY resourceid, version"),
                &[],
            )?,
        };
        rows.iter().map(resource_data_from_row).collect()
    }
}

fn resource_from_row(row: &Row) -> Result<Resource, StorageError> {
    Ok(Resource {
        id: row.get("id")?,
        username: row.get("username")?,
        name: row.get("name")?,
        description: row.get("description")?,
    })
}

fn resource_data_from_row(row: &Row) -> Result<ResourceData, StorageError> {
    Ok(ResourceData {
        resource_id: row.get("resourceid")?,
        resource_version: row.get("version")?,
        data_filename: row.get("datafilename")?,
        upload_date: row.get_or_default("uploaddate")?,
        publish_state: row.get("publishstate")?,
    })
}

fn resource_and_data_from_row(row: &Row) -> Result<ResourceAndResourceData, StorageError> {
    Ok(ResourceAndResourceData {
        resource: resource_from_row(row)?,
        resource_data: resource_data_from_row(row)?,
        file_size: 0,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempdir::TempDir;

    use super::*;
    use crate::storage::store::testing::store;

    fn resource(username: &str, name: &str) -> Resource {
        Resource {
            username: username.to_string(),
            name: name.to_string(),
            description: format!("{name} data"),
            ..Default::default()
        }
    }

    fn add_data(store: &Store, resource_id: i32, version: i32, state: PublishState) {
        store
            .create_resource_data(&ResourceData {
                resource_id,
                resource_version: version,
                data_filename: format!("data-{resource_id}-{version}.bin"),
                ..Default::default()
            })
            .unwrap();
        store
            .update_resource_data_publish_state(resource_id, version, state)
            .unwrap();
    }

    #[test]
    fn resource_crud() {
        let dir = TempDir::new("resources").unwrap();
        let store = store(&dir);

        let words = store.create_resource(&resource("alice", "words")).unwrap();
        let keys = store.create_resource(&resource("bob", "keys")).unwrap();

        let mut stored = store.get_resource(words).unwrap().unwrap();
        assert_eq!(stored.description, "words data");
        stored.description = "english words".to_string();
        store.update_resource(&stored).unwrap();
        assert_eq!(
            store.get_resource(words).unwrap().unwrap().description,
            "english words"
        );

        assert_eq!(store.get_resources(None).unwrap().len(), 2);
        assert_eq!(store.get_resources(Some("bob")).unwrap()[0].id, keys);
        assert!(store.get_resources(Some("carol")).unwrap().is_empty());

        store.delete_resource(keys).unwrap();
        assert!(store.get_resource(keys).unwrap().is_none());
    }

    #[test]
    fn resource_data_lifecycle() {
        let dir = TempDir::new("resources").unwrap();
        let store = store(&dir);
        let id = store.create_resource(&resource("alice", "words")).unwrap();

        let upload = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        store
            .create_resource_data(&ResourceData {
                resource_id: id,
                resource_version: 1,
                data_filename: "first.bin".to_string(),
                upload_date: upload,
                publish_state: PublishState::Release,
            })
            .unwrap();

        let created = store.get_resource_data(id, 1).unwrap().unwrap();
        assert_eq!(created.publish_state, PublishState::NotPublished);
        assert_eq!(created.upload_date, upload);

        let mut changed = created.clone();
        changed.data_filename = "renamed.bin".to_string();
        changed.publish_state = PublishState::Beta;
        store.update_resource_data(&changed).unwrap();
        assert_eq!(store.get_resource_data(id, 1).unwrap().unwrap(), changed);

        store.update_resource_data_file(id, 1, "fresh.bin").unwrap();
        let refreshed = store.get_resource_data(id, 1).unwrap().unwrap();
        assert_eq!(refreshed.data_filename, "fresh.bin");
        assert!(refreshed.upload_date > upload);

        add_data(&store, id, 2, PublishState::Developer);
        add_data(&store, 99, 1, PublishState::Developer);
        assert_eq!(store.get_resource_datas(Some(id)).unwrap().len(), 2);
        assert_eq!(store.get_resource_datas(None).unwrap().len(), 3);

        store.delete_resource_data(id, 2).unwrap();
        assert!(store.get_resource_data(id, 2).unwrap().is_none());
    }

    #[test]
    fn publish_cascade() {
        let dir = TempDir::new("resources").unwrap();
        let store = store(&dir);
        let id = store.create_resource(&resource("alice", "words")).unwrap();
        add_data(&store, id, 1, PublishState::Developer);
        add_data(&store, id, 2, PublishState::Nightly);
        add_data(&store, id, 3, PublishState::Beta);

        let versions = |state| -> Vec<i32> {
            store
                .get_published_resources(state)
                .unwrap()
                .into_iter()
                .map(|r| r.resource_data.resource_version)
                .collect()
        };
        assert_eq!(versions(PublishState::Beta), [3]);
        assert_eq!(versions(PublishState::Nightly), [3]);
        assert!(versions(PublishState::Release).is_empty());

        let single = store
            .get_published_resource(id, PublishState::Developer)
            .unwrap()
            .unwrap();
        assert_eq!(single.resource.name, "words");
        assert_eq!(single.resource_data.data_filename, format!("data-{id}-3.bin"));
        assert!(store
            .get_published_resource(id, PublishState::Release)
            .unwrap()
            .is_none());
    }
}
