use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::model::BuildState;
use crate::storage::Store;
use crate::storage::error::StorageError;

use super::request::*;
use super::response::*;
use super::{Message, MessageType};

/// What the connection loop should do after a message was handled.
#[derive(Debug, PartialEq)]
pub enum Reply {
    Respond(Message),
    /// Nothing to send back.
    Silent,
    /// The client logged out; close the connection.
    Close,
}

/// Serves the requests of one client connection.
///
/// Published listings are open to anonymous clients. Everything else needs a
/// successful login on this connection first.
pub struct ClientHandler {
    store: Arc<Store>,
    peer: String,
    username: Option<String>,
    is_admin: bool,
}

impl ClientHandler {
    pub fn new(store: Arc<Store>, peer: impl Into<String>) -> Self {
        ClientHandler {
            store,
            peer: peer.into(),
            username: None,
            is_admin: false,
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn handle(&mut self, message: Message) -> Reply {
        let message_type = message.message_type();
        debug!("{} sent {:?}", self.peer, message);

        if !self.is_authenticated() && !is_anonymous(message_type) {
            warn!("{} sent {message_type} without logging in", self.peer);
            return Reply::Respond(failure(message_type, "Not authenticated".into()));
        }

        match self.dispatch(message) {
            Ok(reply) => reply,
            Err(e) => {
                error!("{message_type} from {} failed: {e}", self.peer);
                Reply::Respond(failure(message_type, format!("Database error: {e}")))
            }
        }
    }

    fn dispatch(&mut self, message: Message) -> Result<Reply, StorageError> {
        let response = match message {
            Message::Login(login) => self.login(login)?,
            Message::Logout(_) => {
                info!(
                    "{} logged out ({})",
                    self.peer,
                    self.username.as_deref().unwrap_or_default()
                );
                self.username = None;
                self.is_admin = false;
                return Ok(Reply::Close);
            }

            Message::CreateNewDeveloper(m) => self.create_developer(m)?,
            Message::UpdateDeveloper(m) => self.update_developer(m)?,
            Message::DeleteDeveloper(m) => self.delete_developer(m)?,
            Message::RequestDeveloper(m) => self.request_developer(m)?,
            Message::RequestDeveloperList(_) => ResponseDeveloperListMessage {
                message: String::new(),
                allowed_to_view_list: true,
                developer_list: self.store.get_developers()?,
            }
            .into(),

            Message::CreateNewPlugin(m) => self.create_plugin(m)?,
            Message::UpdatePlugin(m) => self.update_plugin(m)?,
            Message::DeletePlugin(m) => self.delete_plugin(m)?,
            Message::RequestPlugin(m) => match self.store.get_plugin(m.id)? {
                Some(plugin) => ResponsePluginMessage {
                    message: String::new(),
                    plugin_exists: true,
                    plugin,
                }
                .into(),
                None => failure(MessageType::RequestPlugin, format!("Plugin {} does not exist", m.id)),
            },
            Message::RequestPluginList(m) => {
                let owner = (!m.username.is_empty()).then_some(m.username.as_str());
                ResponsePluginListMessage {
                    message: String::new(),
                    plugins: self.store.get_plugins(owner)?,
                }
                .into()
            }
            Message::RequestPublishedPluginList(m) => ResponsePublishedPluginListMessage {
                message: String::new(),
                plugins_and_sources: self.store.get_published_plugins(m.publish_state)?,
            }
            .into(),
            Message::RequestPublishedPlugin(m) => {
                match self.store.get_published_plugin(m.id, m.publish_state)? {
                    Some(plugin_and_source) => ResponsePublishedPluginMessage {
                        message: String::new(),
                        plugin_and_source_exist: true,
                        plugin_and_source,
                    }
                    .into(),
                    None => failure(
                        MessageType::RequestPublishedPlugin,
                        format!("No published version of plugin {} at {}", m.id, m.publish_state),
                    ),
                }
            }

            Message::CreateNewSource(m) => self.create_source(m)?,
            Message::UpdateSource(m) => self.update_source(m)?,
            Message::UpdateSourcePublishState(m) => self.update_source_publish_state(m)?,
            Message::DeleteSource(m) => self.delete_source(m)?,
            Message::RequestSource(m) => match self.store.get_source(m.plugin_id, m.plugin_version)? {
                Some(source) => ResponseSourceMessage {
                    message: String::new(),
                    source_exists: true,
                    source,
                }
                .into(),
                None => failure(
                    MessageType::RequestSource,
                    format!("Source {}/{} does not exist", m.plugin_id, m.plugin_version),
                ),
            },
            Message::RequestSourceList(m) => self.request_source_list(m)?,

            Message::CreateNewResource(m) => self.create_resource(m)?,
            Message::UpdateResource(m) => self.update_resource(m)?,
            Message::DeleteResource(m) => self.delete_resource(m)?,
            Message::RequestResource(m) => match self.store.get_resource(m.id)? {
                Some(resource) => ResponseResourceMessage {
                    message: String::new(),
                    resource_exists: true,
                    resource,
                }
                .into(),
                None => failure(MessageType::RequestResource, format!("Resource {} does not exist", m.id)),
            },
            Message::RequestResourceList(m) => {
                let owner = (!m.username.is_empty()).then_some(m.username.as_str());
                ResponseResourceListMessage {
                    allowed_to_view_list: true,
                    message: String::new(),
                    resources: self.store.get_resources(owner)?,
                }
                .into()
            }
            Message::RequestPublishedResourceList(m) => ResponsePublishedResourceListMessage {
                message: String::new(),
                resources_and_resource_datas: self.store.get_published_resources(m.publish_state)?,
            }
            .into(),
            Message::RequestPublishedResource(m) => {
                match self.store.get_published_resource(m.id, m.publish_state)? {
                    Some(resource_and_resource_data) => ResponsePublishedResourceMessage {
                        message: String::new(),
                        resource_and_resource_data_exist: true,
                        resource_and_resource_data,
                    }
                    .into(),
                    None => failure(
                        MessageType::RequestPublishedResource,
                        format!("No published version of resource {} at {}", m.id, m.publish_state),
                    ),
                }
            }

            Message::CreateNewResourceData(m) => self.create_resource_data(m)?,
            Message::UpdateResourceData(m) => self.update_resource_data(m)?,
            Message::UpdateResourceDataPublishState(m) => self.update_resource_data_publish_state(m)?,
            Message::DeleteResourceData(m) => self.delete_resource_data(m)?,
            Message::RequestResourceData(m) => {
                match self.store.get_resource_data(m.resource_id, m.resource_version)? {
                    Some(resource_data) => ResponseResourceDataMessage {
                        message: String::new(),
                        resource_data_exists: true,
                        resource_data,
                    }
                    .into(),
                    None => failure(
                        MessageType::RequestResourceData,
                        format!(
                            "Resource data {}/{} does not exist",
                            m.resource_id, m.resource_version
                        ),
                    ),
                }
            }
            Message::RequestResourceDataList(m) => ResponseResourceDataListMessage {
                allowed_to_view_list: true,
                message: String::new(),
                resource_data_list: self
                    .store
                    .get_resource_datas((m.resource_id > 0).then_some(m.resource_id))?,
            }
            .into(),

            Message::ClientError(m) => {
                warn!("{} reported an error: {}", self.peer, m.message);
                return Ok(Reply::Silent);
            }

            Message::UploadDownloadData(_)
            | Message::StartUploadSourceZipfile(_)
            | Message::StartUploadAssemblyZipfile(_)
            | Message::StartUploadResourceDataFile(_)
            | Message::RequestDownloadSourceZipfile(_)
            | Message::RequestDownloadAssemblyZipfile(_)
            | Message::RequestDownloadResourceDataFile(_)
            | Message::StopUploadDownload(_) => {
                ServerErrorMessage::new("File transfer is not available on this server").into()
            }

            other => {
                warn!("{} sent unexpected {}", self.peer, other.message_type());
                ServerErrorMessage::new(format!("Unexpected message {}", other.message_type())).into()
            }
        };
        Ok(Reply::Respond(response))
    }

    fn login(&mut self, login: LoginMessage) -> Result<Message, StorageError> {
        self.username = None;
        self.is_admin = false;

        let username = login.username.to_lowercase();
        if !self.store.check_developer_password(&username, &login.password)? {
            warn!("{} failed to log in as {username}", self.peer);
            return Ok(failure(MessageType::Login, "Login credentials incorrect".into()));
        }

        let is_admin = self
            .store
            .get_developer(&username)?
            .is_some_and(|developer| developer.is_admin);
        info!("{} logged in as {username} (admin: {is_admin})", self.peer);
        self.username = Some(username);
        self.is_admin = is_admin;

        Ok(ResponseLoginMessage {
            login_ok: true,
            message: "Login credentials correct".into(),
            is_admin,
        }
        .into())
    }

    fn create_developer(&self, m: CreateNewDeveloperMessage) -> Result<Message, StorageError> {
        let mut developer = m.developer;
        developer.username = developer.username.to_lowercase();
        if self.store.get_developer(&developer.username)?.is_some() {
            return Ok(developer_modified(false, format!("Developer {} already exists", developer.username)));
        }
        self.store.create_developer(&developer)?;
        Ok(developer_modified(true, format!("Created developer {}", developer.username)))
    }

    /// Non-admin sessions cannot change the admin flag.
    fn update_developer(&self, m: UpdateDeveloperMessage) -> Result<Message, StorageError> {
        let mut developer = m.developer;
        developer.username = developer.username.to_lowercase();
        if self.store.get_developer(&developer.username)?.is_none() {
            return Ok(developer_modified(false, format!("Developer {} does not exist", developer.username)));
        }

        if self.is_admin {
            self.store.update_developer(&developer)?;
        } else {
            self.store.update_developer_no_admin(&developer)?;
        }
        if !developer.password.is_empty() {
            self.store.update_developer_password(&developer.username, &developer.password)?;
        }
        Ok(developer_modified(true, format!("Updated developer {}", developer.username)))
    }

    fn delete_developer(&self, m: DeleteDeveloperMessage) -> Result<Message, StorageError> {
        let username = m.developer.username.to_lowercase();
        if self.store.get_developer(&username)?.is_none() {
            return Ok(developer_modified(false, format!("Developer {username} does not exist")));
        }
        self.store.delete_developer(&username)?;
        Ok(developer_modified(true, format!("Deleted developer {username}")))
    }

    fn request_developer(&self, m: RequestDeveloperMessage) -> Result<Message, StorageError> {
        let username = m.username.to_lowercase();
        Ok(match self.store.get_developer(&username)? {
            Some(developer) => ResponseDeveloperMessage {
                developer_exists: true,
                message: String::new(),
                developer,
            }
            .into(),
            None => failure(
                MessageType::RequestDeveloper,
                format!("Developer {username} does not exist"),
            ),
        })
    }

    fn create_plugin(&self, m: CreateNewPluginMessage) -> Result<Message, StorageError> {
        let mut plugin = m.plugin;
        plugin.username = self.username.clone().unwrap_or_default();
        let id = self.store.create_plugin(&plugin)?;
        Ok(plugin_modified(true, format!("Created plugin {id}")))
    }

    fn update_plugin(&self, m: UpdatePluginMessage) -> Result<Message, StorageError> {
        if self.store.get_plugin(m.plugin.id)?.is_none() {
            return Ok(plugin_modified(false, format!("Plugin {} does not exist", m.plugin.id)));
        }
        self.store.update_plugin(&m.plugin)?;
        Ok(plugin_modified(true, format!("Updated plugin {}", m.plugin.id)))
    }

    fn delete_plugin(&self, m: DeletePluginMessage) -> Result<Message, StorageError> {
        if self.store.get_plugin(m.plugin.id)?.is_none() {
            return Ok(plugin_modified(false, format!("Plugin {} does not exist", m.plugin.id)));
        }
        self.store.delete_plugin(m.plugin.id)?;
        Ok(plugin_modified(true, format!("Deleted plugin {}", m.plugin.id)))
    }

    fn create_source(&self, m: CreateNewSourceMessage) -> Result<Message, StorageError> {
        let source = m.source;
        if self.store.get_plugin(source.plugin_id)?.is_none() {
            return Ok(source_modified(false, format!("Plugin {} does not exist", source.plugin_id)));
        }
        if self
            .store
            .get_source(source.plugin_id, source.plugin_version)?
            .is_some()
        {
            return Ok(source_modified(
                false,
                format!("Source {}/{} already exists", source.plugin_id, source.plugin_version),
            ));
        }
        self.store.create_source(&source)?;
        Ok(source_modified(
            true,
            format!("Created source {}/{}", source.plugin_id, source.plugin_version),
        ))
    }

    fn update_source(&self, m: UpdateSourceMessage) -> Result<Message, StorageError> {
        let source = m.source;
        if self
            .store
            .get_source(source.plugin_id, source.plugin_version)?
            .is_none()
        {
            return Ok(missing_source(source.plugin_id, source.plugin_version));
        }
        self.store.update_source(&source)?;
        Ok(source_modified(
            true,
            format!("Updated source {}/{}", source.plugin_id, source.plugin_version),
        ))
    }

    fn update_source_publish_state(
        &self,
        m: UpdateSourcePublishStateMessage,
    ) -> Result<Message, StorageError> {
        let source = m.source;
        if self
            .store
            .get_source(source.plugin_id, source.plugin_version)?
            .is_none()
        {
            return Ok(missing_source(source.plugin_id, source.plugin_version));
        }
        self.store.update_source_publish_state(
            source.plugin_id,
            source.plugin_version,
            source.publish_state,
        )?;
        Ok(source_modified(
            true,
            format!(
                "Published source {}/{} as {}",
                source.plugin_id, source.plugin_version, source.publish_state
            ),
        ))
    }

    fn delete_source(&self, m: DeleteSourceMessage) -> Result<Message, StorageError> {
        let source = m.source;
        if self
            .store
            .get_source(source.plugin_id, source.plugin_version)?
            .is_none()
        {
            return Ok(missing_source(source.plugin_id, source.plugin_version));
        }
        self.store.delete_source(source.plugin_id, source.plugin_version)?;
        Ok(source_modified(
            true,
            format!("Deleted source {}/{}", source.plugin_id, source.plugin_version),
        ))
    }

    fn request_source_list(&self, m: RequestSourceListMessage) -> Result<Message, StorageError> {
        let source_list = if m.plugin_id > 0 || m.build_state.is_empty() {
            self.store.get_sources(m.plugin_id)?
        } else {
            match m.build_state.parse::<BuildState>() {
                Ok(state) => self.store.get_sources_by_build_state(state)?,
                Err(e) => return Ok(failure(MessageType::RequestSourceList, e.to_string())),
            }
        };
        Ok(ResponseSourceListMessage {
            allowed_to_view_list: true,
            message: String::new(),
            source_list,
        }
        .into())
    }

    fn create_resource(&self, m: CreateNewResourceMessage) -> Result<Message, StorageError> {
        let mut resource = m.resource;
        resource.username = self.username.clone().unwrap_or_default();
        let id = self.store.create_resource(&resource)?;
        Ok(resource_modified(true, format!("Created resource {id}")))
    }

    fn update_resource(&self, m: UpdateResourceMessage) -> Result<Message, StorageError> {
        if self.store.get_resource(m.resource.id)?.is_none() {
            return Ok(resource_modified(false, format!("Resource {} does not exist", m.resource.id)));
        }
        self.store.update_resource(&m.resource)?;
        Ok(resource_modified(true, format!("Updated resource {}", m.resource.id)))
    }

    fn delete_resource(&self, m: DeleteResourceMessage) -> Result<Message, StorageError> {
        if self.store.get_resource(m.resource.id)?.is_none() {
            return Ok(resource_modified(false, format!("Resource {} does not exist", m.resource.id)));
        }
        self.store.delete_resource(m.resource.id)?;
        Ok(resource_modified(true, format!("Deleted resource {}", m.resource.id)))
    }

    fn create_resource_data(&self, m: CreateNewResourceDataMessage) -> Result<Message, StorageError> {
        let data = m.resource_data;
        if self.store.get_resource(data.resource_id)?.is_none() {
            return Ok(resource_data_modified(
                false,
                format!("Resource {} does not exist", data.resource_id),
            ));
        }
        if self
            .store
            .get_resource_data(data.resource_id, data.resource_version)?
            .is_some()
        {
            return Ok(resource_data_modified(
                false,
                format!(
                    "Resource data {}/{} already exists",
                    data.resource_id, data.resource_version
                ),
            ));
        }
        self.store.create_resource_data(&data)?;
        Ok(resource_data_modified(
            true,
            format!("Created resource data {}/{}", data.resource_id, data.resource_version),
        ))
    }

    fn update_resource_data(&self, m: UpdateResourceDataMessage) -> Result<Message, StorageError> {
        let data = m.resource_data;
        if self
            .store
            .get_resource_data(data.resource_id, data.resource_version)?
            .is_none()
        {
            return Ok(missing_resource_data(data.resource_id, data.resource_version));
        }
        self.store.update_resource_data(&data)?;
        Ok(resource_data_modified(
            true,
            format!("Updated resource data {}/{}", data.resource_id, data.resource_version),
        ))
    }

    fn update_resource_data_publish_state(
        &self,
        m: UpdateResourceDataPublishStateMessage,
    ) -> Result<Message, StorageError> {
        let data = m.resource_data;
        if self
            .store
            .get_resource_data(data.resource_id, data.resource_version)?
            .is_none()
        {
            return Ok(missing_resource_data(data.resource_id, data.resource_version));
        }
        self.store.update_resource_data_publish_state(
            data.resource_id,
            data.resource_version,
            data.publish_state,
        )?;
        Ok(resource_data_modified(
            true,
            format!(
                "Published resource data {}/{} as {}",
                data.resource_id, data.resource_version, data.publish_state
            ),
        ))
    }

    fn delete_resource_data(&self, m: DeleteResourceDataMessage) -> Result<Message, StorageError> {
        let data = m.resource_data;
        if self
            .store
            .get_resource_data(data.resource_id, data.resource_version)?
            .is_none()
        {
            return Ok(missing_resource_data(data.resource_id, data.resource_version));
        }
        self.store
            .delete_resource_data(data.resource_id, data.resource_version)?;
        Ok(resource_data_modified(
            true,
            format!("Deleted resource data {}/{}", data.resource_id, data.resource_version),
        ))
    }
}

fn is_anonymous(message_type: MessageType) -> bool {
    matches!(
        message_type,
        MessageType::Login
            | MessageType::Logout
            | MessageType::ClientError
            | MessageType::RequestPublishedPluginList
            | MessageType::RequestPublishedPlugin
            | MessageType::RequestPublishedResourceList
            | MessageType::RequestPublishedResource
    )
}

/// The negative response matching `request`, carrying `message`.
fn failure(request: MessageType, message: String) -> Message {
    use MessageType::*;

    match request {
        Login => ResponseLoginMessage {
            login_ok: false,
            message,
            is_admin: false,
        }
        .into(),
        RequestDeveloperList => ResponseDeveloperListMessage {
            message,
            ..Default::default()
        }
        .into(),
        CreateNewDeveloper | UpdateDeveloper | DeleteDeveloper => developer_modified(false, message),
        RequestDeveloper => ResponseDeveloperMessage {
            message,
            ..Default::default()
        }
        .into(),
        RequestPluginList => ResponsePluginListMessage {
            message,
            ..Default::default()
        }
        .into(),
        CreateNewPlugin | UpdatePlugin | DeletePlugin => plugin_modified(false, message),
        RequestPlugin => ResponsePluginMessage {
            message,
            ..Default::default()
        }
        .into(),
        RequestPublishedPluginList => ResponsePublishedPluginListMessage {
            message,
            ..Default::default()
        }
        .into(),
        RequestPublishedPlugin => ResponsePublishedPluginMessage {
            message,
            ..Default::default()
        }
        .into(),
        RequestSourceList => ResponseSourceListMessage {
            message,
            ..Default::default()
        }
        .into(),
        CreateNewSource | UpdateSource | DeleteSource | UpdateSourcePublishState => {
            source_modified(false, message)
        }
        RequestSource => ResponseSourceMessage {
            message,
            ..Default::default()
        }
        .into(),
        RequestResourceList => ResponseResourceListMessage {
            message,
            ..Default::default()
        }
        .into(),
        CreateNewResource | UpdateResource | DeleteResource => resource_modified(false, message),
        RequestResource => ResponseResourceMessage {
            message,
            ..Default::default()
        }
        .into(),
        RequestPublishedResourceList => ResponsePublishedResourceListMessage {
            message,
            ..Default::default()
        }
        .into(),
        RequestPublishedResource => ResponsePublishedResourceMessage {
            message,
            ..Default::default()
        }
        .into(),
        RequestResourceDataList => ResponseResourceDataListMessage {
            message,
            ..Default::default()
        }
        .into(),
        CreateNewResourceData | UpdateResourceData | DeleteResourceData
        | UpdateResourceDataPublishState => resource_data_modified(false, message),
        RequestResourceData => ResponseResourceDataMessage {
            message,
            ..Default::default()
        }
        .into(),
        _ => ServerErrorMessage::new(message).into(),
    }
}

fn developer_modified(modified_developer: bool, message: String) -> Message {
    ResponseDeveloperModificationMessage {
        modified_developer,
        message,
    }
    .into()
}

fn plugin_modified(modified_plugin: bool, message: String) -> Message {
    ResponsePluginModificationMessage {
        modified_plugin,
        message,
    }
    .into()
}

fn source_modified(modified_source: bool, message: String) -> Message {
    ResponseSourceModificationMessage {
        modified_source,
        message,
    }
    .into()
}

fn missing_source(plugin_id: i32, plugin_version: i32) -> Message {
    source_modified(false, format!("Source {plugin_id}/{plugin_version} does not exist"))
}

fn resource_modified(modified_resource: bool, message: String) -> Message {
    ResponseResourceModificationMessage {
        modified_resource,
        message,
    }
    .into()
}

fn resource_data_modified(modified_resource_data: bool, message: String) -> Message {
    ResponseResourceDataModificationMessage {
        modified_resource_data,
        message,
    }
    .into()
}

fn missing_resource_data(resource_id: i32, version: i32) -> Message {
    resource_data_modified(false, format!("Resource data {resource_id}/{version} does not exist"))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempdir::TempDir;

    use super::*;
    use crate::model::{Developer, Plugin, PublishState, Resource, ResourceData, Source};
    use crate::storage::store::testing::{developer, store};

    fn handler(dir: &TempDir) -> ClientHandler {
        let store = store(dir);
        let mut admin = developer("admin", "secret");
        admin.is_admin = true;
        store.create_developer(&admin).unwrap();
        store.create_developer(&developer("alice", "hunter2")).unwrap();
        ClientHandler::new(Arc::new(store), "test-peer")
    }

    fn login(handler: &mut ClientHandler, username: &str, password: &str) -> Reply {
        handler.handle(
            LoginMessage {
                username: username.to_string(),
                password: password.to_string(),
                utc_time: Utc::now(),
            }
            .into(),
        )
    }

    fn respond(handler: &mut ClientHandler, message: impl Into<Message>) -> Message {
        match handler.handle(message.into()) {
            Reply::Respond(response) => response,
            other => panic!("expected a response, got {other:?}"),
        }
    }

    #[test]
    fn login_outcomes() {
        let dir = TempDir::new("handler").unwrap();
        let mut handler = handler(&dir);

        let Reply::Respond(Message::ResponseLogin(denied)) = login(&mut handler, "alice", "nope") else {
            panic!("expected a login response");
        };
        assert!(!denied.login_ok);
        assert!(!handler.is_authenticated());

        let Reply::Respond(Message::ResponseLogin(granted)) = login(&mut handler, "ALICE", "hunter2") else {
            panic!("expected a login response");
        };
        assert!(granted.login_ok);
        assert!(!granted.is_admin);
        assert_eq!(handler.username(), Some("alice"));

        let Reply::Respond(Message::ResponseLogin(admin)) = login(&mut handler, "admin", "secret") else {
            panic!("expected a login response");
        };
        assert!(admin.is_admin);
        assert!(handler.is_admin());
    }

    #[test]
    fn requests_need_login() {
        let dir = TempDir::new("handler").unwrap();
        let mut handler = handler(&dir);

        let response = respond(
            &mut handler,
            CreateNewPluginMessage {
                plugin: Plugin::default(),
            },
        );
        let Message::ResponsePluginModification(denied) = response else {
            panic!("unexpected response {response:?}");
        };
        assert!(!denied.modified_plugin);
        assert!(handler.store.get_plugins(None).unwrap().is_empty());
    }

    #[test]
    fn published_listing_is_anonymous() {
        let dir = TempDir::new("handler").unwrap();
        let mut handler = handler(&dir);
        let id = handler
            .store
            .create_plugin(&Plugin {
                username: "alice".into(),
                name: "Caesar".into(),
                ..Default::default()
            })
            .unwrap();
        handler
            .store
            .create_source(&Source {
                plugin_id: id,
                plugin_version: 1,
                ..Default::default()
            })
            .unwrap();
        handler
            .store
            .update_source_publish_state(id, 1, PublishState::Release)
            .unwrap();

        let response = respond(
            &mut handler,
            RequestPublishedPluginListMessage {
                publish_state: PublishState::Beta,
            },
        );
        let Message::ResponsePublishedPluginList(list) = response else {
            panic!("unexpected response {response:?}");
        };
        assert_eq!(list.plugins_and_sources.len(), 1);
        assert_eq!(list.plugins_and_sources[0].plugin.name, "Caesar");

        let response = respond(
            &mut handler,
            RequestPublishedPluginMessage {
                id: id + 1,
                publish_state: PublishState::Developer,
            },
        );
        let Message::ResponsePublishedPlugin(single) = response else {
            panic!("unexpected response {response:?}");
        };
        assert!(!single.plugin_and_source_exist);
    }

    #[test]
    fn plugin_and_source_flow() {
        let dir = TempDir::new("handler").unwrap();
        let mut handler = handler(&dir);
        login(&mut handler, "alice", "hunter2");

        let response = respond(
            &mut handler,
            CreateNewPluginMessage {
                plugin: Plugin {
                    name: "Enigma".into(),
                    username: "mallory".into(),
                    ..Default::default()
                },
            },
        );
        assert!(matches!(
            response,
            Message::ResponsePluginModification(ResponsePluginModificationMessage {
                modified_plugin: true,
                ..
            })
        ));
        let plugin = handler.store.get_plugins(Some("alice")).unwrap().remove(0);

        let source = Source {
            plugin_id: plugin.id,
            plugin_version: 1,
            publish_state: PublishState::Nightly,
            ..Default::default()
        };
        for message in [
            Message::from(CreateNewSourceMessage {
                source: source.clone(),
            }),
            Message::from(UpdateSourcePublishStateMessage {
                source: source.clone(),
            }),
        ] {
            let response = respond(&mut handler, message);
            let Message::ResponseSourceModification(modified) = response else {
                panic!("unexpected response {response:?}");
            };
            assert!(modified.modified_source, "{}", modified.message);
        }

        let response = respond(
            &mut handler,
            CreateNewSourceMessage {
                source: source.clone(),
            },
        );
        let Message::ResponseSourceModification(duplicate) = response else {
            panic!("unexpected response {response:?}");
        };
        assert!(!duplicate.modified_source);

        let response = respond(
            &mut handler,
            RequestSourceMessage {
                plugin_id: plugin.id,
                plugin_version: 1,
            },
        );
        let Message::ResponseSource(found) = response else {
            panic!("unexpected response {response:?}");
        };
        assert!(found.source_exists);
        assert_eq!(found.source.publish_state, PublishState::Nightly);

        let response = respond(
            &mut handler,
            RequestSourceListMessage {
                plugin_id: 0,
                build_state: "no-such-state".into(),
            },
        );
        let Message::ResponseSourceList(list) = response else {
            panic!("unexpected response {response:?}");
        };
        assert!(!list.allowed_to_view_list);
        assert!(!list.message.is_empty());
    }

    fn source_list_plugins(handler: &mut ClientHandler, plugin_id: i32, build_state: &str) -> Vec<i32> {
        let response = respond(
            handler,
            RequestSourceListMessage {
                plugin_id,
                build_state: build_state.into(),
            },
        );
        let Message::ResponseSourceList(list) = response else {
            panic!("unexpected response {response:?}");
        };
        assert!(list.allowed_to_view_list, "{}", list.message);
        list.source_list.iter().map(|s| s.plugin_id).collect()
    }

    #[test]
    fn source_list_prefers_plugin_id() {
        let dir = TempDir::new("handler").unwrap();
        let mut handler = handler(&dir);
        login(&mut handler, "alice", "hunter2");

        let mut ids = Vec::new();
        for name in ["Caesar", "Enigma"] {
            let id = handler
                .store
                .create_plugin(&Plugin {
                    username: "alice".into(),
                    name: name.into(),
                    ..Default::default()
                })
                .unwrap();
            handler
                .store
                .create_source(&Source {
                    plugin_id: id,
                    plugin_version: 1,
                    build_state: BuildState::Success,
                    ..Default::default()
                })
                .unwrap();
            ids.push(id);
        }

        assert_eq!(source_list_plugins(&mut handler, ids[0], "SUCCESS"), [ids[0]]);
        assert_eq!(source_list_plugins(&mut handler, ids[1], ""), [ids[1]]);
        assert_eq!(source_list_plugins(&mut handler, 0, "SUCCESS"), ids);
        assert_eq!(source_list_plugins(&mut handler, -1, "success"), ids);
        assert!(source_list_plugins(&mut handler, 0, "BUILDING").is_empty());
    }

    fn resource_modified_ok(response: Message) -> bool {
        let Message::ResponseResourceModification(modified) = response else {
            panic!("unexpected response {response:?}");
        };
        modified.modified_resource
    }

    fn resource_data_modified_ok(response: Message) -> bool {
        let Message::ResponseResourceDataModification(modified) = response else {
            panic!("unexpected response {response:?}");
        };
        modified.modified_resource_data
    }

    #[test]
    fn resource_and_resource_data_flow() {
        let dir = TempDir::new("handler").unwrap();
        let mut handler = handler(&dir);
        login(&mut handler, "alice", "hunter2");

        let created = respond(
            &mut handler,
            CreateNewResourceMessage {
                resource: Resource {
                    username: "mallory".into(),
                    name: "wordlist".into(),
                    ..Default::default()
                },
            },
        );
        assert!(resource_modified_ok(created));
        let mut resource = handler.store.get_resources(Some("alice")).unwrap().remove(0);
        assert_eq!(resource.name, "wordlist");

        resource.description = "english words".into();
        assert!(resource_modified_ok(respond(
            &mut handler,
            UpdateResourceMessage {
                resource: resource.clone(),
            },
        )));
        let response = respond(&mut handler, RequestResourceMessage { id: resource.id });
        let Message::ResponseResource(found) = response else {
            panic!("unexpected response {response:?}");
        };
        assert!(found.resource_exists);
        assert_eq!(found.resource.description, "english words");

        let response = respond(&mut handler, RequestResourceMessage { id: resource.id + 1 });
        let Message::ResponseResource(missing) = response else {
            panic!("unexpected response {response:?}");
        };
        assert!(!missing.resource_exists);
        assert!(!resource_modified_ok(respond(
            &mut handler,
            UpdateResourceMessage {
                resource: Resource {
                    id: resource.id + 1,
                    ..Default::default()
                },
            },
        )));

        let data = ResourceData {
            resource_id: resource.id,
            resource_version: 1,
            data_filename: "words.txt".into(),
            publish_state: PublishState::Beta,
            ..Default::default()
        };
        assert!(!resource_data_modified_ok(respond(
            &mut handler,
            CreateNewResourceDataMessage {
                resource_data: ResourceData {
                    resource_id: resource.id + 1,
                    ..data.clone()
                },
            },
        )));
        assert!(resource_data_modified_ok(respond(
            &mut handler,
            CreateNewResourceDataMessage {
                resource_data: data.clone(),
            },
        )));
        assert!(!resource_data_modified_ok(respond(
            &mut handler,
            CreateNewResourceDataMessage {
                resource_data: data.clone(),
            },
        )));
        assert!(resource_data_modified_ok(respond(
            &mut handler,
            UpdateResourceDataPublishStateMessage {
                resource_data: data.clone(),
            },
        )));
        assert!(resource_data_modified_ok(respond(
            &mut handler,
            UpdateResourceDataMessage {
                resource_data: ResourceData {
                    data_filename: "words-v1.txt".into(),
                    ..data.clone()
                },
            },
        )));
        assert!(!resource_data_modified_ok(respond(
            &mut handler,
            UpdateResourceDataPublishStateMessage {
                resource_data: ResourceData {
                    resource_version: 9,
                    ..data.clone()
                },
            },
        )));

        let response = respond(
            &mut handler,
            RequestResourceDataMessage {
                resource_id: resource.id,
                resource_version: 1,
            },
        );
        let Message::ResponseResourceData(found) = response else {
            panic!("unexpected response {response:?}");
        };
        assert!(found.resource_data_exists);
        assert_eq!(found.resource_data.data_filename, "words-v1.txt");
        assert_eq!(found.resource_data.publish_state, PublishState::Beta);

        let response = respond(
            &mut handler,
            RequestResourceDataMessage {
                resource_id: resource.id,
                resource_version: 9,
            },
        );
        let Message::ResponseResourceData(missing) = response else {
            panic!("unexpected response {response:?}");
        };
        assert!(!missing.resource_data_exists);

        let other = handler
            .store
            .create_resource(&Resource {
                username: "bob".into(),
                name: "primes".into(),
                ..Default::default()
            })
            .unwrap();
        handler
            .store
            .create_resource_data(&ResourceData {
                resource_id: other,
                resource_version: 1,
                ..Default::default()
            })
            .unwrap();

        let mut data_list = |resource_id: i32| {
            let response = respond(&mut handler, RequestResourceDataListMessage { resource_id });
            let Message::ResponseResourceDataList(list) = response else {
                panic!("unexpected response {response:?}");
            };
            list.resource_data_list.len()
        };
        assert_eq!(data_list(resource.id), 1);
        assert_eq!(data_list(other), 1);
        assert_eq!(data_list(0), 2);

        let mut anonymous = ClientHandler::new(Arc::clone(&handler.store), "anonymous-peer");
        let response = respond(
            &mut anonymous,
            RequestPublishedResourceListMessage {
                publish_state: PublishState::Nightly,
            },
        );
        let Message::ResponsePublishedResourceList(list) = response else {
            panic!("unexpected response {response:?}");
        };
        assert_eq!(list.resources_and_resource_datas.len(), 1);
        assert_eq!(list.resources_and_resource_datas[0].resource.id, resource.id);

        let response = respond(
            &mut anonymous,
            RequestPublishedResourceMessage {
                id: resource.id,
                publish_state: PublishState::Beta,
            },
        );
        let Message::ResponsePublishedResource(single) = response else {
            panic!("unexpected response {response:?}");
        };
        assert!(single.resource_and_resource_data_exist);
        assert_eq!(single.resource_and_resource_data.resource_data.resource_version, 1);

        let response = respond(
            &mut anonymous,
            RequestPublishedResourceMessage {
                id: resource.id,
                publish_state: PublishState::Release,
            },
        );
        let Message::ResponsePublishedResource(single) = response else {
            panic!("unexpected response {response:?}");
        };
        assert!(!single.resource_and_resource_data_exist);
        assert!(!resource_modified_ok(respond(
            &mut anonymous,
            DeleteResourceMessage {
                resource: resource.clone(),
            },
        )));

        assert!(resource_data_modified_ok(respond(
            &mut handler,
            DeleteResourceDataMessage {
                resource_data: data.clone(),
            },
        )));
        assert!(handler.store.get_resource_data(resource.id, 1).unwrap().is_none());
        assert!(resource_modified_ok(respond(
            &mut handler,
            DeleteResourceMessage {
                resource: resource.clone(),
            },
        )));
        assert!(!resource_modified_ok(respond(
            &mut handler,
            DeleteResourceMessage { resource },
        )));
    }

    #[test]
    fn non_admin_cannot_promote() {
        let dir = TempDir::new("handler").unwrap();
        let mut handler = handler(&dir);
        login(&mut handler, "alice", "hunter2");

        let response = respond(
            &mut handler,
            UpdateDeveloperMessage {
                developer: Developer {
                    username: "alice".into(),
                    firstname: "Alicia".into(),
                    is_admin: true,
                    password: "changed".into(),
                    ..Default::default()
                },
            },
        );
        assert!(matches!(
            response,
            Message::ResponseDeveloperModification(ResponseDeveloperModificationMessage {
                modified_developer: true,
                ..
            })
        ));

        let stored = handler.store.get_developer("alice").unwrap().unwrap();
        assert_eq!(stored.firstname, "Alicia");
        assert!(!stored.is_admin);
        assert!(handler.store.check_developer_password("alice", "changed").unwrap());
    }

    #[test]
    fn developer_listing_hides_passwords() {
        let dir = TempDir::new("handler").unwrap();
        let mut handler = handler(&dir);
        login(&mut handler, "admin", "secret");

        let response = respond(&mut handler, RequestDeveloperListMessage {});
        let Message::ResponseDeveloperList(list) = response else {
            panic!("unexpected response {response:?}");
        };
        assert_eq!(list.developer_list.len(), 2);
        assert!(list.developer_list.iter().all(|d| d.password.is_empty()));
    }

    #[test]
    fn file_transfer_is_refused() {
        let dir = TempDir::new("handler").unwrap();
        let mut handler = handler(&dir);
        login(&mut handler, "alice", "hunter2");

        let response = respond(&mut handler, StopUploadDownloadMessage {});
        assert!(matches!(response, Message::ServerError(_)));
        let response = respond(&mut handler, ServerErrorMessage::new("echo"));
        assert!(matches!(response, Message::ServerError(_)));
    }

    #[test]
    fn logout_and_client_errors() {
        let dir = TempDir::new("handler").unwrap();
        let mut handler = handler(&dir);
        login(&mut handler, "alice", "hunter2");

        let reply = handler.handle(
            ClientErrorMessage {
                message: "bad frame".into(),
            }
            .into(),
        );
        assert_eq!(reply, Reply::Silent);

        let reply = handler.handle(
            LogoutMessage {
                username: "alice".into(),
            }
            .into(),
        );
        assert_eq!(reply, Reply::Close);
        assert!(!handler.is_authenticated());
    }
}
