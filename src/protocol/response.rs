//! Messages the store server sends back.
//!
//! Every request has a matching response carrying an outcome flag and a
//! human readable `message`, so a logically failed operation still completes
//! the exchange.
use crate::model::{
    Developer, Plugin, PluginAndSource, Resource, ResourceAndResourceData, ResourceData, Source,
};
use crate::payload;

payload! {
    pub struct ResponseLoginMessage {
        pub login_ok: bool,
        pub message: String,
        pub is_admin: bool,
    }
}

payload! {
    pub struct ResponseDeveloperListMessage {
        pub message: String,
        pub allowed_to_view_list: bool,
        pub developer_list: Vec<Developer>,
    }
}

payload! {
    pub struct ResponseDeveloperModificationMessage {
        pub modified_developer: bool,
        pub message: String,
    }
}

payload! {
    pub struct ResponseDeveloperMessage {
        pub developer_exists: bool,
        pub message: String,
        pub developer: Developer,
    }
}

payload! {
    pub struct ResponsePluginListMessage {
        pub message: String,
        pub plugins: Vec<Plugin>,
    }
}

payload! {
    pub struct ResponsePluginModificationMessage {
        pub modified_plugin: bool,
        pub message: String,
    }
}

payload! {
    pub struct ResponsePluginMessage {
        pub message: String,
        pub plugin_exists: bool,
        pub plugin: Plugin,
    }
}

payload! {
    pub struct ResponsePublishedPluginListMessage {
        pub message: String,
        pub plugins_and_sources: Vec<PluginAndSource>,
    }
}

payload! {
    pub struct ResponsePublishedPluginMessage {
        pub message: String,
        pub plugin_and_source_exist: bool,
        pub plugin_and_source: PluginAndSource,
    }
}

payload! {
    pub struct ResponseSourceListMessage {
        pub allowed_to_view_list: bool,
        pub message: String,
        pub source_list: Vec<Source>,
    }
}

payload! {
    pub struct ResponseSourceModificationMessage {
        pub modified_source: bool,
        pub message: String,
    }
}

payload! {
    pub struct ResponseSourceMessage {
        pub message: String,
        pub source_exists: bool,
        pub source: Source,
    }
}

payload! {
    pub struct ResponseResourceListMessage {
        pub allowed_to_view_list: bool,
        pub message: String,
        pub resources: Vec<Resource>,
    }
}

payload! {
    pub struct ResponseResourceModificationMessage {
        pub modified_resource: bool,
        pub message: String,
    }
}

payload! {
    pub struct ResponseResourceMessage {
        pub message: String,
        pub resource_exists: bool,
        pub resource: Resource,
    }
}

payload! {
    pub struct ResponsePublishedResourceListMessage {
        pub message: String,
        pub resources_and_resource_datas: Vec<ResourceAndResourceData>,
    }
}

payload! {
    pub struct ResponsePublishedResourceMessage {
        pub message: String,
        pub resource_and_resource_data_exist: bool,
        pub resource_and_resource_data: ResourceAndResourceData,
    }
}

payload! {
    pub struct ResponseResourceDataListMessage {
        pub allowed_to_view_list: bool,
        pub message: String,
        pub resource_data_list: Vec<ResourceData>,
    }
}

payload! {
    pub struct ResponseResourceDataModificationMessage {
        pub modified_resource_data: bool,
        pub message: String,
    }
}

payload! {
    pub struct ResponseResourceDataMessage {
        pub message: String,
        pub resource_data_exists: bool,
        pub resource_data: ResourceData,
    }
}

payload! {
    pub struct ResponseUploadDownloadDataMessage {
        pub success: bool,
        pub message: String,
    }
}

payload! {
    /// Application level failure on the server side. The connection stays up.
    pub struct ServerErrorMessage {
        pub message: String,
    }
}

impl ServerErrorMessage {
    pub fn new(message: impl Into<String>) -> Self {
        ServerErrorMessage {
            message: message.into(),
        }
    }
}
