//! Messages a client sends to the store server.
use chrono::{DateTime, Utc};

use crate::model::{Developer, Plugin, PublishState, Resource, ResourceData, Source};
use crate::payload;

payload! {
    pub struct LoginMessage {
        pub username: String,
        pub password: String => redacted,
        pub utc_time: DateTime<Utc>,
    }
}

payload! {
    pub struct LogoutMessage {
        pub username: String,
    }
}

payload! {
    pub struct RequestDeveloperListMessage {}
}

payload! {
    pub struct CreateNewDeveloperMessage {
        pub developer: Developer,
    }
}

payload! {
    pub struct UpdateDeveloperMessage {
        pub developer: Developer,
    }
}

payload! {
    pub struct DeleteDeveloperMessage {
        pub developer: Developer,
    }
}

payload! {
    pub struct RequestDeveloperMessage {
        pub username: String,
    }
}

payload! {
    /// An empty `username` lists the plugins of every developer.
    pub struct RequestPluginListMessage {
        pub username: String,
    }
}

payload! {
    pub struct CreateNewPluginMessage {
        pub plugin: Plugin,
    }
}

payload! {
    pub struct UpdatePluginMessage {
        pub plugin: Plugin,
    }
}

payload! {
    pub struct DeletePluginMessage {
        pub plugin: Plugin,
    }
}

payload! {
    pub struct RequestPluginMessage {
        pub id: i32,
    }
}

payload! {
    pub struct RequestPublishedPluginListMessage {
        pub publish_state: PublishState,
    }
}

payload! {
    pub struct RequestPublishedPluginMessage {
        pub id: i32,
        pub publish_state: PublishState,
    }
}

payload! {
    /// Lists the sources of one plugin. Without a plugin id (zero or
    /// negative) a non-empty `build_state` lists every source in that build
    /// state instead.
    pub struct RequestSourceListMessage {
        pub plugin_id: i32,
        pub build_state: String,
    }
}

payload! {
    pub struct CreateNewSourceMessage {
        pub source: Source,
    }
}

payload! {
    pub struct UpdateSourceMessage {
        pub source: Source,
    }
}

payload! {
    pub struct DeleteSourceMessage {
        pub source: Source,
    }
}

payload! {
    pub struct RequestSourceMessage {
        pub plugin_id: i32,
        pub plugin_version: i32,
    }
}

payload! {
    pub struct UpdateSourcePublishStateMessage {
        pub source: Source,
    }
}

payload! {
    pub struct RequestResourceListMessage {
        pub username: String,
    }
}

payload! {
    pub struct CreateNewResourceMessage {
        pub resource: Resource,
    }
}

payload! {
    pub struct UpdateResourceMessage {
        pub resource: Resource,
    }
}

payload! {
    pub struct DeleteResourceMessage {
        pub resource: Resource,
    }
}

payload! {
    pub struct RequestResourceMessage {
        pub id: i32,
    }
}

payload! {
    pub struct RequestPublishedResourceListMessage {
        pub publish_state: PublishState,
    }
}

payload! {
    pub struct RequestPublishedResourceMessage {
        pub id: i32,
        pub publish_state: PublishState,
    }
}

payload! {
    /// A `resource_id` of zero lists the data of every resource.
    pub struct RequestResourceDataListMessage {
        pub resource_id: i32,
    }
}

payload! {
    pub struct CreateNewResourceDataMessage {
        pub resource_data: ResourceData,
    }
}

payload! {
    pub struct UpdateResourceDataMessage {
        pub resource_data: ResourceData,
    }
}

payload! {
    pub struct DeleteResourceDataMessage {
        pub resource_data: ResourceData,
    }
}

payload! {
    pub struct RequestResourceDataMessage {
        pub resource_id: i32,
        pub resource_version: i32,
    }
}

payload! {
    pub struct UpdateResourceDataPublishStateMessage {
        pub resource_data: ResourceData,
    }
}

payload! {
    /// One chunk of a file transfer, sent in either direction.
    pub struct UploadDownloadDataMessage {
        pub file_size: i64,
        pub offset: i64,
        pub data: Vec<u8>,
    }
}

payload! {
    pub struct StartUploadSourceZipfileMessage {
        pub source: Source,
        pub file_size: i64,
    }
}

payload! {
    pub struct StartUploadAssemblyZipfileMessage {
        pub source: Source,
        pub file_size: i64,
    }
}

payload! {
    pub struct StartUploadResourceDataFileMessage {
        pub resource_data: ResourceData,
        pub file_size: i64,
    }
}

payload! {
    pub struct RequestDownloadSourceZipfileMessage {
        pub source: Source,
    }
}

payload! {
    pub struct RequestDownloadAssemblyZipfileMessage {
        pub source: Source,
    }
}

payload! {
    pub struct RequestDownloadResourceDataFileMessage {
        pub resource_data: ResourceData,
    }
}

payload! {
    pub struct StopUploadDownloadMessage {}
}

payload! {
    pub struct ClientErrorMessage {
        pub message: String,
    }
}
