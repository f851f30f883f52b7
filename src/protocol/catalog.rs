use std::fmt;

use super::error::{DeserializationError, SerializationError};
use super::header::{HEADER_SIZE, MessageHeader};
use super::payload::Payload;
use super::request::*;
use super::response::*;

/// A payload shape with a fixed place in the catalog.
pub trait MessageShape: Payload + Into<Message> {
    const MESSAGE_TYPE: MessageType;

    /// Frames this shape as a complete message without first wrapping it
    /// into a [`Message`].
    fn encode(&self) -> Result<Vec<u8>, SerializationError> {
        frame(Self::MESSAGE_TYPE, &self.to_payload()?)
    }
}

macro_rules! catalog {
    ( $( $variant:ident = $id:literal => $shape:ident ),* $(,)? ) => {
        /// Numeric identifier stamped into every frame header.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum MessageType {
            $( $variant = $id, )*
        }

        impl MessageType {
            pub const ALL: &'static [MessageType] = &[ $( MessageType::$variant, )* ];

            pub fn id(self) -> u32 {
                self as u32
            }

            pub fn name(self) -> &'static str {
                match self {
                    $( MessageType::$variant => stringify!($variant), )*
                }
            }
        }

        impl TryFrom<u32> for MessageType {
            type Error = DeserializationError;

            fn try_from(id: u32) -> Result<Self, Self::Error> {
                match id {
                    $( $id => Ok(MessageType::$variant), )*
                    unknown => Err(DeserializationError::UnknownMessageType(unknown)),
                }
            }
        }

        /// Any message of the catalog.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Message {
            $( $variant($shape), )*
        }

        impl Message {
            /// Blank instance of the shape registered for `message_type`.
            pub fn blank(message_type: MessageType) -> Self {
                match message_type {
                    $( MessageType::$variant => Message::$variant($shape::default()), )*
                }
            }

            pub fn message_type(&self) -> MessageType {
                match self {
                    $( Message::$variant(_) => MessageType::$variant, )*
                }
            }

            fn to_payload(&self) -> Result<Vec<u8>, SerializationError> {
                match self {
                    $( Message::$variant(shape) => shape.to_payload(), )*
                }
            }

            fn decode_payload(&mut self, payload: &[u8]) -> Result<(), DeserializationError> {
                match self {
                    $( Message::$variant(shape) => shape.decode_payload(payload), )*
                }
            }
        }

        $(
            impl MessageShape for $shape {
                const MESSAGE_TYPE: MessageType = MessageType::$variant;
            }

            impl From<$shape> for Message {
                fn from(shape: $shape) -> Self {
                    Message::$variant(shape)
                }
            }
        )*
    };
}

catalog! {
    Login = 0 => LoginMessage,
    ResponseLogin = 1 => ResponseLoginMessage,
    Logout = 2 => LogoutMessage,

    RequestDeveloperList = 100 => RequestDeveloperListMessage,
    ResponseDeveloperList = 101 => ResponseDeveloperListMessage,
    CreateNewDeveloper = 102 => CreateNewDeveloperMessage,
    UpdateDeveloper = 103 => UpdateDeveloperMessage,
    DeleteDeveloper = 104 => DeleteDeveloperMessage,
    ResponseDeveloperModification = 105 => ResponseDeveloperModificationMessage,
    RequestDeveloper = 106 => RequestDeveloperMessage,
    ResponseDeveloper = 107 => ResponseDeveloperMessage,

    RequestPluginList = 200 => RequestPluginListMessage,
    ResponsePluginList = 201 => ResponsePluginListMessage,
    CreateNewPlugin = 202 => CreateNewPluginMessage,
    UpdatePlugin = 203 => UpdatePluginMessage,
    DeletePlugin = 204 => DeletePluginMessage,
    ResponsePluginModification = 205 => ResponsePluginModificationMessage,
    RequestPlugin = 206 => RequestPluginMessage,
    ResponsePlugin = 207 => ResponsePluginMessage,
    RequestPublishedPluginList = 208 => RequestPublishedPluginListMessage,
    ResponsePublishedPluginList = 209 => ResponsePublishedPluginListMessage,
    RequestPublishedPlugin = 210 => RequestPublishedPluginMessage,
    ResponsePublishedPlugin = 211 => ResponsePublishedPluginMessage,

    RequestSourceList = 300 => RequestSourceListMessage,
    ResponseSourceList = 301 => ResponseSourceListMessage,
    CreateNewSource = 302 => CreateNewSourceMessage,
    UpdateSource = 303 => UpdateSourceMessage,
    DeleteSource = 304 => DeleteSourceMessage,
    ResponseSourceModification = 305 => ResponseSourceModificationMessage,
    RequestSource = 306 => RequestSourceMessage,
    ResponseSource = 307 => ResponseSourceMessage,
    UpdateSourcePublishState = 308 => UpdateSourcePublishStateMessage,

    RequestResourceList = 400 => RequestResourceListMessage,
    ResponseResourceList = 401 => ResponseResourceListMessage,
    CreateNewResource = 402 => CreateNewResourceMessage,
    UpdateResource = 403 => UpdateResourceMessage,
    DeleteResource = 404 => DeleteResourceMessage,
    ResponseResourceModification = 405 => ResponseResourceModificationMessage,
    RequestResource = 406 => RequestResourceMessage,
    ResponseResource = 407 => ResponseResourceMessage,
    RequestPublishedResourceList = 408 => RequestPublishedResourceListMessage,
    ResponsePublishedResourceList = 409 => ResponsePublishedResourceListMessage,
    RequestPublishedResource = 410 => RequestPublishedResourceMessage,
    ResponsePublishedResource = 411 => ResponsePublishedResourceMessage,

    RequestResourceDataList = 500 => RequestResourceDataListMessage,
    ResponseResourceDataList = 501 => ResponseResourceDataListMessage,
    CreateNewResourceData = 502 => CreateNewResourceDataMessage,
    UpdateResourceData = 503 => UpdateResourceDataMessage,
    DeleteResourceData = 504 => DeleteResourceDataMessage,
    ResponseResourceDataModification = 505 => ResponseResourceDataModificationMessage,
    RequestResourceData = 506 => RequestResourceDataMessage,
    ResponseResourceData = 507 => ResponseResourceDataMessage,
    UpdateResourceDataPublishState = 508 => UpdateResourceDataPublishStateMessage,

    UploadDownloadData = 600 => UploadDownloadDataMessage,
    ResponseUploadDownloadData = 601 => ResponseUploadDownloadDataMessage,
    StartUploadSourceZipfile = 602 => StartUploadSourceZipfileMessage,
    StartUploadAssemblyZipfile = 603 => StartUploadAssemblyZipfileMessage,
    StartUploadResourceDataFile = 604 => StartUploadResourceDataFileMessage,
    RequestDownloadSourceZipfile = 605 => RequestDownloadSourceZipfileMessage,
    RequestDownloadAssemblyZipfile = 606 => RequestDownloadAssemblyZipfileMessage,
    RequestDownloadResourceDataFile = 607 => RequestDownloadResourceDataFileMessage,
    StopUploadDownload = 608 => StopUploadDownloadMessage,

    ServerError = 900 => ServerErrorMessage,
    ClientError = 901 => ClientErrorMessage,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.id())
    }
}

fn frame(message_type: MessageType, payload: &[u8]) -> Result<Vec<u8>, SerializationError> {
    let header = MessageHeader::new(message_type, payload.len())?;
    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(payload);
    Ok(bytes)
}

impl Message {
    pub fn encode(&self) -> Result<Vec<u8>, SerializationError> {
        frame(self.message_type(), &self.to_payload()?)
    }

    /// Decodes one complete frame. `bytes` must hold exactly the header and
    /// the payload it declares.
    pub fn decode(bytes: &[u8]) -> Result<Self, DeserializationError> {
        let header = MessageHeader::from_bytes(bytes)?;
        let payload = &bytes[HEADER_SIZE..];
        if payload.len() != header.payload_len() {
            return Err(DeserializationError::PayloadSizeMismatch {
                declared: header.payload_len(),
                actual: payload.len(),
            });
        }
        Message::decode_payload_for(header, payload)
    }

    /// Builds the shape named by an already validated header from its payload.
    pub fn decode_payload_for(
        header: MessageHeader,
        payload: &[u8],
    ) -> Result<Self, DeserializationError> {
        let mut message = Message::blank(header.message_type);
        message.decode_payload(payload)?;
        Ok(message)
    }
}

pub fn encode_message<M: MessageShape>(message: &M) -> Result<Vec<u8>, SerializationError> {
    message.encode()
}
