//! Client-server communication protocol.
//!
//! This module defines the message protocol spoken between store clients and the
//! store server: the frame layout, the field-level payload codec, the closed
//! catalog of message shapes, and a transport that moves frames over any
//! already-connected byte stream.
//!
//! # Overview
//!
//! A caller builds a message shape (for example [`request::LoginMessage`]),
//! encodes it into a frame, and hands the bytes to a transport. The receiver
//! reads the header, resolves the type identifier through the catalog into a
//! blank [`Message`] of the right shape, and fills it field by field from the
//! payload.
//!
//! # Binary Format
//!
//! ```text
//! Header:  magic[13] | typeId[4] | payloadLength[4]
//! Payload: repeated { nameLen[4] | name[nameLen] | valueLen[4] | value[valueLen] }
//! List:    count[4] | repeated { elemLen[4] | elem[elemLen] }
//! ```
//!
//! - All integers are little-endian.
//! - Field records may appear in any order; the decoder matches them by name.
//! - A value is interpreted by the declared kind of the field it lands in, so
//!   both peers must agree on every shape.
//! - Nested composites are payloads themselves, so the same record format
//!   applies recursively.
//!
//! # Key Components
//!
//! - [`MessageHeader`]: fixed 21-byte frame header.
//! - [`FieldValue`]: per-kind value codecs.
//! - [`Payload`]: named-field codec implemented by every shape via [`payload!`](crate::payload).
//! - [`Message`] / [`MessageType`]: the catalog.
//! - [`MessageTransport`]: frame reader/writer over a `Read + Write` stream.
//! - [`StoreServer`]: TCP accept loop dispatching to a [`ClientHandler`] per connection.
//!
//! # See Also
//!
//! - [`storage`](crate::storage): Data layer that ultimately serves protocol requests.
mod catalog;
mod field;
mod handler;
mod header;
mod payload;
pub mod request;
pub mod response;
mod server;
mod thread;
mod transport;

use thread::ThreadPool;

pub use catalog::{Message, MessageShape, MessageType, encode_message};
pub use field::FieldValue;
pub use handler::{ClientHandler, Reply};
pub use header::{HEADER_SIZE, MAGIC, MessageHeader};
pub use payload::{Payload, PayloadWriter};
pub use server::StoreServer;
pub use transport::{MessageTransport, TransportError};

pub mod error {
    use thiserror::Error;

    use super::HEADER_SIZE;

    #[derive(Debug, Error)]
    pub enum SerializationError {
        #[error("length {len} does not fit into a 4-byte length field")]
        LengthOverflow { len: usize },

        #[error("[{shape}.{field}] {source}")]
        Field {
            shape: &'static str,
            field: &'static str,
            source: Box<SerializationError>,
        },
    }

    /// Reasons a single value cannot be read back as its declared kind.
    #[derive(Debug, Error)]
    pub enum ValueError {
        #[error("expected {expected} bytes, got {actual}")]
        Length { expected: usize, actual: usize },

        #[error("invalid utf-8: {0}")]
        Utf8(#[from] std::string::FromUtf8Error),

        #[error("{value} is not a valid {kind}")]
        Ordinal { kind: &'static str, value: i32 },

        #[error("timestamp out of range")]
        Timestamp,

        #[error("{0}")]
        Nested(Box<DeserializationError>),
    }

    #[derive(Debug, Error)]
    pub enum DeserializationError {
        #[error("message header too small: got {got} bytes but expect at least {HEADER_SIZE}")]
        HeaderTooShort { got: usize },

        #[error("magic number mismatch: got {got:?}")]
        MagicMismatch { got: String },

        #[error("message type {0} is not defined in the catalog")]
        UnknownMessageType(u32),

        #[error("header declares {declared} payload bytes but {actual} are present")]
        PayloadSizeMismatch { declared: usize, actual: usize },

        #[error("unexpected end of data: needed {needed} bytes, {remaining} remaining")]
        Truncated { needed: usize, remaining: usize },

        #[error("field name is not valid utf-8")]
        InvalidFieldName,

        #[error("cannot find any field named {name:?} on {shape}")]
        UnknownField { shape: &'static str, name: String },

        #[error("[{shape}.{field}] {source}")]
        InvalidValue {
            shape: &'static str,
            field: &'static str,
            source: ValueError,
        },
    }

    impl DeserializationError {
        /// Framing errors mean the bytes are not a frame of this protocol at
        /// all; the remaining kinds mean the peers disagree on a shape.
        pub fn is_framing(&self) -> bool {
            matches!(
                self,
                DeserializationError::HeaderTooShort { .. }
                    | DeserializationError::MagicMismatch { .. }
                    | DeserializationError::UnknownMessageType(_)
                    | DeserializationError::PayloadSizeMismatch { .. }
            )
        }
    }
}
