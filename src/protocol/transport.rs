use std::io::{self, Read, Write};

use log::trace;
use thiserror::Error;

use crate::config::DEFAULT_MAX_PAYLOAD_SIZE;

use super::error::{DeserializationError, SerializationError};
use super::header::{HEADER_SIZE, MessageHeader};
use super::{Message, MessageShape};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode message: {0}")]
    Serialize(#[from] SerializationError),
    #[error("failed to decode message: {0}")]
    Deserialize(#[from] DeserializationError),
    #[error("peer announced a payload of {size} bytes, limit is {limit}")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("Transport IO Error: {0}")]
    Io(#[from] io::Error),
}

/// Moves framed messages over an already connected byte stream.
pub struct MessageTransport<T: Read + Write> {
    stream: T,
    max_payload_size: usize,
}

impl<T: Read + Write> MessageTransport<T> {
    pub fn new(stream: T) -> Self {
        Self {
            stream,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }

    pub fn with_max_payload_size(mut self, max_payload_size: usize) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }

    pub fn write_message(&mut self, message: &Message) -> Result<(), TransportError> {
        let bytes = message.encode()?;
        trace!("sending {} ({} bytes)", message.message_type(), bytes.len());
        self.stream.write_all(&bytes)?;
        self.stream.flush()?;
        Ok(())
    }

    pub fn write_shape<M: MessageShape>(&mut self, shape: &M) -> Result<(), TransportError> {
        let bytes = shape.encode()?;
        trace!("sending {} ({} bytes)", M::MESSAGE_TYPE, bytes.len());
        self.stream.write_all(&bytes)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Reads the next frame. Returns `Ok(None)` when the peer closed the
    /// stream cleanly between frames.
    pub fn read_message(&mut self) -> Result<Option<Message>, TransportError> {
        let mut header_bytes = [0u8; HEADER_SIZE];
        let mut filled = 0;
        while filled < HEADER_SIZE {
            match self.stream.read(&mut header_bytes[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(DeserializationError::HeaderTooShort { got: filled }.into());
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let header = MessageHeader::from_bytes(&header_bytes)?;
        if header.payload_len() > self.max_payload_size {
            return Err(TransportError::PayloadTooLarge {
                size: header.payload_len(),
                limit: self.max_payload_size,
            });
        }

        let mut payload = vec![0u8; header.payload_len()];
        self.stream.read_exact(&mut payload)?;
        trace!("received {} ({} bytes)", header.message_type, payload.len());

        Ok(Some(Message::decode_payload_for(header, &payload)?))
    }

    pub fn into_inner(self) -> T {
        self.stream
    }
}
