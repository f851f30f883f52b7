use super::MessageType;
use super::error::{DeserializationError, SerializationError};
use super::field::length_prefix;

/// Identifies a frame as belonging to this protocol.
pub const MAGIC: &[u8; 13] = b"DEPOT-PROTO-1";

pub const HEADER_SIZE: usize = MAGIC.len() + 4 + 4;

const TYPE_OFFSET: usize = MAGIC.len();
const SIZE_OFFSET: usize = TYPE_OFFSET + 4;

/// Fixed-size prefix of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub message_type: MessageType,
    pub payload_size: u32,
}

impl MessageHeader {
    pub fn new(message_type: MessageType, payload_size: usize) -> Result<Self, SerializationError> {
        Ok(MessageHeader {
            message_type,
            payload_size: u32::from_le_bytes(length_prefix(payload_size)?),
        })
    }

    pub fn payload_len(&self) -> usize {
        self.payload_size as usize
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[..TYPE_OFFSET].copy_from_slice(MAGIC);
        bytes[TYPE_OFFSET..SIZE_OFFSET].copy_from_slice(&self.message_type.id().to_le_bytes());
        bytes[SIZE_OFFSET..].copy_from_slice(&self.payload_size.to_le_bytes());
        bytes
    }

    /// Parses the header at the start of `bytes`. Anything after the first
    /// [`HEADER_SIZE`] bytes is ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeserializationError> {
        if bytes.len() < HEADER_SIZE {
            return Err(DeserializationError::HeaderTooShort { got: bytes.len() });
        }

        let magic = &bytes[..TYPE_OFFSET];
        if magic != MAGIC {
            return Err(DeserializationError::MagicMismatch {
                got: String::from_utf8_lossy(magic).into_owned(),
            });
        }

        let message_type = MessageType::try_from(le_u32(&bytes[TYPE_OFFSET..SIZE_OFFSET]))?;
        let payload_size = le_u32(&bytes[SIZE_OFFSET..HEADER_SIZE]);

        Ok(MessageHeader {
            message_type,
            payload_size,
        })
    }
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(bytes);
    u32::from_le_bytes(word)
}
