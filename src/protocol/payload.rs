use super::error::{DeserializationError, SerializationError};
use super::field::{FieldValue, length_prefix};

/// A named-field record set: the body of a message or of a nested composite.
///
/// Implementations are generated by [`payload!`](crate::payload), which ties
/// each field name to its declared kind at compile time.
pub trait Payload: Default {
    /// Shape name used in error reports.
    const SHAPE: &'static str;

    fn encode_fields(&self, writer: &mut PayloadWriter) -> Result<(), SerializationError>;

    /// Assigns a single decoded record to the field called `name`.
    fn decode_field(&mut self, name: &str, value: &[u8]) -> Result<(), DeserializationError>;

    fn to_payload(&self) -> Result<Vec<u8>, SerializationError> {
        let mut writer = PayloadWriter::new(Self::SHAPE);
        self.encode_fields(&mut writer)?;
        Ok(writer.finish())
    }

    /// Walks every record of `payload` in order. Fields without a record keep
    /// their current value.
    fn decode_payload(&mut self, payload: &[u8]) -> Result<(), DeserializationError> {
        let mut reader = ByteReader::new(payload);
        while !reader.is_empty() {
            let name_len = reader.read_u32()? as usize;
            let name = std::str::from_utf8(reader.read(name_len)?)
                .map_err(|_| DeserializationError::InvalidFieldName)?;
            let value_len = reader.read_u32()? as usize;
            let value = reader.read(value_len)?;
            self.decode_field(name, value)?;
        }
        Ok(())
    }

    fn from_payload(payload: &[u8]) -> Result<Self, DeserializationError> {
        let mut shape = Self::default();
        shape.decode_payload(payload)?;
        Ok(shape)
    }
}

pub struct PayloadWriter {
    shape: &'static str,
    buf: Vec<u8>,
}

impl PayloadWriter {
    pub fn new(shape: &'static str) -> Self {
        PayloadWriter {
            shape,
            buf: Vec::new(),
        }
    }

    pub fn field<V: FieldValue>(
        &mut self,
        name: &'static str,
        value: &V,
    ) -> Result<(), SerializationError> {
        let shape = self.shape;
        let context = |source| SerializationError::Field {
            shape,
            field: name,
            source: Box::new(source),
        };

        let encoded = value.encode_value().map_err(context)?;
        let name_len = length_prefix(name.len()).map_err(context)?;
        let value_len = length_prefix(encoded.len()).map_err(context)?;

        self.buf.extend_from_slice(&name_len);
        self.buf.extend_from_slice(name.as_bytes());
        self.buf.extend_from_slice(&value_len);
        self.buf.extend_from_slice(&encoded);
        Ok(())
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked cursor over an encoded buffer.
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        ByteReader { bytes, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn read(&mut self, len: usize) -> Result<&'a [u8], DeserializationError> {
        let remaining = self.bytes.len() - self.pos;
        if len > remaining {
            return Err(DeserializationError::Truncated {
                needed: len,
                remaining,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u32(&mut self) -> Result<u32, DeserializationError> {
        let mut word = [0u8; 4];
        word.copy_from_slice(self.read(4)?);
        Ok(u32::from_le_bytes(word))
    }
}

/// Declares a payload shape: a plain struct plus its [`Payload`] codec, a
/// [`FieldValue`] impl so it can nest inside other shapes, and a `Debug`
/// impl. Fields followed by `=> redacted` print as `<redacted>`.
///
/// ```ignore
/// payload! {
///     pub struct Credentials {
///         pub username: String,
///         pub password: String => redacted,
///     }
/// }
/// ```
#[macro_export]
macro_rules! payload {
    (@debug $value:expr) => {
        &$value
    };
    (@debug $value:expr, redacted) => {
        &"<redacted>"
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty $(=> $redact:ident)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Default, PartialEq)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::protocol::Payload for $name {
            const SHAPE: &'static str = stringify!($name);

            #[allow(unused_variables)]
            fn encode_fields(
                &self,
                writer: &mut $crate::protocol::PayloadWriter,
            ) -> Result<(), $crate::protocol::error::SerializationError> {
                $( writer.field(stringify!($field), &self.$field)?; )*
                Ok(())
            }

            #[allow(unused_variables)]
            fn decode_field(
                &mut self,
                name: &str,
                value: &[u8],
            ) -> Result<(), $crate::protocol::error::DeserializationError> {
                match name {
                    $(
                        stringify!($field) => {
                            self.$field = <$ty as $crate::protocol::FieldValue>::decode_value(value)
                                .map_err(|source| {
                                    $crate::protocol::error::DeserializationError::InvalidValue {
                                        shape: Self::SHAPE,
                                        field: stringify!($field),
                                        source,
                                    }
                                })?;
                            Ok(())
                        }
                    )*
                    _ => Err($crate::protocol::error::DeserializationError::UnknownField {
                        shape: Self::SHAPE,
                        name: name.to_string(),
                    }),
                }
            }
        }

        impl $crate::protocol::FieldValue for $name {
            fn encode_value(&self) -> Result<Vec<u8>, $crate::protocol::error::SerializationError> {
                $crate::protocol::Payload::to_payload(self)
            }

            fn decode_value(bytes: &[u8]) -> Result<Self, $crate::protocol::error::ValueError> {
                <Self as $crate::protocol::Payload>::from_payload(bytes)
                    .map_err(|err| $crate::protocol::error::ValueError::Nested(Box::new(err)))
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(stringify!($name))
                    $( .field(stringify!($field), $crate::payload!(@debug self.$field $(, $redact)?)) )*
                    .finish()
            }
        }
    };
}
