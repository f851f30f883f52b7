use chrono::{DateTime, Utc};

use super::error::{SerializationError, ValueError};
use super::payload::{ByteReader, Payload};

/// A kind of value that can occupy a named field of a payload.
///
/// Every implementation owns the full byte range of its value; the
/// surrounding record already carries the length.
pub trait FieldValue: Sized {
    fn encode_value(&self) -> Result<Vec<u8>, SerializationError>;
    fn decode_value(bytes: &[u8]) -> Result<Self, ValueError>;
}

pub(crate) fn length_prefix(len: usize) -> Result<[u8; 4], SerializationError> {
    u32::try_from(len)
        .map(u32::to_le_bytes)
        .map_err(|_| SerializationError::LengthOverflow { len })
}

pub(crate) fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N], ValueError> {
    <[u8; N]>::try_from(bytes).map_err(|_| ValueError::Length {
        expected: N,
        actual: bytes.len(),
    })
}

macro_rules! little_endian {
    ($($ty:ty),* $(,)?) => {$(
        impl FieldValue for $ty {
            fn encode_value(&self) -> Result<Vec<u8>, SerializationError> {
                Ok(self.to_le_bytes().to_vec())
            }

            fn decode_value(bytes: &[u8]) -> Result<Self, ValueError> {
                Ok(<$ty>::from_le_bytes(fixed(bytes)?))
            }
        }
    )*};
}

little_endian!(u8, i16, i32, i64, f32, f64);

impl FieldValue for bool {
    fn encode_value(&self) -> Result<Vec<u8>, SerializationError> {
        Ok(vec![u8::from(*self)])
    }

    fn decode_value(bytes: &[u8]) -> Result<Self, ValueError> {
        let [byte] = fixed::<1>(bytes)?;
        Ok(byte != 0)
    }
}

impl FieldValue for String {
    fn encode_value(&self) -> Result<Vec<u8>, SerializationError> {
        Ok(self.as_bytes().to_vec())
    }

    fn decode_value(bytes: &[u8]) -> Result<Self, ValueError> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

impl FieldValue for Vec<u8> {
    fn encode_value(&self) -> Result<Vec<u8>, SerializationError> {
        Ok(self.clone())
    }

    fn decode_value(bytes: &[u8]) -> Result<Self, ValueError> {
        Ok(bytes.to_vec())
    }
}

// Seconds since the epoch followed by the sub-second nanoseconds.
impl FieldValue for DateTime<Utc> {
    fn encode_value(&self) -> Result<Vec<u8>, SerializationError> {
        let mut bytes = Vec::with_capacity(12);
        bytes.extend_from_slice(&self.timestamp().to_le_bytes());
        bytes.extend_from_slice(&self.timestamp_subsec_nanos().to_le_bytes());
        Ok(bytes)
    }

    fn decode_value(bytes: &[u8]) -> Result<Self, ValueError> {
        let raw = fixed::<12>(bytes)?;
        let secs = i64::from_le_bytes(fixed(&raw[..8])?);
        let nanos = u32::from_le_bytes(fixed(&raw[8..])?);
        DateTime::from_timestamp(secs, nanos).ok_or(ValueError::Timestamp)
    }
}

impl<T: Payload> FieldValue for Vec<T> {
    fn encode_value(&self) -> Result<Vec<u8>, SerializationError> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&length_prefix(self.len())?);
        for element in self {
            let encoded = element.to_payload()?;
            bytes.extend_from_slice(&length_prefix(encoded.len())?);
            bytes.extend_from_slice(&encoded);
        }
        Ok(bytes)
    }

    fn decode_value(bytes: &[u8]) -> Result<Self, ValueError> {
        let nested = |err| ValueError::Nested(Box::new(err));
        let mut reader = ByteReader::new(bytes);
        let count = reader.read_u32().map_err(nested)?;

        let mut elements = Vec::new();
        for _ in 0..count {
            let len = reader.read_u32().map_err(nested)? as usize;
            let element = reader.read(len).map_err(nested)?;
            elements.push(T::from_payload(element).map_err(nested)?);
        }
        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_primitive_widths() {
        assert_eq!(true.encode_value().unwrap(), vec![1]);
        assert_eq!(0x0102i16.encode_value().unwrap(), vec![0x02, 0x01]);
        assert_eq!((-1i32).encode_value().unwrap(), vec![0xff; 4]);
        assert_eq!(1i64.encode_value().unwrap().len(), 8);
        assert_eq!(1.5f32.encode_value().unwrap().len(), 4);
        assert_eq!(1.5f64.encode_value().unwrap(), 1.5f64.to_le_bytes().to_vec());
    }

    #[test]
    fn test_bool_nonzero_is_true() {
        assert!(bool::decode_value(&[7]).unwrap());
        assert!(!bool::decode_value(&[0]).unwrap());
    }

    #[test]
    fn test_wrong_width_rejected() {
        let err = i32::decode_value(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, ValueError::Length { expected: 4, actual: 3 }));
        assert!(bool::decode_value(&[]).is_err());
    }

    #[test]
    fn test_string_is_raw_utf8() {
        let value = "grüße".to_string();
        assert_eq!(value.encode_value().unwrap(), "grüße".as_bytes());
        assert_eq!(String::decode_value("grüße".as_bytes()).unwrap(), value);
        assert!(matches!(String::decode_value(&[0xff, 0xfe]), Err(ValueError::Utf8(_))));
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(String::decode_value(&[]).unwrap(), "");
        assert_eq!(Vec::<u8>::decode_value(&[]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_timestamp_keeps_subsecond_precision() {
        let time = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let bytes = time.encode_value().unwrap();
        assert_eq!(bytes.len(), 12);
        assert_eq!(DateTime::<Utc>::decode_value(&bytes).unwrap(), time);
    }

    #[test]
    fn test_timestamp_before_epoch() {
        let time = Utc.with_ymd_and_hms(1969, 7, 20, 20, 17, 40).unwrap();
        let bytes = time.encode_value().unwrap();
        assert_eq!(DateTime::<Utc>::decode_value(&bytes).unwrap(), time);
    }
}
