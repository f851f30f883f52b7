//! Store entities as they travel inside messages.
//!
//! The composites here are payload shapes themselves, so they nest into
//! message fields and lists without any extra glue. The storage layer maps
//! them to and from table rows.
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::payload;
use crate::protocol::FieldValue;
use crate::protocol::error::{SerializationError, ValueError};

/// Declares a closed enumeration carried on the wire as its 32-bit ordinal
/// and stored in the database as its upper-case name.
macro_rules! ordinal_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$variant_meta:meta])* $variant:ident = $ordinal:literal => $label:literal ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(i32)]
        pub enum $name {
            #[default]
            $( $(#[$variant_meta])* $variant = $ordinal ),*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),* ];

            pub fn ordinal(self) -> i32 {
                self as i32
            }

            pub fn from_ordinal(ordinal: i32) -> Option<Self> {
                match ordinal {
                    $( $ordinal => Some($name::$variant), )*
                    _ => None,
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )*
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_uppercase().as_str() {
                    $( $label => Ok($name::$variant), )*
                    _ => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl FieldValue for $name {
            fn encode_value(&self) -> Result<Vec<u8>, SerializationError> {
                self.ordinal().encode_value()
            }

            fn decode_value(bytes: &[u8]) -> Result<Self, ValueError> {
                let ordinal = i32::decode_value(bytes)?;
                $name::from_ordinal(ordinal).ok_or(ValueError::Ordinal {
                    kind: stringify!($name),
                    value: ordinal,
                })
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{value:?} is not a valid {kind}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

ordinal_enum! {
    /// Visibility level of a source or resource data version, ordered from
    /// least to most released.
    pub enum PublishState {
        NotPublished = 0 => "NOTPUBLISHED",
        Developer = 1 => "DEVELOPER",
        Nightly = 2 => "NIGHTLY",
        Beta = 3 => "BETA",
        Release = 4 => "RELEASE",
    }
}

ordinal_enum! {
    pub enum BuildState {
        Created = 0 => "CREATED",
        Uploaded = 1 => "UPLOADED",
        Building = 2 => "BUILDING",
        Success = 3 => "SUCCESS",
        Error = 4 => "ERROR",
    }
}

impl PublishState {
    /// States a request for `self` may see: `self` and every more released
    /// state. Unpublished versions are never visible, so a request for
    /// [`PublishState::NotPublished`] sees what a developer request sees.
    pub fn cascade(self) -> &'static [PublishState] {
        let visible = &PublishState::ALL[1..];
        let from = (self.ordinal() as usize).max(1) - 1;
        &visible[from..]
    }
}

payload! {
    pub struct Developer {
        pub username: String,
        /// Plaintext, only set when creating a developer or changing a password.
        pub password: String => redacted,
        pub firstname: String,
        pub lastname: String,
        pub email: String,
        pub is_admin: bool,
    }
}

payload! {
    pub struct Plugin {
        pub id: i32,
        pub username: String,
        pub name: String,
        pub short_description: String,
        pub long_description: String,
        pub author_names: String,
        pub author_emails: String,
        pub author_institutes: String,
        pub icon: Vec<u8>,
    }
}

payload! {
    /// One uploaded version of a plugin's source code and its build output.
    pub struct Source {
        pub plugin_id: i32,
        pub plugin_version: i32,
        pub build_version: i32,
        pub zip_file_name: String,
        pub build_state: BuildState,
        pub build_log: String,
        pub assembly_file_name: String,
        pub upload_date: DateTime<Utc>,
        pub build_date: DateTime<Utc>,
        pub publish_state: PublishState,
    }
}

payload! {
    /// A plugin joined with its newest qualifying source.
    pub struct PluginAndSource {
        pub plugin: Plugin,
        pub source: Source,
        /// Size of the assembly file in bytes, filled in by the file service.
        pub file_size: i64,
    }
}

payload! {
    pub struct Resource {
        pub id: i32,
        pub username: String,
        pub name: String,
        pub description: String,
    }
}

payload! {
    pub struct ResourceData {
        pub resource_id: i32,
        pub resource_version: i32,
        pub data_filename: String,
        pub upload_date: DateTime<Utc>,
        pub publish_state: PublishState,
    }
}

payload! {
    pub struct ResourceAndResourceData {
        pub resource: Resource,
        pub resource_data: ResourceData,
        pub file_size: i64,
    }
}

impl Source {
    pub fn has_zip_file(&self) -> bool {
        !self.zip_file_name.is_empty()
    }

    pub fn has_assembly_file(&self) -> bool {
        !self.assembly_file_name.is_empty()
    }
}

impl ResourceData {
    pub fn has_data_file(&self) -> bool {
        !self.data_filename.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::protocol::Payload;

    #[test]
    fn test_publish_state_ordering() {
        assert!(PublishState::NotPublished < PublishState::Developer);
        assert!(PublishState::Nightly < PublishState::Beta);
        assert!(PublishState::Beta < PublishState::Release);
    }

    #[test]
    fn test_cascade() {
        use PublishState::*;
        assert_eq!(Beta.cascade(), &[Beta, Release]);
        assert_eq!(Nightly.cascade(), &[Nightly, Beta, Release]);
        assert_eq!(Release.cascade(), &[Release]);
        assert_eq!(Developer.cascade(), &[Developer, Nightly, Beta, Release]);
        assert_eq!(NotPublished.cascade(), Developer.cascade());
    }

    #[test]
    fn test_names() {
        assert_eq!(PublishState::NotPublished.to_string(), "NOTPUBLISHED");
        assert_eq!("beta".parse::<PublishState>().unwrap(), PublishState::Beta);
        assert_eq!("SUCCESS".parse::<BuildState>().unwrap(), BuildState::Success);
        assert!("SHIPPED".parse::<PublishState>().is_err());
    }

    #[test]
    fn test_ordinal_encoding() {
        assert_eq!(PublishState::Release.encode_value().unwrap(), 4i32.to_le_bytes());
        assert_eq!(
            BuildState::decode_value(&2i32.to_le_bytes()).unwrap(),
            BuildState::Building
        );
        let err = PublishState::decode_value(&9i32.to_le_bytes()).unwrap_err();
        assert!(matches!(err, ValueError::Ordinal { value: 9, .. }));
    }

    #[test]
    fn test_composite_roundtrip() {
        let pair = PluginAndSource {
            plugin: Plugin {
                id: 7,
                username: "alice".to_string(),
                name: "Enigma".to_string(),
                icon: vec![0x89, b'P', b'N', b'G'],
                ..Default::default()
            },
            source: Source {
                plugin_id: 7,
                plugin_version: 3,
                build_state: BuildState::Success,
                upload_date: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
                publish_state: PublishState::Beta,
                ..Default::default()
            },
            file_size: 1 << 33,
        };

        let bytes = pair.to_payload().unwrap();
        assert_eq!(PluginAndSource::from_payload(&bytes).unwrap(), pair);
    }

    #[test]
    fn test_developer_debug_hides_password() {
        let developer = Developer {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
            ..Default::default()
        };
        assert!(!format!("{developer:?}").contains("hunter2"));
    }
}
