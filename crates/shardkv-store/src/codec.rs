//! # Value Codec
//!
//! JSON encoding for stored objects, and the two encodings used to keep a
//! map of objects inside an unordered Redis set (one member per entry).

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{Result, StoreError};

/// Separator used by the delimited map encoding unless configured otherwise.
pub const DEFAULT_SEPARATOR: char = '^';

/// Encode a value as JSON.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decode a JSON value.
pub fn decode<T: DeserializeOwned>(json: &str) -> Result<T> {
    Ok(serde_json::from_str(json)?)
}

#[derive(Serialize)]
struct EntryRef<'a, V> {
    key: &'a str,
    value: &'a V,
}

#[derive(Deserialize)]
struct Entry<V> {
    key: String,
    value: V,
}

/// How a single map entry is turned into a set member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapCodec {
    /// `{"key": <map key>, "value": <json value>}`
    #[default]
    Envelope,
    /// `<json value><separator><map key>`
    ///
    /// Readable by deployments that wrote the delimited format. Keys holding
    /// the separator are rejected on encode.
    Delimited { separator: char },
}

impl MapCodec {
    /// Delimited codec with the default separator.
    pub const fn delimited() -> Self {
        Self::Delimited {
            separator: DEFAULT_SEPARATOR,
        }
    }

    /// Encode one map entry into a set member.
    pub fn encode_entry<V: Serialize>(&self, key: &str, value: &V) -> Result<String> {
        match *self {
            Self::Envelope => encode(&EntryRef { key, value }),
            Self::Delimited { separator } => {
                if key.contains(separator) {
                    return Err(StoreError::InvalidMapKey {
                        key: key.to_string(),
                        separator,
                    });
                }
                let mut member = encode(value)?;
                member.push(separator);
                member.push_str(key);
                Ok(member)
            }
        }
    }

    /// Decode a set member back into its map key and value.
    pub fn decode_entry<V: DeserializeOwned>(&self, member: &str) -> Result<(String, V)> {
        match *self {
            Self::Envelope => {
                let entry: Entry<V> = decode(member)?;
                Ok((entry.key, entry.value))
            }
            Self::Delimited { separator } => {
                // Keys never contain the separator, so the last one splits.
                let (json, key) = member.rsplit_once(separator).ok_or_else(|| {
                    StoreError::Serialization(format!(
                        "map member has no {separator:?} separator"
                    ))
                })?;
                Ok((key.to_string(), decode(json)?))
            }
        }
    }
}
