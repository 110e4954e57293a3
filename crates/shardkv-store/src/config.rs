//! # Store Configuration
//!
//! Environment-based configuration for the shard pools and map encoding.

use std::env;
use std::time::Duration;

use crate::codec::{DEFAULT_SEPARATOR, MapCodec};
use crate::error::{Result, StoreError};
use crate::pool::ring::MAX_WEIGHT;

/// One Redis shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSpec {
    /// Ring identity; renaming a shard moves its keys
    pub name: String,
    pub url: String,
    pub weight: u32,
}

impl ShardSpec {
    /// Parse `[name=]url[*weight]`. The name defaults to the url.
    pub fn parse(entry: &str) -> Result<Self> {
        let entry = entry.trim();
        let (name, rest) = match entry.split_once('=') {
            Some((name, rest)) if !name.contains("://") => (Some(name.trim()), rest.trim()),
            _ => (None, entry),
        };

        // Only an all-digit suffix is a weight; `*` may also appear in a password.
        let (url, weight) = match rest.rsplit_once('*') {
            Some((url, weight))
                if !weight.trim().is_empty()
                    && weight.trim().bytes().all(|b| b.is_ascii_digit()) =>
            {
                let weight = weight.trim().parse::<u32>().map_err(|_| {
                    StoreError::Config(format!("invalid shard weight in {entry:?}"))
                })?;
                (url.trim(), weight)
            }
            _ => (rest, 1),
        };

        if url.is_empty() {
            return Err(StoreError::Config(format!("missing shard url in {entry:?}")));
        }
        if weight == 0 {
            return Err(StoreError::Config(format!(
                "shard weight must be positive in {entry:?}"
            )));
        }
        if weight > MAX_WEIGHT {
            return Err(StoreError::Config(format!(
                "shard weight above {MAX_WEIGHT} in {entry:?}"
            )));
        }

        Ok(Self {
            name: name.unwrap_or(url).to_string(),
            url: url.to_string(),
            weight,
        })
    }
}

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub shards: Vec<ShardSpec>,

    /// Maximum pooled connections per shard
    pub pool_size: u32,

    /// How long a call may wait for a pooled connection
    pub connection_timeout: Duration,

    /// Encoding of map entries stored as set members
    pub map_codec: MapCodec,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shards: vec![ShardSpec {
                name: "redis://127.0.0.1:6379".to_string(),
                url: "redis://127.0.0.1:6379".to_string(),
                weight: 1,
            }],
            pool_size: 10,
            connection_timeout: Duration::from_millis(5000),
            map_codec: MapCodec::Envelope,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` when a variable is present but malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let shards = match lookup("REDIS_SHARDS") {
            Some(list) => list
                .split(',')
                .filter(|entry| !entry.trim().is_empty())
                .map(ShardSpec::parse)
                .collect::<Result<Vec<_>>>()?,
            None => defaults.shards,
        };
        if shards.is_empty() {
            return Err(StoreError::Config("REDIS_SHARDS lists no shards".to_string()));
        }

        let pool_size = match lookup("REDIS_POOL_SIZE") {
            Some(v) => v
                .parse()
                .map_err(|_| StoreError::Config(format!("invalid REDIS_POOL_SIZE {v:?}")))?,
            None => defaults.pool_size,
        };

        let connection_timeout = match lookup("REDIS_CONNECT_TIMEOUT_MS") {
            Some(v) => Duration::from_millis(v.parse().map_err(|_| {
                StoreError::Config(format!("invalid REDIS_CONNECT_TIMEOUT_MS {v:?}"))
            })?),
            None => defaults.connection_timeout,
        };

        let separator = match lookup("MAP_SEPARATOR") {
            Some(v) => {
                let mut chars = v.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => {
                        return Err(StoreError::Config(format!(
                            "MAP_SEPARATOR must be one character, got {v:?}"
                        )));
                    }
                }
            }
            None => DEFAULT_SEPARATOR,
        };

        let map_codec = match lookup("MAP_CODEC").as_deref() {
            None | Some("envelope") => MapCodec::Envelope,
            Some("delimited") => MapCodec::Delimited { separator },
            Some(other) => {
                return Err(StoreError::Config(format!("unknown MAP_CODEC {other:?}")));
            }
        };

        Ok(Self {
            shards,
            pool_size,
            connection_timeout,
            map_codec,
        })
    }
}
