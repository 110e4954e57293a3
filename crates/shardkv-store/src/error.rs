//! Store error types

use thiserror::Error;

/// Errors raised below the facade boundary.
///
/// The public `ShardedStore` methods never surface these; they log them and
/// fall back to a default. Pool implementations and the codec return them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Timed out acquiring a connection for shard {shard}")]
    PoolTimeout { shard: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Map key {key:?} contains the entry separator {separator:?}")]
    InvalidMapKey { key: String, separator: char },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        Self::Redis(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
