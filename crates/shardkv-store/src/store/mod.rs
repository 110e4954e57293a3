//! # Sharded Store
//!
//! Typed facade over a [`ShardPool`]. Every public method issues exactly one
//! command (the bulk helpers loop over single commands) and never returns an
//! error: failures are logged with the operation and key, and the method
//! returns the `Default` of its return type (`false`, `0`, `None`, or an
//! empty collection).

mod hashes;
mod keys;
mod lists;
mod sets;
mod sorted_sets;

#[cfg(test)]
mod tests;

use std::future::Future;
use std::sync::Arc;

use redis::{Cmd, FromRedisValue};

use crate::codec::MapCodec;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::pool::{ShardPool, ShardedPool};

/// Ordering for sorted-set range queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Lowest score first
    #[default]
    Ascending,
    /// Highest score first
    Descending,
}

/// Key-value facade over pooled Redis shards.
pub struct ShardedStore<P = ShardedPool> {
    pool: Arc<P>,
    codec: MapCodec,
}

impl<P> Clone for ShardedStore<P> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            codec: self.codec,
        }
    }
}

impl ShardedStore<ShardedPool> {
    /// Create a store over the configured shards.
    ///
    /// Must be called inside a Tokio runtime; connections open lazily.
    ///
    /// # Errors
    ///
    /// Returns an error if the shard list is empty or a url does not parse.
    pub fn connect(config: &StoreConfig) -> Result<Self> {
        let pool = ShardedPool::new(config)?;
        Ok(Self::new(pool).with_codec(config.map_codec))
    }
}

impl<P: ShardPool> ShardedStore<P> {
    pub fn new(pool: P) -> Self {
        Self::from_shared(Arc::new(pool))
    }

    /// Wrap a pool that other owners keep using.
    pub const fn from_shared(pool: Arc<P>) -> Self {
        Self {
            pool,
            codec: MapCodec::Envelope,
        }
    }

    /// Use `codec` for map-of-object entries.
    #[must_use]
    pub const fn with_codec(mut self, codec: MapCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    pub const fn codec(&self) -> MapCodec {
        self.codec
    }

    /// Issue one command on the shard owning `key` and convert the reply.
    async fn query<T: FromRedisValue>(&self, key: &str, cmd: Cmd) -> Result<T> {
        let value = self.pool.execute(key, &cmd).await?;
        Ok(redis::from_owned_redis_value(value)?)
    }
}

/// Await `op`; on failure log it and hand back `T::default()`.
async fn or_default<T, F>(op: &'static str, key: &str, fut: F) -> T
where
    T: Default,
    F: Future<Output = Result<T>>,
{
    match fut.await {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(op, key, error = %e, "Store operation failed");
            T::default()
        }
    }
}

/// Log and skip a call whose arguments can never succeed.
fn rejected<T: Default>(op: &'static str, key: &str, reason: &str) -> T {
    tracing::warn!(op, key, reason, "Store operation skipped");
    T::default()
}
