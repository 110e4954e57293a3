//! Redis shards behind bb8 connection pools.

use async_trait::async_trait;
use bb8::{ErrorSink, Pool, RunError};
use bb8_redis::RedisConnectionManager;
use redis::{Cmd, RedisError, Value};

use super::{HashRing, ShardPool};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

#[derive(Debug, Clone)]
struct ShardErrorSink {
    shard: String,
}

impl ErrorSink<RedisError> for ShardErrorSink {
    fn sink(&self, err: RedisError) {
        tracing::error!(shard = %self.shard, error = %err, "Shard connection pool error");
    }

    fn boxed_clone(&self) -> Box<dyn ErrorSink<RedisError>> {
        Box::new(self.clone())
    }
}

struct Shard {
    name: String,
    pool: Pool<RedisConnectionManager>,
}

/// Pooled connections to standalone Redis shards, keys routed by a
/// consistent hash ring.
pub struct ShardedPool {
    shards: Vec<Shard>,
    ring: HashRing,
}

impl ShardedPool {
    /// Create pools for every configured shard.
    ///
    /// Connections are opened lazily on first use, so an unreachable shard
    /// only surfaces as failed calls routed to it.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty shard list or an unparsable shard url.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        if config.shards.is_empty() {
            return Err(StoreError::Config("no shards configured".to_string()));
        }

        let mut shards = Vec::with_capacity(config.shards.len());
        for spec in &config.shards {
            let manager = RedisConnectionManager::new(spec.url.as_str())?;
            let pool = Pool::builder()
                .max_size(config.pool_size.max(1))
                .connection_timeout(config.connection_timeout)
                .error_sink(Box::new(ShardErrorSink {
                    shard: spec.name.clone(),
                }))
                .build_unchecked(manager);

            tracing::info!(
                shard = %spec.name,
                weight = spec.weight,
                pool_size = config.pool_size,
                "Shard pool created"
            );
            shards.push(Shard {
                name: spec.name.clone(),
                pool,
            });
        }

        let ring = HashRing::new(
            config
                .shards
                .iter()
                .map(|spec| (spec.name.as_str(), spec.weight)),
        );

        Ok(Self { shards, ring })
    }

    /// Name of the shard owning `key`.
    pub fn shard_for(&self, key: &str) -> Option<&str> {
        self.ring
            .locate(key)
            .map(|index| self.shards[index].name.as_str())
    }

    /// Number of configured shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

#[async_trait]
impl ShardPool for ShardedPool {
    async fn execute(&self, key: &str, cmd: &Cmd) -> Result<Value> {
        let index = self
            .ring
            .locate(key)
            .ok_or_else(|| StoreError::Config("no shards configured".to_string()))?;
        let shard = &self.shards[index];

        // The guard returns the connection to the pool when dropped.
        let mut conn = shard.pool.get().await.map_err(|e| match e {
            RunError::User(err) => StoreError::from(err),
            RunError::TimedOut => StoreError::PoolTimeout {
                shard: shard.name.clone(),
            },
        })?;

        let value: Value = cmd.query_async(&mut *conn).await?;
        Ok(value)
    }
}
