//! # Pool Module
//!
//! Connection sources the store runs commands against.
//!
//! - `ShardedPool` - one bb8 pool per Redis shard, keys routed by `HashRing`
//! - `MemoryPool` - in-process command interpreter, no server required

pub mod memory;
pub mod ring;
pub mod sharded;

use async_trait::async_trait;
use redis::{Cmd, Value};

use crate::error::Result;

pub use memory::MemoryPool;
pub use ring::HashRing;
pub use sharded::ShardedPool;

/// Runs single commands on the shard that owns a key.
///
/// Implementations acquire a connection, issue `cmd`, and release the
/// connection before returning, whatever the outcome.
#[async_trait]
pub trait ShardPool: Send + Sync {
    /// Execute `cmd` on the shard owning `key` and return the raw reply.
    async fn execute(&self, key: &str, cmd: &Cmd) -> Result<Value>;
}
