//! # ShardKV Store
//!
//! Typed key-value facade over a consistently-hashed set of Redis shards.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Application Layer                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ShardedStore                            │
//! │   strings · objects · lists · sets · maps · hashes · zsets   │
//! │        (failures logged, defaults returned to caller)        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │  ShardPool::execute(key, cmd)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ShardedPool                             │
//! │        HashRing (ketama/md5) → one bb8 pool per shard        │
//! └─────────────────────────────────────────────────────────────┘
//!          │                   │                    │
//!          ▼                   ▼                    ▼
//!    ┌──────────┐        ┌──────────┐         ┌──────────┐
//!    │ Redis #1 │        │ Redis #2 │   ...   │ Redis #N │
//!    └──────────┘        └──────────┘         └──────────┘
//! ```
//!
//! [`MemoryPool`] stands in for [`ShardedPool`] when no server is available.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shardkv_store::{ShardedStore, StoreConfig};
//!
//! let config = StoreConfig::from_env()?;
//! let store = ShardedStore::connect(&config)?;
//!
//! store.set_ex("session:42", "token", 3600).await;
//! let profile: Option<Profile> = store.get_object("profile:42").await;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod config;
pub mod error;
pub mod pool;
pub mod store;

// Re-export commonly used types
pub use codec::MapCodec;
pub use config::{ShardSpec, StoreConfig};
pub use error::{Result, StoreError};
pub use pool::{HashRing, MemoryPool, ShardPool, ShardedPool};
pub use store::{Order, ShardedStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
