//! Scalar strings, JSON objects, counters and key expiry.

use redis::cmd;
use serde::{Serialize, de::DeserializeOwned};

use super::{ShardedStore, or_default, rejected};
use crate::codec;
use crate::pool::ShardPool;

impl<P: ShardPool> ShardedStore<P> {
    // =========================================================================
    // STRINGS
    // =========================================================================

    /// SET `key` to `value`. True once the write is acknowledged.
    pub async fn set(&self, key: &str, value: &str) -> bool {
        or_default("set", key, async {
            let mut c = cmd("SET");
            c.arg(key).arg(value);
            self.query::<()>(key, c).await.map(|()| true)
        })
        .await
    }

    /// SETEX: store `value` and expire it after `seconds`.
    pub async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> bool {
        or_default("set_ex", key, async {
            let mut c = cmd("SETEX");
            c.arg(key).arg(seconds).arg(value);
            self.query::<()>(key, c).await.map(|()| true)
        })
        .await
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        or_default("get", key, async {
            let mut c = cmd("GET");
            c.arg(key);
            self.query(key, c).await
        })
        .await
    }

    // =========================================================================
    // JSON OBJECTS
    // =========================================================================

    /// Store `value` as JSON.
    pub async fn set_object<T: Serialize>(&self, key: &str, value: &T) -> bool {
        or_default("set_object", key, async {
            let json = codec::encode(value)?;
            let mut c = cmd("SET");
            c.arg(key).arg(json);
            self.query::<()>(key, c).await.map(|()| true)
        })
        .await
    }

    /// Store `value` as JSON, expiring after `seconds`.
    pub async fn set_object_ex<T: Serialize>(&self, key: &str, value: &T, seconds: u64) -> bool {
        or_default("set_object_ex", key, async {
            let json = codec::encode(value)?;
            let mut c = cmd("SETEX");
            c.arg(key).arg(seconds).arg(json);
            self.query::<()>(key, c).await.map(|()| true)
        })
        .await
    }

    /// Read a JSON value. `None` when missing or when it does not decode as `T`.
    pub async fn get_object<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        or_default("get_object", key, async {
            let mut c = cmd("GET");
            c.arg(key);
            match self.query::<Option<String>>(key, c).await? {
                Some(json) => Ok(Some(codec::decode(&json)?)),
                None => Ok(None),
            }
        })
        .await
    }

    // =========================================================================
    // KEYS
    // =========================================================================

    /// DEL `key`. True when the command ran, whether or not the key existed.
    pub async fn del(&self, key: &str) -> bool {
        or_default("del", key, async {
            let mut c = cmd("DEL");
            c.arg(key);
            self.query::<i64>(key, c).await.map(|_| true)
        })
        .await
    }

    pub async fn exists(&self, key: &str) -> bool {
        or_default("exists", key, async {
            let mut c = cmd("EXISTS");
            c.arg(key);
            self.query(key, c).await
        })
        .await
    }

    /// Expire `key` after `seconds`. False when the key does not exist.
    pub async fn expire(&self, key: &str, seconds: i64) -> bool {
        if key.is_empty() {
            return rejected("expire", key, "empty key");
        }
        or_default("expire", key, async {
            let mut c = cmd("EXPIRE");
            c.arg(key).arg(seconds);
            self.query(key, c).await
        })
        .await
    }

    /// Expire `key` at `unix_seconds`. False when the key does not exist.
    pub async fn expire_at(&self, key: &str, unix_seconds: i64) -> bool {
        if key.is_empty() {
            return rejected("expire_at", key, "empty key");
        }
        or_default("expire_at", key, async {
            let mut c = cmd("EXPIREAT");
            c.arg(key).arg(unix_seconds);
            self.query(key, c).await
        })
        .await
    }

    /// Remaining time to live in seconds; `None` for a missing key or one
    /// without expiry.
    pub async fn ttl(&self, key: &str) -> Option<i64> {
        or_default("ttl", key, async {
            let mut c = cmd("TTL");
            c.arg(key);
            let ttl: i64 = self.query(key, c).await?;
            Ok((ttl >= 0).then_some(ttl))
        })
        .await
    }

    // =========================================================================
    // COUNTERS
    // =========================================================================

    /// INCR; 0 on failure.
    pub async fn incr(&self, key: &str) -> i64 {
        or_default("incr", key, async {
            let mut c = cmd("INCR");
            c.arg(key);
            self.query(key, c).await
        })
        .await
    }

    /// DECR; 0 on failure.
    pub async fn decr(&self, key: &str) -> i64 {
        or_default("decr", key, async {
            let mut c = cmd("DECR");
            c.arg(key);
            self.query(key, c).await
        })
        .await
    }

    pub async fn incr_by(&self, key: &str, delta: i64) -> i64 {
        or_default("incr_by", key, async {
            let mut c = cmd("INCRBY");
            c.arg(key).arg(delta);
            self.query(key, c).await
        })
        .await
    }
}
