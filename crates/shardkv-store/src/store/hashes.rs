//! Hash field operations.

use std::collections::HashSet;

use redis::cmd;
use serde::{Serialize, de::DeserializeOwned};

use super::{ShardedStore, or_default, rejected};
use crate::codec;
use crate::error::{Result, StoreError};
use crate::pool::ShardPool;

impl<P: ShardPool> ShardedStore<P> {
    /// HSET one field.
    pub async fn set_hash(&self, key: &str, field: &str, value: &str) -> bool {
        or_default("set_hash", key, self.hset(key, field, value)).await
    }

    pub async fn get_hash(&self, key: &str, field: &str) -> Option<String> {
        or_default("get_hash", key, self.hget(key, field)).await
    }

    /// HSET one field holding `value` as JSON.
    pub async fn set_hash_object<T: Serialize>(&self, key: &str, field: &str, value: &T) -> bool {
        or_default("set_hash_object", key, async {
            let json = codec::encode(value)?;
            self.hset(key, field, &json).await
        })
        .await
    }

    pub async fn get_hash_object<T: DeserializeOwned>(&self, key: &str, field: &str) -> Option<T> {
        or_default("get_hash_object", key, async {
            match self.hget(key, field).await? {
                Some(json) => Ok(Some(codec::decode(&json)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// HDEL one field; number of fields removed.
    pub async fn del_hash_field(&self, key: &str, field: &str) -> u64 {
        self.del_hash_fields(key, &[field]).await
    }

    /// HDEL several fields; number of fields removed.
    pub async fn del_hash_fields(&self, key: &str, fields: &[&str]) -> u64 {
        if fields.is_empty() {
            return rejected("del_hash_fields", key, "no fields");
        }
        or_default("del_hash_fields", key, async {
            let mut c = cmd("HDEL");
            c.arg(key).arg(fields);
            self.query(key, c).await
        })
        .await
    }

    pub async fn exists_hash(&self, key: &str, field: &str) -> bool {
        or_default("exists_hash", key, async {
            let mut c = cmd("HEXISTS");
            c.arg(key).arg(field);
            self.query(key, c).await
        })
        .await
    }

    /// Every `(field, value)` whose field matches the glob `pattern`, walking
    /// HSCAN pages until the cursor returns to 0.
    pub async fn scan_hash(&self, key: &str, pattern: &str) -> Vec<(String, String)> {
        or_default("scan_hash", key, async {
            let mut entries = Vec::new();
            let mut cursor: u64 = 0;
            loop {
                let mut c = cmd("HSCAN");
                c.arg(key).arg(cursor).arg("MATCH").arg(pattern);
                let (next, page): (u64, Vec<String>) = self.query(key, c).await?;

                if page.len() % 2 != 0 {
                    return Err(StoreError::Redis(
                        "HSCAN page has an odd number of elements".to_string(),
                    ));
                }
                let mut items = page.into_iter();
                while let (Some(field), Some(value)) = (items.next(), items.next()) {
                    entries.push((field, value));
                }

                if next == 0 {
                    break;
                }
                cursor = next;
            }
            Ok(entries)
        })
        .await
    }

    /// HVALS
    pub async fn hash_values(&self, key: &str) -> Vec<String> {
        or_default("hash_values", key, async {
            let mut c = cmd("HVALS");
            c.arg(key);
            self.query(key, c).await
        })
        .await
    }

    /// HKEYS
    pub async fn hash_keys(&self, key: &str) -> HashSet<String> {
        or_default("hash_keys", key, async {
            let mut c = cmd("HKEYS");
            c.arg(key);
            self.query(key, c).await
        })
        .await
    }

    /// HLEN; 0 for a missing key.
    pub async fn len_hash(&self, key: &str) -> u64 {
        or_default("len_hash", key, async {
            let mut c = cmd("HLEN");
            c.arg(key);
            self.query(key, c).await
        })
        .await
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        let mut c = cmd("HSET");
        c.arg(key).arg(field).arg(value);
        self.query::<i64>(key, c).await.map(|_| true)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut c = cmd("HGET");
        c.arg(key).arg(field);
        self.query(key, c).await
    }
}
