//! Unordered sets, sets of JSON objects, and maps of objects kept as sets.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use redis::{ToRedisArgs, cmd};
use serde::{Serialize, de::DeserializeOwned};

use super::{ShardedStore, or_default, rejected};
use crate::codec;
use crate::error::Result;
use crate::pool::ShardPool;

impl<P: ShardPool> ShardedStore<P> {
    // =========================================================================
    // STRING SETS
    // =========================================================================

    /// SADD `members`.
    pub async fn add_set(&self, key: &str, members: &[&str]) -> bool {
        if members.is_empty() {
            return rejected("add_set", key, "no members");
        }
        or_default("add_set", key, self.sadd(key, members)).await
    }

    /// SADD `members`, then expire the set after `seconds`. True only when
    /// both succeed.
    pub async fn add_set_ex(&self, key: &str, seconds: i64, members: &[&str]) -> bool {
        self.add_set(key, members).await && self.expire(key, seconds).await
    }

    pub async fn get_set(&self, key: &str) -> HashSet<String> {
        or_default("get_set", key, self.smembers(key)).await
    }

    /// SREM `members`. True once the command ran.
    pub async fn remove_set_values(&self, key: &str, members: &[&str]) -> bool {
        if members.is_empty() {
            return rejected("remove_set_values", key, "no members");
        }
        or_default("remove_set_values", key, async {
            let mut c = cmd("SREM");
            c.arg(key).arg(members);
            self.query::<i64>(key, c).await.map(|_| true)
        })
        .await
    }

    pub async fn contains_in_set(&self, key: &str, member: &str) -> bool {
        or_default("contains_in_set", key, async {
            let mut c = cmd("SISMEMBER");
            c.arg(key).arg(member);
            self.query(key, c).await
        })
        .await
    }

    /// SCARD; 0 for a missing key.
    pub async fn count_set(&self, key: &str) -> u64 {
        or_default("count_set", key, async {
            let mut c = cmd("SCARD");
            c.arg(key);
            self.query(key, c).await
        })
        .await
    }

    // =========================================================================
    // OBJECT SETS
    // =========================================================================

    /// SADD each item as JSON. Items with identical JSON collapse into one
    /// member.
    pub async fn set_set_objects<'a, T, I>(&self, key: &str, items: I) -> bool
    where
        T: Serialize + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let items: Vec<&T> = items.into_iter().collect();
        if items.is_empty() {
            return rejected("set_set_objects", key, "no elements");
        }
        or_default("set_set_objects", key, async {
            let members = items.into_iter().map(codec::encode).collect::<Result<Vec<_>>>()?;
            self.sadd(key, &members).await
        })
        .await
    }

    /// Set members decoded from JSON. Empty if any member fails to decode.
    pub async fn get_set_objects<T>(&self, key: &str) -> HashSet<T>
    where
        T: DeserializeOwned + Eq + Hash,
    {
        or_default("get_set_objects", key, async {
            let raw = self.smembers(key).await?;
            raw.iter().map(|json| codec::decode(json)).collect()
        })
        .await
    }

    // =========================================================================
    // MAPS OF OBJECTS
    // =========================================================================

    /// Add every entry of `map` as one set member, encoded with the store's
    /// [`MapCodec`](crate::codec::MapCodec).
    ///
    /// Additive: entries already in the set stay, including older values for
    /// the same map key. `del` the key first to replace a map.
    pub async fn set_map_object<V: Serialize>(&self, key: &str, map: &HashMap<String, V>) -> bool {
        if map.is_empty() {
            return rejected("set_map_object", key, "empty map");
        }
        or_default("set_map_object", key, async {
            let members = map
                .iter()
                .map(|(field, value)| self.codec.encode_entry(field, value))
                .collect::<Result<Vec<_>>>()?;
            self.sadd(key, &members).await
        })
        .await
    }

    /// Rebuild a map from its set members.
    ///
    /// When several members carry the same map key, the member that sorts
    /// last wins, so repeated reads agree. Empty if any member fails to
    /// decode.
    pub async fn get_map_object<V: DeserializeOwned>(&self, key: &str) -> HashMap<String, V> {
        or_default("get_map_object", key, async {
            let mut members: Vec<String> = self.smembers(key).await?.into_iter().collect();
            members.sort_unstable();
            let mut map = HashMap::with_capacity(members.len());
            for member in &members {
                let (field, value) = self.codec.decode_entry(member)?;
                map.insert(field, value);
            }
            Ok(map)
        })
        .await
    }

    async fn sadd<M: ToRedisArgs>(&self, key: &str, members: &[M]) -> Result<bool> {
        let mut c = cmd("SADD");
        c.arg(key).arg(members);
        self.query::<i64>(key, c).await.map(|_| true)
    }

    async fn smembers(&self, key: &str) -> Result<HashSet<String>> {
        let mut c = cmd("SMEMBERS");
        c.arg(key);
        self.query(key, c).await
    }
}
