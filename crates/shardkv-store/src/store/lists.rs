//! List operations, plus lists of JSON objects.

use redis::cmd;
use serde::{Serialize, de::DeserializeOwned};

use super::{ShardedStore, or_default, rejected};
use crate::codec;
use crate::error::Result;
use crate::pool::ShardPool;

impl<P: ShardPool> ShardedStore<P> {
    /// RPUSH every element of `items` as JSON, preserving order.
    pub async fn set_list_objects<T: Serialize>(&self, key: &str, items: &[T]) -> bool {
        if items.is_empty() {
            return rejected("set_list_objects", key, "no elements");
        }
        or_default("set_list_objects", key, async {
            let encoded = items.iter().map(codec::encode).collect::<Result<Vec<_>>>()?;
            let mut c = cmd("RPUSH");
            c.arg(key).arg(encoded);
            self.query::<i64>(key, c).await.map(|_| true)
        })
        .await
    }

    /// Whole list decoded from JSON. Empty if any element fails to decode.
    pub async fn get_list_objects<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        or_default("get_list_objects", key, async {
            let raw = self.lrange(key, 0, -1).await?;
            raw.iter().map(|json| codec::decode(json)).collect()
        })
        .await
    }

    /// LPUSH `values` in one command.
    pub async fn add_list(&self, key: &str, values: &[&str]) -> bool {
        if values.is_empty() {
            return rejected("add_list", key, "no values");
        }
        or_default("add_list", key, async {
            let mut c = cmd("LPUSH");
            c.arg(key).arg(values);
            self.query::<i64>(key, c).await.map(|_| true)
        })
        .await
    }

    /// LPUSH `values`, then expire the list after `seconds`. True only when
    /// both succeed.
    pub async fn add_list_ex(&self, key: &str, seconds: i64, values: &[&str]) -> bool {
        self.add_list(key, values).await && self.expire(key, seconds).await
    }

    /// One LPUSH per value. Not atomic: a failure leaves earlier pushes in
    /// place. True only if every push succeeded.
    pub async fn add_list_each(&self, key: &str, values: &[&str]) -> bool {
        if values.is_empty() {
            return rejected("add_list_each", key, "no values");
        }
        let mut all = true;
        for value in values {
            all &= self.add_list(key, &[*value]).await;
        }
        all
    }

    /// Whole list.
    pub async fn get_list(&self, key: &str) -> Vec<String> {
        or_default("get_list", key, self.lrange(key, 0, -1)).await
    }

    /// LRANGE with inclusive, possibly negative, bounds.
    pub async fn range_list(&self, key: &str, start: isize, stop: isize) -> Vec<String> {
        if key.is_empty() {
            return rejected("range_list", key, "empty key");
        }
        or_default("range_list", key, self.lrange(key, start, stop)).await
    }

    /// LTRIM to the inclusive range.
    pub async fn trim_list(&self, key: &str, start: isize, stop: isize) -> bool {
        if key.is_empty() {
            return rejected("trim_list", key, "empty key");
        }
        or_default("trim_list", key, async {
            let mut c = cmd("LTRIM");
            c.arg(key).arg(start).arg(stop);
            self.query::<()>(key, c).await.map(|()| true)
        })
        .await
    }

    /// LLEN; 0 for a missing key.
    pub async fn count_list(&self, key: &str) -> u64 {
        or_default("count_list", key, async {
            let mut c = cmd("LLEN");
            c.arg(key);
            self.query(key, c).await
        })
        .await
    }

    /// LREM `count` occurrences of `value` (0 = all, negative = from the tail).
    pub async fn remove_list_value(&self, key: &str, count: isize, value: &str) -> bool {
        or_default("remove_list_value", key, async {
            let mut c = cmd("LREM");
            c.arg(key).arg(count).arg(value);
            self.query::<i64>(key, c).await.map(|_| true)
        })
        .await
    }

    /// One LREM per value; returns how many of those calls succeeded.
    pub async fn remove_list_values(&self, key: &str, count: isize, values: &[&str]) -> usize {
        let mut removed = 0;
        for value in values {
            if self.remove_list_value(key, count, value).await {
                removed += 1;
            }
        }
        removed
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let mut c = cmd("LRANGE");
        c.arg(key).arg(start).arg(stop);
        self.query(key, c).await
    }
}
