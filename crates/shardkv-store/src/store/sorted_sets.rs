//! Sorted set operations.

use redis::cmd;

use super::{Order, ShardedStore, or_default};
use crate::pool::ShardPool;

impl<P: ShardPool> ShardedStore<P> {
    /// ZADD `member` with `score`, updating the score of an existing member.
    pub async fn set_sorted_set(&self, key: &str, score: f64, member: &str) -> bool {
        or_default("set_sorted_set", key, async {
            let mut c = cmd("ZADD");
            c.arg(key).arg(score).arg(member);
            self.query::<i64>(key, c).await.map(|_| true)
        })
        .await
    }

    /// ZREM `member`. True only if it was present.
    pub async fn del_sorted_set(&self, key: &str, member: &str) -> bool {
        or_default("del_sorted_set", key, async {
            let mut c = cmd("ZREM");
            c.arg(key).arg(member);
            let removed: i64 = self.query(key, c).await?;
            Ok(removed > 0)
        })
        .await
    }

    /// Members with `min <= score <= max`, in `order`.
    pub async fn sorted_set_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
        order: Order,
    ) -> Vec<String> {
        or_default("sorted_set_by_score", key, async {
            let c = match order {
                Order::Ascending => {
                    let mut c = cmd("ZRANGEBYSCORE");
                    c.arg(key).arg(min).arg(max);
                    c
                }
                Order::Descending => {
                    let mut c = cmd("ZREVRANGEBYSCORE");
                    c.arg(key).arg(max).arg(min);
                    c
                }
            };
            self.query(key, c).await
        })
        .await
    }

    /// Members ranked `start..=stop` (negative counts from the end), in `order`.
    pub async fn sorted_set_by_rank(
        &self,
        key: &str,
        start: isize,
        stop: isize,
        order: Order,
    ) -> Vec<String> {
        or_default("sorted_set_by_rank", key, async {
            let mut c = cmd(match order {
                Order::Ascending => "ZRANGE",
                Order::Descending => "ZREVRANGE",
            });
            c.arg(key).arg(start).arg(stop);
            self.query(key, c).await
        })
        .await
    }

    /// ZSCORE; `None` when the member is absent.
    pub async fn score(&self, key: &str, member: &str) -> Option<f64> {
        or_default("score", key, async {
            let mut c = cmd("ZSCORE");
            c.arg(key).arg(member);
            self.query(key, c).await
        })
        .await
    }

    /// ZCOUNT over the inclusive score range.
    pub async fn count_sorted_set(&self, key: &str, min: f64, max: f64) -> u64 {
        or_default("count_sorted_set", key, async {
            let mut c = cmd("ZCOUNT");
            c.arg(key).arg(min).arg(max);
            self.query(key, c).await
        })
        .await
    }
}
