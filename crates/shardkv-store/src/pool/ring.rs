//! Ketama-style consistent hash ring mapping keys to shard indexes.

use std::collections::BTreeMap;

/// Ring points contributed per unit of shard weight.
pub const POINTS_PER_WEIGHT: u32 = 160;

/// Largest accepted shard weight.
pub const MAX_WEIGHT: u32 = 1000;

/// Consistent hash ring over a fixed list of shards.
///
/// Every shard places `POINTS_PER_WEIGHT * weight` points on a `u32` circle,
/// four per MD5 digest of `"{name}-{n}"`. A key belongs to the shard owning
/// the first point at or after `md5(key)`, wrapping around. Placement depends
/// only on shard names and weights, so every process agrees on it.
#[derive(Debug, Clone)]
pub struct HashRing {
    points: BTreeMap<u32, usize>,
    shards: usize,
}

impl HashRing {
    /// Build a ring from `(name, weight)` pairs; the index of each pair is the
    /// shard index returned by [`HashRing::locate`].
    pub fn new<'a>(shards: impl IntoIterator<Item = (&'a str, u32)>) -> Self {
        let mut points = BTreeMap::new();
        let mut count = 0;

        for (index, (name, weight)) in shards.into_iter().enumerate() {
            count += 1;
            let digests = POINTS_PER_WEIGHT.saturating_mul(weight.clamp(1, MAX_WEIGHT)) / 4;
            for n in 0..digests {
                let digest = md5::compute(format!("{name}-{n}"));
                for chunk in digest.0.chunks_exact(4) {
                    let point = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                    // First shard to claim a point keeps it.
                    points.entry(point).or_insert(index);
                }
            }
        }

        Self {
            points,
            shards: count,
        }
    }

    /// Number of shards on the ring.
    pub const fn len(&self) -> usize {
        self.shards
    }

    pub const fn is_empty(&self) -> bool {
        self.shards == 0
    }

    /// Index of the shard owning `key`, `None` for an empty ring.
    pub fn locate(&self, key: &str) -> Option<usize> {
        if self.shards <= 1 {
            return (self.shards == 1).then_some(0);
        }

        let hash = key_hash(key);
        self.points
            .range(hash..)
            .next()
            .or_else(|| self.points.iter().next())
            .map(|(_, &index)| index)
    }
}

fn key_hash(key: &str) -> u32 {
    let digest = md5::compute(key.as_bytes());
    u32::from_le_bytes([digest.0[0], digest.0[1], digest.0[2], digest.0[3]])
}
