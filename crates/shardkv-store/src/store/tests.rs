use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use fake::faker::lorem::en::Word;
use fake::faker::name::en::Name;
use fake::{Fake, Faker};
use serde::{Deserialize, Serialize};

use super::{Order, ShardedStore};
use crate::codec::MapCodec;
use crate::pool::{MemoryPool, ShardPool};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
struct Account {
    id: u32,
    name: String,
    roles: Vec<String>,
}

fn account() -> Account {
    Account {
        id: Faker.fake(),
        name: Name().fake(),
        roles: vec![Word().fake(), Word().fake()],
    }
}

fn store() -> ShardedStore<MemoryPool> {
    ShardedStore::new(MemoryPool::new())
}

// =============================================================================
// STRINGS & OBJECTS
// =============================================================================

#[tokio::test]
async fn test_set_get_del() {
    let store = store();
    assert!(store.set("greeting", "hello").await);
    assert_eq!(store.get("greeting").await.as_deref(), Some("hello"));
    assert!(store.exists("greeting").await);

    assert!(store.del("greeting").await);
    assert_eq!(store.get("greeting").await, None);
    // Deleting a missing key still succeeds.
    assert!(store.del("greeting").await);
}

#[tokio::test]
async fn test_object_round_trip() {
    let store = store();
    let value = account();
    assert!(store.set_object("account:1", &value).await);
    assert_eq!(store.get_object::<Account>("account:1").await, Some(value));
    assert_eq!(store.get_object::<Account>("account:2").await, None);
}

#[tokio::test]
async fn test_object_of_wrong_shape_is_none() {
    let store = store();
    store.set("account:1", "not json").await;
    assert_eq!(store.get_object::<Account>("account:1").await, None);
}

#[tokio::test]
async fn test_set_ex_and_ttl() {
    let store = store();
    assert!(store.set_ex("session", "token", 30).await);
    assert_eq!(store.ttl("session").await, Some(30));

    assert!(store.set_object_ex("profile", &account(), 60).await);
    assert_eq!(store.ttl("profile").await, Some(60));

    store.set("plain", "v").await;
    assert_eq!(store.ttl("plain").await, None);
    assert_eq!(store.ttl("missing").await, None);
}

#[tokio::test]
async fn test_expire_and_expire_at() {
    let store = store();
    store.set("k", "v").await;

    assert!(store.expire("k", 120).await);
    assert_eq!(store.ttl("k").await, Some(120));

    let at = Utc::now().timestamp() + 600;
    assert!(store.expire_at("k", at).await);
    let ttl = store.ttl("k").await.unwrap();
    assert!((598..=600).contains(&ttl));

    assert!(!store.expire("missing", 10).await);
    assert!(!store.expire("", 10).await);
    assert!(!store.expire_at("", at).await);

    // A timestamp in the past drops the key.
    assert!(store.expire_at("k", 1).await);
    assert_eq!(store.get("k").await, None);
}

#[tokio::test]
async fn test_out_of_range_expiry_returns_false() {
    let store = store();
    store.set("k", "v").await;

    assert!(!store.expire("k", i64::MAX / 100).await);
    assert!(!store.expire_at("k", i64::MAX).await);
    assert!(!store.set_ex("k", "v", u64::MAX / 2).await);

    // The key and its missing expiry are untouched.
    assert_eq!(store.get("k").await.as_deref(), Some("v"));
    assert_eq!(store.ttl("k").await, None);
}

#[tokio::test]
async fn test_set_objects_encode_failure_returns_false() {
    let store = store();
    // JSON object keys must be strings.
    let bad = HashMap::from([(vec![1u8], 1u8)]);
    assert!(!store.set_set_objects("bad", [&bad]).await);
    assert_eq!(store.count_set("bad").await, 0);
}

#[tokio::test]
async fn test_counters() {
    let store = store();
    assert_eq!(store.incr("hits").await, 1);
    assert_eq!(store.incr("hits").await, 2);
    assert_eq!(store.incr_by("hits", 10).await, 12);
    assert_eq!(store.decr("hits").await, 11);
    assert_eq!(store.decr("fresh").await, -1);

    // Not an integer: logged failure, default value.
    store.set("text", "abc").await;
    assert_eq!(store.incr("text").await, 0);
}

// =============================================================================
// LISTS
// =============================================================================

#[tokio::test]
async fn test_list_objects_keep_order() {
    let store = store();
    let items: Vec<Account> = (0..5).map(|_| account()).collect();
    assert!(store.set_list_objects("accounts", &items).await);
    assert_eq!(store.get_list_objects::<Account>("accounts").await, items);
    assert_eq!(store.count_list("accounts").await, 5);

    assert!(!store.set_list_objects::<Account>("empty", &[]).await);
    assert!(store.get_list_objects::<Account>("empty").await.is_empty());
}

#[tokio::test]
async fn test_list_push_range_trim() {
    let store = store();
    assert_eq!(store.count_list("queue").await, 0);

    assert!(store.add_list("queue", &["a", "b", "c"]).await);
    // LPUSH puts the last value at the head.
    assert_eq!(store.get_list("queue").await, vec!["c", "b", "a"]);
    assert_eq!(store.range_list("queue", 0, 1).await, vec!["c", "b"]);
    assert_eq!(store.range_list("queue", -1, -1).await, vec!["a"]);
    assert!(store.range_list("", 0, -1).await.is_empty());

    assert!(store.trim_list("queue", 0, 1).await);
    assert_eq!(store.get_list("queue").await, vec!["c", "b"]);
    assert!(!store.trim_list("", 0, 1).await);

    assert!(!store.add_list("queue", &[]).await);
}

#[tokio::test]
async fn test_list_duplicates_are_counted() {
    let store = store();
    let n = (3..10).fake::<usize>();
    for _ in 0..n {
        store.add_list("dupes", &["same"]).await;
    }
    assert_eq!(store.count_list("dupes").await, n as u64);
}

#[tokio::test]
async fn test_add_list_each_and_ex() {
    let store = store();
    assert!(store.add_list_each("log", &["one", "two"]).await);
    assert_eq!(store.get_list("log").await, vec!["two", "one"]);
    assert!(!store.add_list_each("log", &[]).await);

    assert!(store.add_list_ex("recent", 45, &["x"]).await);
    assert_eq!(store.ttl("recent").await, Some(45));
}

#[tokio::test]
async fn test_list_remove() {
    let store = store();
    store.add_list("l", &["a", "b", "a", "c", "a"]).await;

    assert!(store.remove_list_value("l", 1, "a").await);
    assert_eq!(store.get_list("l").await, vec!["c", "a", "b", "a"]);

    assert_eq!(store.remove_list_values("l", 0, &["a", "b"]).await, 2);
    assert_eq!(store.get_list("l").await, vec!["c"]);
}

// =============================================================================
// SETS
// =============================================================================

#[tokio::test]
async fn test_set_members_dedupe() {
    let store = store();
    assert_eq!(store.count_set("tags").await, 0);

    assert!(store.add_set("tags", &["rust", "redis", "rust"]).await);
    assert!(store.add_set("tags", &["redis"]).await);
    assert_eq!(store.count_set("tags").await, 2);
    assert!(store.contains_in_set("tags", "rust").await);
    assert!(!store.contains_in_set("tags", "go").await);
    assert_eq!(
        store.get_set("tags").await,
        HashSet::from(["rust".to_string(), "redis".to_string()])
    );

    assert!(store.remove_set_values("tags", &["rust"]).await);
    assert_eq!(store.count_set("tags").await, 1);
    assert!(!store.add_set("tags", &[]).await);
}

#[tokio::test]
async fn test_add_set_ex() {
    let store = store();
    assert!(store.add_set_ex("online", 90, &["u1", "u2"]).await);
    assert_eq!(store.ttl("online").await, Some(90));
}

#[tokio::test]
async fn test_set_objects() {
    let store = store();
    let a = account();
    let b = account();
    assert!(store.set_set_objects("team", [&a, &b, &a]).await);
    assert_eq!(store.count_set("team").await, if a == b { 1 } else { 2 });

    let read: HashSet<Account> = store.get_set_objects("team").await;
    assert!(read.contains(&a));
    assert!(read.contains(&b));

    assert!(!store.set_set_objects::<Account, _>("none", []).await);
}

// =============================================================================
// MAPS OF OBJECTS
// =============================================================================

#[tokio::test]
async fn test_map_object_round_trip() {
    let store = store();
    let map: HashMap<String, Account> = (0..4)
        .map(|i| (format!("{i:03}_key"), account()))
        .collect();

    assert!(store.set_map_object("roles", &map).await);
    assert_eq!(store.count_set("roles").await, 4);
    assert_eq!(store.get_map_object::<Account>("roles").await, map);
}

#[tokio::test]
async fn test_map_keys_may_hold_separator_with_envelope() {
    let store = store();
    let map = HashMap::from([("a^b".to_string(), 1u32), ("plain".to_string(), 2)]);
    assert!(store.set_map_object("m", &map).await);
    assert_eq!(store.get_map_object::<u32>("m").await, map);
}

#[tokio::test]
async fn test_delimited_map_rejects_separator_key() {
    let store = store().with_codec(MapCodec::delimited());

    let good = HashMap::from([("001".to_string(), "worker".to_string())]);
    assert!(store.set_map_object("legacy", &good).await);
    assert_eq!(store.get_map_object::<String>("legacy").await, good);

    let bad = HashMap::from([("0^1".to_string(), "worker".to_string())]);
    assert!(!store.set_map_object("legacy", &bad).await);
    assert_eq!(store.count_set("legacy").await, 1);
}

#[tokio::test]
async fn test_map_same_key_resolves_deterministically() {
    let store = store();
    store.set_map_object("m", &HashMap::from([("k".to_string(), 1u32)])).await;
    store.set_map_object("m", &HashMap::from([("k".to_string(), 2u32)])).await;

    // Two members exist for one map key; every read picks the same one.
    assert_eq!(store.count_set("m").await, 2);
    let first = store.get_map_object::<u32>("m").await;
    assert_eq!(first.len(), 1);
    for _ in 0..5 {
        assert_eq!(store.get_map_object::<u32>("m").await, first);
    }
}

#[tokio::test]
async fn test_empty_map_is_rejected() {
    let store = store();
    assert!(!store.set_map_object::<u32>("m", &HashMap::new()).await);
    assert!(store.get_map_object::<u32>("m").await.is_empty());
}

// =============================================================================
// HASHES
// =============================================================================

#[tokio::test]
async fn test_hash_fields() {
    let store = store();
    assert_eq!(store.len_hash("user:1").await, 0);

    assert!(store.set_hash("user:1", "name", "Ada").await);
    assert!(store.set_hash("user:1", "lang", "en").await);
    assert!(store.set_hash("user:1", "name", "Ada L.").await);

    assert_eq!(store.get_hash("user:1", "name").await.as_deref(), Some("Ada L."));
    assert_eq!(store.get_hash("user:1", "nope").await, None);
    assert!(store.exists_hash("user:1", "lang").await);
    assert_eq!(store.len_hash("user:1").await, 2);
    assert_eq!(
        store.hash_keys("user:1").await,
        HashSet::from(["name".to_string(), "lang".to_string()])
    );

    let mut values = store.hash_values("user:1").await;
    values.sort();
    assert_eq!(values, vec!["Ada L.", "en"]);

    assert_eq!(store.del_hash_field("user:1", "lang").await, 1);
    assert_eq!(store.del_hash_fields("user:1", &["name", "nope"]).await, 1);
    assert_eq!(store.len_hash("user:1").await, 0);
    assert_eq!(store.del_hash_fields("user:1", &[]).await, 0);
}

#[tokio::test]
async fn test_hash_objects() {
    let store = store();
    let value = account();
    assert!(store.set_hash_object("accounts", "primary", &value).await);
    assert_eq!(store.get_hash_object::<Account>("accounts", "primary").await, Some(value));
    assert_eq!(store.get_hash_object::<Account>("accounts", "other").await, None);
}

#[tokio::test]
async fn test_scan_hash_matches_fields() {
    let store = store();
    for (field, value) in [("city:1", "Oslo"), ("city:2", "Lima"), ("zip:1", "0150")] {
        store.set_hash("geo", field, value).await;
    }

    let mut cities = store.scan_hash("geo", "city:*").await;
    cities.sort();
    assert_eq!(
        cities,
        vec![
            ("city:1".to_string(), "Oslo".to_string()),
            ("city:2".to_string(), "Lima".to_string()),
        ]
    );
    assert_eq!(
        store.scan_hash("geo", "city:[2-9]").await,
        vec![("city:2".to_string(), "Lima".to_string())]
    );
    assert_eq!(store.scan_hash("geo", "*").await.len(), 3);
    assert!(store.scan_hash("missing", "*").await.is_empty());
}

// =============================================================================
// SORTED SETS
// =============================================================================

async fn leaderboard() -> ShardedStore<MemoryPool> {
    let store = store();
    for (member, score) in [("ana", 30.0), ("bo", 10.0), ("cy", 20.0), ("di", 40.0)] {
        assert!(store.set_sorted_set("board", score, member).await);
    }
    store
}

#[tokio::test]
async fn test_sorted_set_by_score() {
    let store = leaderboard().await;
    assert_eq!(
        store.sorted_set_by_score("board", 10.0, 30.0, Order::Ascending).await,
        vec!["bo", "cy", "ana"]
    );
    assert_eq!(
        store.sorted_set_by_score("board", 10.0, 30.0, Order::Descending).await,
        vec!["ana", "cy", "bo"]
    );
    assert_eq!(
        store
            .sorted_set_by_score("board", f64::NEG_INFINITY, f64::INFINITY, Order::Ascending)
            .await
            .len(),
        4
    );
    assert_eq!(store.count_sorted_set("board", 15.0, 45.0).await, 3);
    assert_eq!(store.count_sorted_set("missing", 0.0, 1.0).await, 0);
}

#[tokio::test]
async fn test_sorted_set_by_rank() {
    let store = leaderboard().await;
    assert_eq!(
        store.sorted_set_by_rank("board", 0, 1, Order::Ascending).await,
        vec!["bo", "cy"]
    );
    assert_eq!(
        store.sorted_set_by_rank("board", 0, 1, Order::Descending).await,
        vec!["di", "ana"]
    );
    assert_eq!(
        store.sorted_set_by_rank("board", 0, -1, Order::Ascending).await.len(),
        4
    );
}

#[tokio::test]
async fn test_sorted_set_score_and_remove() {
    let store = leaderboard().await;
    assert_eq!(store.score("board", "cy").await, Some(20.0));
    assert_eq!(store.score("board", "zed").await, None);

    // Re-adding updates the score.
    store.set_sorted_set("board", 99.5, "cy").await;
    assert_eq!(store.score("board", "cy").await, Some(99.5));

    assert!(store.del_sorted_set("board", "cy").await);
    assert!(!store.del_sorted_set("board", "cy").await);
    assert_eq!(store.count_sorted_set("board", f64::NEG_INFINITY, f64::INFINITY).await, 3);
}

// =============================================================================
// FAILURE DEFAULTS
// =============================================================================

#[tokio::test]
async fn test_type_mismatch_falls_back() {
    let store = store();
    store.set("scalar", "v").await;
    assert!(!store.add_set("scalar", &["m"]).await);
    assert_eq!(store.count_list("scalar").await, 0);
    assert!(store.hash_keys("scalar").await.is_empty());
    assert_eq!(store.get("scalar").await.as_deref(), Some("v"));
}

#[tokio::test]
async fn test_offline_pool_returns_defaults() {
    let pool = Arc::new(MemoryPool::new());
    let store = ShardedStore::from_shared(Arc::clone(&pool));
    store.set("k", "v").await;
    store.add_list("l", &["a"]).await;
    pool.set_offline(true);

    let map = HashMap::from([("a".to_string(), 1u8)]);
    let value = account();

    assert!(!store.set("k", "v").await);
    assert!(!store.set_ex("k", "v", 1).await);
    assert_eq!(store.get("k").await, None);
    assert!(!store.set_object("k", &value).await);
    assert!(!store.set_object_ex("k", &value, 1).await);
    assert_eq!(store.get_object::<Account>("k").await, None);
    assert!(!store.del("k").await);
    assert!(!store.exists("k").await);
    assert!(!store.expire("k", 1).await);
    assert!(!store.expire_at("k", 1).await);
    assert_eq!(store.ttl("k").await, None);
    assert_eq!(store.incr("n").await, 0);
    assert_eq!(store.decr("n").await, 0);
    assert_eq!(store.incr_by("n", 5).await, 0);

    assert!(!store.set_list_objects("l", &[value.clone()]).await);
    assert!(store.get_list_objects::<Account>("l").await.is_empty());
    assert!(!store.add_list("l", &["a"]).await);
    assert!(!store.add_list_ex("l", 1, &["a"]).await);
    assert!(!store.add_list_each("l", &["a", "b"]).await);
    assert!(store.get_list("l").await.is_empty());
    assert!(store.range_list("l", 0, -1).await.is_empty());
    assert!(!store.trim_list("l", 0, 1).await);
    assert_eq!(store.count_list("l").await, 0);
    assert!(!store.remove_list_value("l", 0, "a").await);
    assert_eq!(store.remove_list_values("l", 0, &["a", "b"]).await, 0);

    assert!(!store.add_set("s", &["a"]).await);
    assert!(!store.add_set_ex("s", 1, &["a"]).await);
    assert!(store.get_set("s").await.is_empty());
    assert!(!store.remove_set_values("s", &["a"]).await);
    assert!(!store.contains_in_set("s", "a").await);
    assert_eq!(store.count_set("s").await, 0);
    assert!(!store.set_set_objects("s", [&value]).await);
    assert!(store.get_set_objects::<Account>("s").await.is_empty());
    assert!(!store.set_map_object("m", &map).await);
    assert!(store.get_map_object::<u8>("m").await.is_empty());

    assert!(!store.set_hash("h", "f", "v").await);
    assert_eq!(store.get_hash("h", "f").await, None);
    assert!(!store.set_hash_object("h", "f", &value).await);
    assert_eq!(store.get_hash_object::<Account>("h", "f").await, None);
    assert_eq!(store.del_hash_field("h", "f").await, 0);
    assert_eq!(store.del_hash_fields("h", &["f"]).await, 0);
    assert!(!store.exists_hash("h", "f").await);
    assert!(store.scan_hash("h", "*").await.is_empty());
    assert!(store.hash_values("h").await.is_empty());
    assert!(store.hash_keys("h").await.is_empty());
    assert_eq!(store.len_hash("h").await, 0);

    assert!(!store.set_sorted_set("z", 1.0, "a").await);
    assert!(!store.del_sorted_set("z", "a").await);
    assert!(store.sorted_set_by_score("z", 0.0, 1.0, Order::Ascending).await.is_empty());
    assert!(store.sorted_set_by_rank("z", 0, -1, Order::Descending).await.is_empty());
    assert_eq!(store.score("z", "a").await, None);
    assert_eq!(store.count_sorted_set("z", 0.0, 1.0).await, 0);

    // Data written before the outage is still there afterwards.
    pool.set_offline(false);
    assert_eq!(store.get("k").await.as_deref(), Some("v"));
    assert_eq!(store.get_list("l").await, vec!["a"]);
}

#[tokio::test]
async fn test_clones_share_pool() {
    let store = store();
    let other = store.clone();
    store.set("shared", "yes").await;
    assert_eq!(other.get("shared").await.as_deref(), Some("yes"));
    assert_eq!(other.pool().key_count(), 1);
    assert_eq!(other.codec(), MapCodec::Envelope);

    let value = other.pool().execute("shared", &redis::cmd("PING")).await;
    assert!(value.is_ok());
}
