//! # ShardKV CLI
//!
//! Issues single store operations against the shards configured in the
//! environment (`REDIS_SHARDS`, see `StoreConfig::from_env`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use shardkv_store::{Order, ShardedStore, StoreConfig};

#[derive(Parser, Debug)]
#[command(name = "shardkv")]
#[command(about = "Run one operation against sharded Redis", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Read a string value
    Get { key: String },

    /// Write a string value
    Set {
        key: String,
        value: String,
        /// Expire after this many seconds
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Delete a key
    Del { key: String },

    /// Check whether a key exists
    Exists { key: String },

    /// Increment a counter
    Incr {
        key: String,
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        by: i64,
    },

    /// Decrement a counter
    Decr { key: String },

    /// Expire a key after a number of seconds
    Expire { key: String, seconds: i64 },

    /// Remaining time to live in seconds
    Ttl { key: String },

    /// Push values onto the head of a list
    Push {
        key: String,
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Read a list range (inclusive, negative counts from the end)
    Range {
        key: String,
        #[arg(default_value_t = 0, allow_negative_numbers = true)]
        start: isize,
        #[arg(default_value_t = -1, allow_negative_numbers = true)]
        stop: isize,
    },

    /// Add members to a set
    Sadd {
        key: String,
        #[arg(required = true)]
        members: Vec<String>,
    },

    /// List set members
    Members { key: String },

    /// Set a hash field
    Hset { key: String, field: String, value: String },

    /// Read a hash field
    Hget { key: String, field: String },

    /// Add a member to a sorted set
    Zadd {
        key: String,
        #[arg(allow_negative_numbers = true)]
        score: f64,
        member: String,
    },

    /// Sorted-set members within a score range
    Zrange {
        key: String,
        #[arg(long, allow_negative_numbers = true)]
        min: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        max: Option<f64>,
        /// Highest score first
        #[arg(long)]
        desc: bool,
    },

    /// Print the shard that owns a key
    Locate { key: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    // Logs go to stderr so stdout carries only results
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = StoreConfig::from_env()?;
    tracing::debug!(
        shards = config.shards.len(),
        pool_size = config.pool_size,
        "Configuration loaded"
    );

    let store = ShardedStore::connect(&config)?;
    let output = run(&store, cli.command).await;
    println!("{output}");

    Ok(())
}

async fn run(store: &ShardedStore, command: Command) -> Value {
    match command {
        Command::Get { key } => json!(store.get(&key).await),
        Command::Set { key, value, ttl } => match ttl {
            Some(seconds) => json!(store.set_ex(&key, &value, seconds).await),
            None => json!(store.set(&key, &value).await),
        },
        Command::Del { key } => json!(store.del(&key).await),
        Command::Exists { key } => json!(store.exists(&key).await),
        Command::Incr { key, by } => json!(store.incr_by(&key, by).await),
        Command::Decr { key } => json!(store.decr(&key).await),
        Command::Expire { key, seconds } => json!(store.expire(&key, seconds).await),
        Command::Ttl { key } => json!(store.ttl(&key).await),
        Command::Push { key, values } => {
            let values: Vec<&str> = values.iter().map(String::as_str).collect();
            json!(store.add_list(&key, &values).await)
        }
        Command::Range { key, start, stop } => json!(store.range_list(&key, start, stop).await),
        Command::Sadd { key, members } => {
            let members: Vec<&str> = members.iter().map(String::as_str).collect();
            json!(store.add_set(&key, &members).await)
        }
        Command::Members { key } => {
            let mut members: Vec<String> = store.get_set(&key).await.into_iter().collect();
            members.sort();
            json!(members)
        }
        Command::Hset { key, field, value } => json!(store.set_hash(&key, &field, &value).await),
        Command::Hget { key, field } => json!(store.get_hash(&key, &field).await),
        Command::Zadd { key, score, member } => {
            json!(store.set_sorted_set(&key, score, &member).await)
        }
        Command::Zrange { key, min, max, desc } => {
            let order = if desc { Order::Descending } else { Order::Ascending };
            let min = min.unwrap_or(f64::NEG_INFINITY);
            let max = max.unwrap_or(f64::INFINITY);
            json!(store.sorted_set_by_score(&key, min, max, order).await)
        }
        Command::Locate { key } => json!(store.pool().shard_for(&key)),
    }
}
