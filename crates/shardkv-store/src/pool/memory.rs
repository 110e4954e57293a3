//! In-process command interpreter.
//!
//! Answers the Redis commands `ShardedStore` issues with the same reply
//! shapes a server would send, so the facade can run without Redis (tests,
//! local tooling). Expiry is evaluated lazily against the wall clock.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use redis::{Arg, Cmd, ErrorKind, RedisError, RedisResult, Value};

use super::ShardPool;
use crate::error::{Result, StoreError};

#[derive(Debug, Clone)]
enum Entry {
    Str(String),
    List(VecDeque<String>),
    Set(HashSet<String>),
    Hash(HashMap<String, String>),
    ZSet(HashMap<String, f64>),
}

#[derive(Debug, Default)]
struct Keyspace {
    entries: HashMap<String, Entry>,
    /// Absolute expiry in unix milliseconds
    expires: HashMap<String, i64>,
}

/// Single-node in-memory backend.
#[derive(Debug, Default)]
pub struct MemoryPool {
    keyspace: Mutex<Keyspace>,
    offline: AtomicBool,
}

impl MemoryPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if no connection could be acquired.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of live keys.
    pub fn key_count(&self) -> usize {
        self.lock().map_or(0, |mut ks| {
            ks.purge_expired(now_ms());
            ks.entries.len()
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Keyspace>> {
        self.keyspace
            .lock()
            .map_err(|_| StoreError::Pool("memory keyspace lock poisoned".to_string()))
    }
}

#[async_trait]
impl ShardPool for MemoryPool {
    async fn execute(&self, _key: &str, cmd: &Cmd) -> Result<Value> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Pool("memory pool is offline".to_string()));
        }

        let args = cmd
            .args_iter()
            .map(|arg| match arg {
                Arg::Simple(bytes) => String::from_utf8(bytes.to_vec()).map_err(|_| {
                    err(ErrorKind::ClientError, "memory pool only stores UTF-8 arguments")
                }),
                Arg::Cursor => Err(err(ErrorKind::ClientError, "cursor arguments unsupported")),
            })
            .collect::<RedisResult<Vec<_>>>()?;

        let mut keyspace = self.lock()?;
        Ok(keyspace.apply(&args, now_ms())?)
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn err(kind: ErrorKind, msg: &'static str) -> RedisError {
    RedisError::from((kind, msg))
}

fn wrong_type() -> RedisError {
    RedisError::from((
        ErrorKind::TypeError,
        "WRONGTYPE",
        "Operation against a key holding the wrong kind of value".to_string(),
    ))
}

fn syntax() -> RedisError {
    err(ErrorKind::ResponseError, "ERR syntax error")
}

fn bulk(s: &str) -> Value {
    Value::BulkString(s.as_bytes().to_vec())
}

fn array<'a>(items: impl IntoIterator<Item = &'a String>) -> Value {
    Value::Array(items.into_iter().map(|s| bulk(s)).collect())
}

fn int(n: usize) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

/// Milliseconds for `seconds`, rejecting values that overflow.
fn seconds_to_ms(seconds: i64, command: &str) -> RedisResult<i64> {
    seconds.checked_mul(1000).ok_or_else(|| invalid_expire(command))
}

fn invalid_expire(command: &str) -> RedisError {
    RedisError::from((
        ErrorKind::ResponseError,
        "ERR invalid expire time",
        format!("in '{command}' command"),
    ))
}

fn parse_i64(s: &str) -> RedisResult<i64> {
    s.parse()
        .map_err(|_| err(ErrorKind::ResponseError, "ERR value is not an integer or out of range"))
}

/// Score bound: value plus whether it is exclusive (`(1.5`).
fn parse_bound(s: &str) -> RedisResult<(f64, bool)> {
    let (raw, exclusive) = s.strip_prefix('(').map_or((s, false), |rest| (rest, true));
    raw.parse::<f64>()
        .map(|v| (v, exclusive))
        .map_err(|_| err(ErrorKind::ResponseError, "ERR min or max is not a float"))
}

fn within(score: f64, min: (f64, bool), max: (f64, bool)) -> bool {
    let above = if min.1 { score > min.0 } else { score >= min.0 };
    let below = if max.1 { score < max.0 } else { score <= max.0 };
    above && below
}

/// Resolve Redis-style inclusive `start..=stop` (negative from the end).
fn index_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = i64::try_from(len).ok()?;
    let start = if start < 0 { (start + len).max(0) } else { start };
    let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((usize::try_from(start).ok()?, usize::try_from(stop).ok()?))
}

/// Redis-style glob: `*`, `?`, `[abc]`, `[a-z]`, `[^x]` and `\` escapes.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    glob_chars(&p, &t)
}

fn glob_chars(pattern: &[char], text: &[char]) -> bool {
    match (pattern, text) {
        ([], []) => true,
        ([], _) => false,
        (['*', rest @ ..], _) => {
            glob_chars(rest, text) || (!text.is_empty() && glob_chars(pattern, &text[1..]))
        }
        (_, []) => false,
        (['?', p_rest @ ..], [_, t_rest @ ..]) => glob_chars(p_rest, t_rest),
        (['[', p_rest @ ..], [ch, t_rest @ ..]) => match p_rest.iter().position(|&c| c == ']') {
            None => *ch == '[' && glob_chars(p_rest, t_rest),
            Some(end) => {
                class_match(&p_rest[..end], *ch) && glob_chars(&p_rest[end + 1..], t_rest)
            }
        },
        (['\\', escaped, p_rest @ ..], [ch, t_rest @ ..]) => {
            escaped == ch && glob_chars(p_rest, t_rest)
        }
        ([p, p_rest @ ..], [ch, t_rest @ ..]) => p == ch && glob_chars(p_rest, t_rest),
    }
}

fn class_match(class: &[char], ch: char) -> bool {
    let (negate, class) = match class.first() {
        Some('^') => (true, &class[1..]),
        _ => (false, class),
    };
    let mut found = false;
    let mut i = 0;
    while i < class.len() {
        if i + 2 < class.len() && class[i + 1] == '-' {
            let (lo, hi) = if class[i] <= class[i + 2] {
                (class[i], class[i + 2])
            } else {
                (class[i + 2], class[i])
            };
            found |= (lo..=hi).contains(&ch);
            i += 3;
        } else {
            found |= class[i] == ch;
            i += 1;
        }
    }
    found != negate
}

fn sorted_members(zset: &HashMap<String, f64>, rev: bool) -> Vec<(&String, f64)> {
    let mut members: Vec<(&String, f64)> = zset.iter().map(|(m, &s)| (m, s)).collect();
    members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    if rev {
        members.reverse();
    }
    members
}

macro_rules! typed {
    ($entry:expr, $variant:ident) => {
        match $entry {
            Entry::$variant(inner) => inner,
            _ => return Err(wrong_type()),
        }
    };
}

impl Keyspace {
    fn purge_expired(&mut self, now: i64) {
        let expired: Vec<String> = self
            .expires
            .iter()
            .filter(|&(_, &at)| at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.remove(&key);
        }
    }

    fn remove(&mut self, key: &str) -> bool {
        self.expires.remove(key);
        self.entries.remove(key).is_some()
    }

    fn evict_if_due(&mut self, key: &str, now: i64) {
        if self.expires.get(key).is_some_and(|&at| at <= now) {
            self.remove(key);
        }
    }

    fn get(&mut self, key: &str, now: i64) -> Option<&mut Entry> {
        self.evict_if_due(key, now);
        self.entries.get_mut(key)
    }

    fn get_or_insert(&mut self, key: &str, now: i64, empty: fn() -> Entry) -> &mut Entry {
        self.evict_if_due(key, now);
        self.entries.entry(key.to_string()).or_insert_with(empty)
    }

    /// Drop containers emptied by a removal, as Redis does.
    fn prune(&mut self, key: &str) {
        let empty = match self.entries.get(key) {
            Some(Entry::List(l)) => l.is_empty(),
            Some(Entry::Set(s)) => s.is_empty(),
            Some(Entry::Hash(h)) => h.is_empty(),
            Some(Entry::ZSet(z)) => z.is_empty(),
            _ => false,
        };
        if empty {
            self.remove(key);
        }
    }

    fn set_expiry(&mut self, key: &str, at_ms: i64, now: i64) -> Value {
        if self.get(key, now).is_none() {
            return Value::Int(0);
        }
        if at_ms <= now {
            self.remove(key);
        } else {
            self.expires.insert(key.to_string(), at_ms);
        }
        Value::Int(1)
    }

    #[allow(clippy::too_many_lines)]
    fn apply(&mut self, args: &[String], now: i64) -> RedisResult<Value> {
        let Some((name, rest)) = args.split_first() else {
            return Err(err(ErrorKind::ClientError, "empty command"));
        };
        let name = name.to_ascii_uppercase();
        let arity = |n: usize| {
            if rest.len() < n {
                Err(err(ErrorKind::ResponseError, "ERR wrong number of arguments"))
            } else {
                Ok(())
            }
        };

        match name.as_str() {
            "PING" => Ok(Value::SimpleString("PONG".to_string())),

            // ---------------------------------------------------------------
            // Keys & strings
            // ---------------------------------------------------------------
            "GET" => {
                arity(1)?;
                match self.get(&rest[0], now) {
                    Some(Entry::Str(s)) => Ok(bulk(s)),
                    Some(_) => Err(wrong_type()),
                    None => Ok(Value::Nil),
                }
            }
            "SET" => {
                arity(2)?;
                self.remove(&rest[0]);
                self.entries
                    .insert(rest[0].clone(), Entry::Str(rest[1].clone()));
                Ok(Value::Okay)
            }
            "SETEX" => {
                arity(3)?;
                let seconds = parse_i64(&rest[1])?;
                if seconds <= 0 {
                    return Err(invalid_expire("setex"));
                }
                let at = seconds_to_ms(seconds, "setex")?
                    .checked_add(now)
                    .ok_or_else(|| invalid_expire("setex"))?;
                self.remove(&rest[0]);
                self.entries
                    .insert(rest[0].clone(), Entry::Str(rest[2].clone()));
                self.expires.insert(rest[0].clone(), at);
                Ok(Value::Okay)
            }
            "DEL" => {
                arity(1)?;
                let removed = rest
                    .iter()
                    .filter(|key| self.get(key, now).is_some() && self.remove(key))
                    .count();
                Ok(int(removed))
            }
            "EXISTS" => {
                arity(1)?;
                let found = rest.iter().filter(|key| self.get(key, now).is_some()).count();
                Ok(int(found))
            }
            "EXPIRE" => {
                arity(2)?;
                let at = seconds_to_ms(parse_i64(&rest[1])?, "expire")?
                    .checked_add(now)
                    .ok_or_else(|| invalid_expire("expire"))?;
                Ok(self.set_expiry(&rest[0], at, now))
            }
            "EXPIREAT" => {
                arity(2)?;
                let at = seconds_to_ms(parse_i64(&rest[1])?, "expireat")?;
                Ok(self.set_expiry(&rest[0], at, now))
            }
            "TTL" => {
                arity(1)?;
                if self.get(&rest[0], now).is_none() {
                    return Ok(Value::Int(-2));
                }
                Ok(Value::Int(
                    self.expires
                        .get(&rest[0])
                        .map_or(-1, |&at| (at - now).saturating_add(500) / 1000),
                ))
            }
            "INCR" | "DECR" | "INCRBY" | "DECRBY" => {
                arity(if name.ends_with("BY") { 2 } else { 1 })?;
                let delta = match name.as_str() {
                    "INCR" => 1,
                    "DECR" => -1,
                    "INCRBY" => parse_i64(&rest[1])?,
                    _ => -parse_i64(&rest[1])?,
                };
                let current = match self.get(&rest[0], now) {
                    Some(Entry::Str(s)) => parse_i64(s)?,
                    Some(_) => return Err(wrong_type()),
                    None => 0,
                };
                let next = current.checked_add(delta).ok_or_else(|| {
                    err(ErrorKind::ResponseError, "ERR increment or decrement would overflow")
                })?;
                match self.get(&rest[0], now) {
                    Some(entry) => *entry = Entry::Str(next.to_string()),
                    None => {
                        self.entries
                            .insert(rest[0].clone(), Entry::Str(next.to_string()));
                    }
                }
                Ok(Value::Int(next))
            }

            // ---------------------------------------------------------------
            // Lists
            // ---------------------------------------------------------------
            "LPUSH" | "RPUSH" => {
                arity(2)?;
                let entry = self.get_or_insert(&rest[0], now, || Entry::List(VecDeque::new()));
                let list = typed!(entry, List);
                for value in &rest[1..] {
                    if name == "LPUSH" {
                        list.push_front(value.clone());
                    } else {
                        list.push_back(value.clone());
                    }
                }
                Ok(int(list.len()))
            }
            "LRANGE" => {
                arity(3)?;
                let (start, stop) = (parse_i64(&rest[1])?, parse_i64(&rest[2])?);
                match self.get(&rest[0], now) {
                    None => Ok(Value::Array(vec![])),
                    Some(entry) => {
                        let list = typed!(entry, List);
                        Ok(match index_range(list.len(), start, stop) {
                            Some((from, to)) => array(list.range(from..=to)),
                            None => Value::Array(vec![]),
                        })
                    }
                }
            }
            "LTRIM" => {
                arity(3)?;
                let (start, stop) = (parse_i64(&rest[1])?, parse_i64(&rest[2])?);
                if let Some(entry) = self.get(&rest[0], now) {
                    let list = typed!(entry, List);
                    match index_range(list.len(), start, stop) {
                        Some((from, to)) => {
                            list.truncate(to + 1);
                            list.drain(..from);
                        }
                        None => list.clear(),
                    }
                    self.prune(&rest[0]);
                }
                Ok(Value::Okay)
            }
            "LLEN" => {
                arity(1)?;
                match self.get(&rest[0], now) {
                    None => Ok(Value::Int(0)),
                    Some(entry) => Ok(int(typed!(entry, List).len())),
                }
            }
            "LREM" => {
                arity(3)?;
                let count = parse_i64(&rest[1])?;
                let target = &rest[2];
                let removed = match self.get(&rest[0], now) {
                    None => 0,
                    Some(entry) => {
                        let list = typed!(entry, List);
                        let limit = if count == 0 {
                            usize::MAX
                        } else {
                            usize::try_from(count.unsigned_abs()).unwrap_or(usize::MAX)
                        };
                        let mut removed = 0;
                        if count >= 0 {
                            let mut i = 0;
                            while i < list.len() && removed < limit {
                                if &list[i] == target {
                                    list.remove(i);
                                    removed += 1;
                                } else {
                                    i += 1;
                                }
                            }
                        } else {
                            let mut i = list.len();
                            while i > 0 && removed < limit {
                                i -= 1;
                                if &list[i] == target {
                                    list.remove(i);
                                    removed += 1;
                                }
                            }
                        }
                        removed
                    }
                };
                self.prune(&rest[0]);
                Ok(int(removed))
            }

            // ---------------------------------------------------------------
            // Sets
            // ---------------------------------------------------------------
            "SADD" => {
                arity(2)?;
                let entry = self.get_or_insert(&rest[0], now, || Entry::Set(HashSet::new()));
                let set = typed!(entry, Set);
                let added = rest[1..].iter().filter(|m| set.insert((*m).clone())).count();
                Ok(int(added))
            }
            "SREM" => {
                arity(2)?;
                let removed = match self.get(&rest[0], now) {
                    None => 0,
                    Some(entry) => {
                        let set = typed!(entry, Set);
                        rest[1..].iter().filter(|m| set.remove(*m)).count()
                    }
                };
                self.prune(&rest[0]);
                Ok(int(removed))
            }
            "SMEMBERS" => {
                arity(1)?;
                match self.get(&rest[0], now) {
                    None => Ok(Value::Array(vec![])),
                    Some(entry) => Ok(array(typed!(entry, Set).iter())),
                }
            }
            "SCARD" => {
                arity(1)?;
                match self.get(&rest[0], now) {
                    None => Ok(Value::Int(0)),
                    Some(entry) => Ok(int(typed!(entry, Set).len())),
                }
            }
            "SISMEMBER" => {
                arity(2)?;
                match self.get(&rest[0], now) {
                    None => Ok(Value::Int(0)),
                    Some(entry) => {
                        let found = typed!(entry, Set).contains(&rest[1]);
                        Ok(Value::Int(i64::from(found)))
                    }
                }
            }

            // ---------------------------------------------------------------
            // Hashes
            // ---------------------------------------------------------------
            "HSET" => {
                arity(3)?;
                if rest[1..].len() % 2 != 0 {
                    return Err(syntax());
                }
                let entry = self.get_or_insert(&rest[0], now, || Entry::Hash(HashMap::new()));
                let hash = typed!(entry, Hash);
                let added = rest[1..]
                    .chunks_exact(2)
                    .filter(|pair| hash.insert(pair[0].clone(), pair[1].clone()).is_none())
                    .count();
                Ok(int(added))
            }
            "HGET" => {
                arity(2)?;
                match self.get(&rest[0], now) {
                    None => Ok(Value::Nil),
                    Some(entry) => Ok(typed!(entry, Hash)
                        .get(&rest[1])
                        .map_or(Value::Nil, |v| bulk(v))),
                }
            }
            "HDEL" => {
                arity(2)?;
                let removed = match self.get(&rest[0], now) {
                    None => 0,
                    Some(entry) => {
                        let hash = typed!(entry, Hash);
                        rest[1..].iter().filter(|f| hash.remove(*f).is_some()).count()
                    }
                };
                self.prune(&rest[0]);
                Ok(int(removed))
            }
            "HEXISTS" => {
                arity(2)?;
                match self.get(&rest[0], now) {
                    None => Ok(Value::Int(0)),
                    Some(entry) => {
                        let found = typed!(entry, Hash).contains_key(&rest[1]);
                        Ok(Value::Int(i64::from(found)))
                    }
                }
            }
            "HVALS" | "HKEYS" => {
                arity(1)?;
                match self.get(&rest[0], now) {
                    None => Ok(Value::Array(vec![])),
                    Some(entry) => {
                        let hash = typed!(entry, Hash);
                        Ok(if name == "HVALS" {
                            array(hash.values())
                        } else {
                            array(hash.keys())
                        })
                    }
                }
            }
            "HLEN" => {
                arity(1)?;
                match self.get(&rest[0], now) {
                    None => Ok(Value::Int(0)),
                    Some(entry) => Ok(int(typed!(entry, Hash).len())),
                }
            }
            "HSCAN" => {
                // The whole hash comes back in one page with cursor 0.
                arity(2)?;
                let mut pattern = "*";
                let mut opts = rest[2..].iter();
                while let Some(opt) = opts.next() {
                    let value = opts.next().ok_or_else(syntax)?;
                    match opt.to_ascii_uppercase().as_str() {
                        "MATCH" => pattern = value.as_str(),
                        "COUNT" => {
                            parse_i64(value)?;
                        }
                        _ => return Err(syntax()),
                    }
                }
                let mut page = Vec::new();
                if let Some(entry) = self.get(&rest[0], now) {
                    let hash = typed!(entry, Hash);
                    let mut fields: Vec<(&String, &String)> = hash
                        .iter()
                        .filter(|(field, _)| glob_match(pattern, field))
                        .collect();
                    fields.sort();
                    for (field, value) in fields {
                        page.push(bulk(field));
                        page.push(bulk(value));
                    }
                }
                Ok(Value::Array(vec![bulk("0"), Value::Array(page)]))
            }

            // ---------------------------------------------------------------
            // Sorted sets
            // ---------------------------------------------------------------
            "ZADD" => {
                arity(3)?;
                if rest[1..].len() % 2 != 0 {
                    return Err(syntax());
                }
                let pairs = rest[1..]
                    .chunks_exact(2)
                    .map(|pair| {
                        pair[0]
                            .parse::<f64>()
                            .map(|score| (pair[1].clone(), score))
                            .map_err(|_| {
                                err(ErrorKind::ResponseError, "ERR value is not a valid float")
                            })
                    })
                    .collect::<RedisResult<Vec<_>>>()?;
                let entry = self.get_or_insert(&rest[0], now, || Entry::ZSet(HashMap::new()));
                let zset = typed!(entry, ZSet);
                let added = pairs
                    .into_iter()
                    .filter(|(member, score)| zset.insert(member.clone(), *score).is_none())
                    .count();
                Ok(int(added))
            }
            "ZREM" => {
                arity(2)?;
                let removed = match self.get(&rest[0], now) {
                    None => 0,
                    Some(entry) => {
                        let zset = typed!(entry, ZSet);
                        rest[1..].iter().filter(|m| zset.remove(*m).is_some()).count()
                    }
                };
                self.prune(&rest[0]);
                Ok(int(removed))
            }
            "ZRANGE" | "ZREVRANGE" => {
                arity(3)?;
                let (start, stop) = (parse_i64(&rest[1])?, parse_i64(&rest[2])?);
                match self.get(&rest[0], now) {
                    None => Ok(Value::Array(vec![])),
                    Some(entry) => {
                        let members = sorted_members(typed!(entry, ZSet), name == "ZREVRANGE");
                        Ok(match index_range(members.len(), start, stop) {
                            Some((from, to)) => array(members[from..=to].iter().map(|(m, _)| *m)),
                            None => Value::Array(vec![]),
                        })
                    }
                }
            }
            "ZRANGEBYSCORE" | "ZREVRANGEBYSCORE" | "ZCOUNT" => {
                arity(3)?;
                let rev = name == "ZREVRANGEBYSCORE";
                // ZREVRANGEBYSCORE takes max before min.
                let (min, max) = if rev {
                    (parse_bound(&rest[2])?, parse_bound(&rest[1])?)
                } else {
                    (parse_bound(&rest[1])?, parse_bound(&rest[2])?)
                };
                let members: Vec<&String> = match self.get(&rest[0], now) {
                    None => vec![],
                    Some(entry) => sorted_members(typed!(entry, ZSet), rev)
                        .into_iter()
                        .filter(|(_, score)| within(*score, min, max))
                        .map(|(member, _)| member)
                        .collect(),
                };
                if name == "ZCOUNT" {
                    Ok(int(members.len()))
                } else {
                    Ok(array(members))
                }
            }
            "ZSCORE" => {
                arity(2)?;
                match self.get(&rest[0], now) {
                    None => Ok(Value::Nil),
                    Some(entry) => Ok(typed!(entry, ZSet)
                        .get(&rest[1])
                        .map_or(Value::Nil, |score| bulk(&score.to_string()))),
                }
            }

            _ => Err(RedisError::from((
                ErrorKind::ResponseError,
                "ERR unknown command",
                name,
            ))),
        }
    }
}
