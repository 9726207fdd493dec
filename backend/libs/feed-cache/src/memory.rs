//! In-process implementation of [`FeedCacheOps`]
//!
//! Behaves like the Redis tier for the commands the feed uses, with a logical
//! clock for TTLs, per-operation call counters, a write log, and failure
//! injection. Intended for tests and local development.

use crate::{CacheError, CacheResult, FeedCacheOps, FeedScore, ScoredMember};
use redis::{ErrorKind, RedisError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Cache operations, for counters and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOp {
    Exists,
    RangeByScore,
    RangeAll,
    Expire,
    GetHash,
    SetHash,
    AddMembers,
    Trim,
    Ping,
}

#[derive(Debug, Clone)]
enum Value {
    Hash(HashMap<String, String>),
    SortedSet(HashMap<String, FeedScore>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<u64>,
}

#[derive(Default)]
struct State {
    now: u64,
    entries: HashMap<String, Entry>,
    failing: HashSet<CacheOp>,
    calls: HashMap<CacheOp, usize>,
    write_log: Vec<(CacheOp, String)>,
}

impl State {
    fn enter(&mut self, op: CacheOp) -> CacheResult<()> {
        *self.calls.entry(op).or_insert(0) += 1;
        if self.failing.contains(&op) {
            return Err(CacheError::Redis(RedisError::from((
                ErrorKind::IoError,
                "injected cache failure",
            ))));
        }
        Ok(())
    }

    fn live(&mut self, key: &str) -> Option<&mut Entry> {
        let expired = matches!(
            self.entries.get(key),
            Some(Entry { expires_at: Some(at), .. }) if *at <= self.now
        );
        if expired {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn sorted_desc(set: &HashMap<String, FeedScore>) -> Vec<(String, FeedScore)> {
        let mut members: Vec<(String, FeedScore)> =
            set.iter().map(|(m, s)| (m.clone(), *s)).collect();
        // Redis orders equal scores lexicographically; reversed for ZREV*.
        members.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
        members
    }
}

fn wrong_type(key: &str, expected: &'static str) -> CacheError {
    CacheError::WrongType {
        key: key.to_string(),
        expected,
    }
}

#[derive(Clone, Default)]
pub struct InMemoryFeedCache {
    state: Arc<Mutex<State>>,
}

impl InMemoryFeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the logical clock forward; keys whose TTL runs out disappear.
    pub async fn advance(&self, secs: u64) {
        self.state.lock().await.now += secs;
    }

    /// Make every call of `op` fail until [`heal`](Self::heal) is called.
    pub async fn fail(&self, op: CacheOp) {
        self.state.lock().await.failing.insert(op);
    }

    pub async fn heal(&self, op: CacheOp) {
        self.state.lock().await.failing.remove(&op);
    }

    pub async fn call_count(&self, op: CacheOp) -> usize {
        self.state.lock().await.calls.get(&op).copied().unwrap_or(0)
    }

    /// Successful writes in order, as `(operation, key)`.
    pub async fn write_log(&self) -> Vec<(CacheOp, String)> {
        self.state.lock().await.write_log.clone()
    }

    /// Remaining TTL in seconds; `None` when absent or persistent.
    pub async fn ttl(&self, key: &str) -> Option<u64> {
        let mut state = self.state.lock().await;
        let now = state.now;
        state
            .live(key)
            .and_then(|entry| entry.expires_at)
            .map(|at| at - now)
    }

    /// Sorted-set contents, highest score first.
    pub async fn members(&self, key: &str) -> Vec<(String, FeedScore)> {
        let mut state = self.state.lock().await;
        match state.live(key).map(|e| &e.value) {
            Some(Value::SortedSet(set)) => State::sorted_desc(set),
            _ => Vec::new(),
        }
    }

    pub async fn hash(&self, key: &str) -> Option<HashMap<String, String>> {
        let mut state = self.state.lock().await;
        match state.live(key).map(|e| &e.value) {
            Some(Value::Hash(fields)) => Some(fields.clone()),
            _ => None,
        }
    }

    /// Overwrite a single hash field, creating nothing if the hash is absent.
    pub async fn corrupt_field(&self, key: &str, field: &str, value: Option<&str>) {
        let mut state = self.state.lock().await;
        if let Some(Entry {
            value: Value::Hash(fields),
            ..
        }) = state.live(key)
        {
            match value {
                Some(v) => {
                    fields.insert(field.to_string(), v.to_string());
                }
                None => {
                    fields.remove(field);
                }
            }
        }
    }

    /// Drop a key regardless of TTL, as an eviction would.
    pub async fn evict(&self, key: &str) {
        self.state.lock().await.entries.remove(key);
    }
}

#[async_trait::async_trait]
impl FeedCacheOps for InMemoryFeedCache {
    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut state = self.state.lock().await;
        state.enter(CacheOp::Exists)?;
        Ok(state.live(key).is_some())
    }

    async fn range_by_score(
        &self,
        key: &str,
        min: FeedScore,
        max: FeedScore,
        offset: usize,
        count: usize,
    ) -> CacheResult<Vec<String>> {
        let mut state = self.state.lock().await;
        state.enter(CacheOp::RangeByScore)?;
        match state.live(key).map(|e| &e.value) {
            None => Ok(Vec::new()),
            Some(Value::SortedSet(set)) => Ok(State::sorted_desc(set)
                .into_iter()
                .filter(|(_, score)| *score >= min && *score <= max)
                .skip(offset)
                .take(count)
                .map(|(member, _)| member)
                .collect()),
            Some(Value::Hash(_)) => Err(wrong_type(key, "sorted set")),
        }
    }

    async fn range_all(&self, key: &str) -> CacheResult<Vec<String>> {
        let mut state = self.state.lock().await;
        state.enter(CacheOp::RangeAll)?;
        match state.live(key).map(|e| &e.value) {
            None => Ok(Vec::new()),
            Some(Value::SortedSet(set)) => Ok(State::sorted_desc(set)
                .into_iter()
                .map(|(member, _)| member)
                .collect()),
            Some(Value::Hash(_)) => Err(wrong_type(key, "sorted set")),
        }
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> CacheResult<()> {
        let mut state = self.state.lock().await;
        state.enter(CacheOp::Expire)?;
        let deadline = state.now + ttl_secs;
        if let Some(entry) = state.live(key) {
            entry.expires_at = Some(deadline);
        }
        Ok(())
    }

    async fn get_hash(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        let mut state = self.state.lock().await;
        state.enter(CacheOp::GetHash)?;
        match state.live(key).map(|e| &e.value) {
            None => Ok(HashMap::new()),
            Some(Value::Hash(fields)) => Ok(fields.clone()),
            Some(Value::SortedSet(_)) => Err(wrong_type(key, "hash")),
        }
    }

    async fn set_hash(
        &self,
        key: &str,
        fields: &[(String, String)],
        ttl_secs: u64,
    ) -> CacheResult<()> {
        let mut state = self.state.lock().await;
        state.enter(CacheOp::SetHash)?;
        if fields.is_empty() {
            return Err(CacheError::InvalidData(format!(
                "refusing to write empty hash at {}",
                key
            )));
        }

        let deadline = state.now + ttl_secs;
        match state.live(key) {
            Some(Entry {
                value: Value::SortedSet(_),
                ..
            }) => return Err(wrong_type(key, "hash")),
            Some(entry) => {
                if let Value::Hash(existing) = &mut entry.value {
                    existing.extend(fields.iter().cloned());
                }
                entry.expires_at = Some(deadline);
            }
            None => {
                state.entries.insert(
                    key.to_string(),
                    Entry {
                        value: Value::Hash(fields.iter().cloned().collect()),
                        expires_at: Some(deadline),
                    },
                );
            }
        }
        state.write_log.push((CacheOp::SetHash, key.to_string()));
        Ok(())
    }

    async fn add_members(&self, key: &str, members: &[ScoredMember]) -> CacheResult<()> {
        let mut state = self.state.lock().await;
        state.enter(CacheOp::AddMembers)?;
        if members.is_empty() {
            return Ok(());
        }

        match state.live(key) {
            Some(Entry {
                value: Value::Hash(_),
                ..
            }) => return Err(wrong_type(key, "sorted set")),
            Some(Entry {
                value: Value::SortedSet(set),
                ..
            }) => {
                for entry in members {
                    set.insert(entry.member.clone(), entry.score);
                }
            }
            None => {
                let set = members
                    .iter()
                    .map(|entry| (entry.member.clone(), entry.score))
                    .collect();
                state.entries.insert(
                    key.to_string(),
                    Entry {
                        value: Value::SortedSet(set),
                        expires_at: None,
                    },
                );
            }
        }
        state.write_log.push((CacheOp::AddMembers, key.to_string()));
        Ok(())
    }

    async fn trim_to_newest(&self, key: &str, keep: usize) -> CacheResult<usize> {
        let mut state = self.state.lock().await;
        state.enter(CacheOp::Trim)?;
        let removed = match state.live(key) {
            None => 0,
            Some(Entry {
                value: Value::Hash(_),
                ..
            }) => return Err(wrong_type(key, "sorted set")),
            Some(Entry {
                value: Value::SortedSet(set),
                ..
            }) => {
                let stale: Vec<String> = State::sorted_desc(set)
                    .into_iter()
                    .skip(keep)
                    .map(|(member, _)| member)
                    .collect();
                for member in &stale {
                    set.remove(member);
                }
                stale.len()
            }
        };
        if removed > 0 {
            state.write_log.push((CacheOp::Trim, key.to_string()));
        }
        Ok(removed)
    }

    async fn ping(&self) -> CacheResult<()> {
        self.state.lock().await.enter(CacheOp::Ping)
    }
}
