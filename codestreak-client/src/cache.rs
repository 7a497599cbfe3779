use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// `kind:identity`, e.g. `profile:alice`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(kind: &str, identity: impl fmt::Display) -> Self {
        Self(format!("{kind}:{identity}"))
    }
    pub fn friends(owner: &str) -> Self {
        Self::new("friends", owner)
    }
    pub fn received_requests(owner: &str) -> Self {
        Self::new("friend_requests.received", owner)
    }
    pub fn sent_requests(owner: &str) -> Self {
        Self::new("friend_requests.sent", owner)
    }
    pub fn friend_streaks(owner: &str) -> Self {
        Self::new("streaks", owner)
    }
    pub fn received_streak_requests(owner: &str) -> Self {
        Self::new("streak_requests.received", owner)
    }
    pub fn sent_streak_requests(owner: &str) -> Self {
        Self::new("streak_requests.sent", owner)
    }
    pub fn profile(username: &str) -> Self {
        Self::new("profile", username.to_lowercase())
    }
    pub fn stats(username: &str) -> Self {
        Self::new("stats", username.to_lowercase())
    }
    pub fn solves(username: &str) -> Self {
        Self::new("solves", username.to_lowercase())
    }
    pub fn achievements(username: &str) -> Self {
        Self::new("achievements", username.to_lowercase())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Best-effort store for read-mostly responses. Failures are logged, never returned.
pub trait ResponseCache: Send + Sync {
    fn get_value(&self, key: &str) -> Option<Value>;
    fn put_value(&self, key: &str, value: Value, ttl: Option<Duration>);
    fn remove(&self, key: &str);
}

pub trait ResponseCacheExt: ResponseCache {
    fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let value = self.get_value(key.as_str())?;
        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%key, %err, "dropping undecodable cache entry");
                self.remove(key.as_str());
                None
            }
        }
    }
    fn put<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Option<Duration>) {
        match serde_json::to_value(value) {
            Ok(value) => self.put_value(key.as_str(), value, ttl),
            Err(err) => warn!(%key, %err, "could not encode cache entry"),
        }
    }
}

impl<C: ResponseCache + ?Sized> ResponseCacheExt for C {}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Value, Option<Instant>)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResponseCache for MemoryCache {
    fn get_value(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock();
        let expired = matches!(entries.get(key), Some((_, Some(deadline))) if *deadline <= Instant::now());
        if expired {
            debug!(key, "cache entry expired");
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|(value, _)| value.clone())
    }
    fn put_value(&self, key: &str, value: Value, ttl: Option<Duration>) {
        // A TTL past the clock's range never expires.
        let deadline = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.entries.lock().insert(key.to_string(), (value, deadline));
    }
    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

#[derive(Serialize, Deserialize)]
struct SledEntry {
    value: Value,
    /// Unix millis.
    expires_at: Option<i64>,
}

/// Survives restarts, so the first frame after launch can be painted from disk.
#[derive(Clone)]
pub struct SledCache {
    tree: sled::Tree,
}

impl SledCache {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path).with_context(|| format!("opening cache at {}", path.display()))?;
        Self::from_db(&db)
    }

    pub fn from_db(db: &sled::Db) -> anyhow::Result<Self> {
        Ok(Self { tree: db.open_tree("responses").context("opening responses tree")? })
    }

    fn try_get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let Some(bytes) = self.tree.get(key)? else {
            return Ok(None);
        };
        let entry: SledEntry = serde_json::from_slice(&bytes).with_context(|| format!("decoding {key}"))?;
        if entry.expires_at.is_some_and(|at| at <= chrono::Utc::now().timestamp_millis()) {
            debug!(key, "cache entry expired");
            self.tree.remove(key)?;
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    fn try_put(&self, key: &str, value: Value, ttl: Option<Duration>) -> anyhow::Result<()> {
        let expires_at = ttl.map(|ttl| {
            chrono::Utc::now().timestamp_millis().saturating_add(ttl.as_millis().min(i64::MAX as u128) as i64)
        });
        self.tree.insert(key, serde_json::to_vec(&SledEntry { value, expires_at })?)?;
        Ok(())
    }
}

impl ResponseCache for SledCache {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.try_get(key).unwrap_or_else(|err| {
            warn!(key, "cache read failed: {err:#}");
            None
        })
    }
    fn put_value(&self, key: &str, value: Value, ttl: Option<Duration>) {
        if let Err(err) = self.try_put(key, value, ttl) {
            warn!(key, "cache write failed: {err:#}");
        }
    }
    fn remove(&self, key: &str) {
        if let Err(err) = self.tree.remove(key) {
            warn!(key, %err, "cache remove failed");
        }
    }
}
