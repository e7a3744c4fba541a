//! Key/value storage with expiry and per-key locking

use crate::error::MemoryError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

type LockMap = Arc<std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Held while a read-modify-write cycle on one key is in progress
///
/// Dropping the guard releases the key, then runs the store's release hook
/// if one was given.
pub struct KeyGuard {
    guard: Option<OwnedMutexGuard<()>>,
    on_release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl KeyGuard {
    /// Guard over an acquired per-key mutex
    pub fn new(guard: OwnedMutexGuard<()>) -> Self {
        Self {
            guard: Some(guard),
            on_release: None,
        }
    }

    /// Guard that calls `on_release` after the mutex is unlocked
    pub fn with_release(guard: OwnedMutexGuard<()>, on_release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            guard: Some(guard),
            on_release: Some(Box::new(on_release)),
        }
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.guard.take();
        if let Some(on_release) = self.on_release.take() {
            on_release();
        }
    }
}

impl fmt::Debug for KeyGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGuard").field("held", &self.guard.is_some()).finish()
    }
}

/// Storage behind conversation memory
///
/// Implemented in-process by [`InMemoryStore`]; a networked cache can sit
/// behind the same contract.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Value stored under `key`, if present and not expired
    async fn load(&self, key: &str) -> Result<Option<String>, MemoryError>;

    /// Store `value` under `key` for `ttl`
    async fn store(&self, key: &str, value: String, ttl: Duration) -> Result<(), MemoryError>;

    /// Wait for exclusive access to `key`
    async fn lock(&self, key: &str) -> Result<KeyGuard, MemoryError>;
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process store with lazy expiry
///
/// Per-key mutexes live only while some caller holds or waits for them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    locks: LockMap,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().await.values().filter(|e| e.expires_at > now).count()
    }

    /// Whether the store holds no live entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of keys currently locked or awaited
    pub fn active_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Forget the mutex of `key` once nobody but the map refers to it
fn prune_lock(locks: &LockMap, key: &str) {
    let mut locks = locks.lock().unwrap_or_else(PoisonError::into_inner);
    if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
        locks.remove(key);
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn load(&self, key: &str) -> Result<Option<String>, MemoryError> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn store(&self, key: &str, value: String, ttl: Duration) -> Result<(), MemoryError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| MemoryError::Store(format!("TTL {:?} out of range", ttl)))?;
        self.entries
            .lock()
            .await
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn lock(&self, key: &str) -> Result<KeyGuard, MemoryError> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries left behind by cancelled waiters
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        let guard = lock.lock_owned().await;

        let locks = Arc::clone(&self.locks);
        let key = key.to_string();
        Ok(KeyGuard::with_release(guard, move || prune_lock(&locks, &key)))
    }
}
