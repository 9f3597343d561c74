//! Per-resource mutual exclusion.
//!
//! The store's writes are multi-step and not transactional, so concurrent
//! operations on the same object must not interleave. [`LockRegistry`] maps
//! a resource key (see [`resource_key`]) to an async mutex, creating entries
//! lazily on first use. Operations on different keys never contend.
//!
//! Entries live in a sharded `DashMap`: the hot path is a shard read, and a
//! miss re-checks under the shard write guard before inserting, so two
//! racing first-users of a key always end up on the same entry. The shard
//! guard is never held across an await.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{watch, Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::debug;

/// Builds the resource key for an object: `ns/id`, with `%` and `/` in the
/// namespace escaped so the first `/` always separates the two halves.
#[must_use]
pub fn resource_key(ns: &str, id: &str) -> String {
    let mut key = String::with_capacity(ns.len() + id.len() + 1);
    for ch in ns.chars() {
        match ch {
            '%' => key.push_str("%25"),
            '/' => key.push_str("%2F"),
            _ => key.push(ch),
        }
    }
    key.push('/');
    key.push_str(id);
    key
}

/// Errors from lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    #[error("timed out after {timeout_ms}ms waiting for lock on {key}")]
    Timeout { key: String, timeout_ms: u64 },
}

/// A single exclusive-access entry.
#[derive(Debug)]
struct LockEntry {
    mutex: Arc<AsyncMutex<()>>,
    acquisitions: AtomicU64,
    last_used: Mutex<Instant>,
}

impl LockEntry {
    fn new() -> Self {
        Self {
            mutex: Arc::new(AsyncMutex::new(())),
            acquisitions: AtomicU64::new(0),
            last_used: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_used.lock() = Instant::now();
    }

    /// No holder and no waiter references this entry besides the registry.
    fn is_idle(self: &Arc<Self>, ttl: Duration) -> bool {
        Arc::strong_count(self) == 1
            && self.mutex.try_lock().is_ok()
            && self.last_used.lock().elapsed() >= ttl
    }
}

/// Registry of per-key async mutexes.
#[derive(Debug)]
pub struct LockRegistry {
    entries: DashMap<String, Arc<LockEntry>>,
    acquire_timeout: Option<Duration>,
}

impl LockRegistry {
    /// Creates a registry whose acquisitions wait indefinitely.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// Creates a registry with an optional acquisition timeout.
    #[must_use]
    pub fn with_timeout(acquire_timeout: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            acquire_timeout,
        }
    }

    /// Returns the entry for `key`, creating it if this is the first use.
    fn entry(&self, key: &str) -> Arc<LockEntry> {
        if let Some(existing) = self.entries.get(key) {
            return Arc::clone(existing.value());
        }
        // Re-checked under the shard write guard: a racing creator wins and
        // we share its entry.
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(LockEntry::new()));
        Arc::clone(entry.value())
    }

    /// Waits until the caller holds exclusive access to `key`.
    ///
    /// The lock is released when the returned guard is dropped, on every
    /// exit path. Locks are not reentrant: acquiring the same key twice
    /// from one operation deadlocks (or times out).
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Timeout`] if a timeout is configured and the
    /// key stays held for longer than that.
    pub async fn acquire(&self, key: &str) -> Result<ResourceGuard, LockError> {
        let entry = self.entry(key);
        let mutex = Arc::clone(&entry.mutex);

        let guard = match self.acquire_timeout {
            Some(timeout) => tokio::time::timeout(timeout, mutex.lock_owned())
                .await
                .map_err(|_elapsed| LockError::Timeout {
                    key: key.to_string(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })?,
            None => mutex.lock_owned().await,
        };

        entry.acquisitions.fetch_add(1, Ordering::Relaxed);
        entry.touch();
        debug!(key, "resource lock acquired");

        Ok(ResourceGuard {
            key: key.to_string(),
            entry,
            _guard: guard,
        })
    }

    /// Number of times `key` has been acquired since its entry was created.
    ///
    /// Returns 0 for keys with no entry.
    #[must_use]
    pub fn acquisitions(&self, key: &str) -> u64 {
        self.entries
            .get(key)
            .map_or(0, |e| e.acquisitions.load(Ordering::Relaxed))
    }

    /// Returns `true` if `key` is currently held.
    #[must_use]
    pub fn is_locked(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|e| e.mutex.try_lock().is_err())
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes entries that nobody holds or waits on and that have been idle
    /// for at least `ttl`. Returns the number removed.
    ///
    /// Evicting is safe: the next acquisition of the key creates a fresh,
    /// equivalent entry.
    pub fn sweep_idle(&self, ttl: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_idle(ttl));
        before.saturating_sub(self.entries.len())
    }

    /// Spawns a background task that calls [`sweep_idle`](Self::sweep_idle)
    /// every `interval` until `shutdown` flips to `true`.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        ttl: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = registry.sweep_idle(ttl);
                        if evicted > 0 {
                            debug!(evicted, remaining = registry.len(), "evicted idle resource locks");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    }
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard proving exclusive access to one resource key.
#[derive(Debug)]
pub struct ResourceGuard {
    key: String,
    entry: Arc<LockEntry>,
    _guard: OwnedMutexGuard<()>,
}

impl ResourceGuard {
    /// The key this guard holds.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Releases the lock now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        self.entry.touch();
        debug!(key = %self.key, "resource lock released");
    }
}
