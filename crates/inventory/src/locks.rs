//! Per-key async locks.
//!
//! Serializes read-modify-write sequences that target the same key while
//! leaving unrelated keys fully concurrent. Entries are created on first use
//! and removed once the last holder or waiter is gone.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug)]
pub struct KeyedLocks<K> {
    inner: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> KeyedLocks<K>
where
    K: Clone + Eq + Hash,
{
    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: K) -> KeyGuard<'_, K> {
        let slot = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let guard = slot.lock_owned().await;
        KeyGuard {
            table: self,
            key,
            guard: Some(guard),
        }
    }

    /// Number of keys currently tracked (held or awaited).
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one key; released on drop.
#[derive(Debug)]
pub struct KeyGuard<'a, K>
where
    K: Clone + Eq + Hash,
{
    table: &'a KeyedLocks<K>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K> Drop for KeyGuard<'_, K>
where
    K: Clone + Eq + Hash,
{
    fn drop(&mut self) {
        // Release first so the guard's Arc no longer counts as a holder.
        self.guard.take();

        let mut map = self
            .table
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = map.get(&self.key) {
            if Arc::strong_count(slot) == 1 {
                map.remove(&self.key);
            }
        }
    }
}
