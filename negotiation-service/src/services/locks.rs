use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// Per-key async exclusive locks. Mutations on the same key are serialized,
/// different keys proceed in parallel. An entry lives only while someone
/// holds or waits for its lock.
#[derive(Default)]
pub struct KeyedLocks {
    locks: Arc<LockMap>,
}

/// Holds one key's lock; releasing it drops the entry when nobody else is
/// waiting on the key.
pub struct KeyGuard {
    key: String,
    locks: Arc<LockMap>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &str) -> KeyGuard {
        // Clone the Arc out so the shard guard is released before awaiting.
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        KeyGuard {
            key: key.to_string(),
            locks: self.locks.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.guard.take();
        // The map's own reference is the only one left once no task holds or
        // awaits this mutex.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
