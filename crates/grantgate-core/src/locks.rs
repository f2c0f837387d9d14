//! Per-pair serialization
//!
//! Every operation that reads and then writes a grant holds the lock for its
//! (granter, grantee) pair for the whole read-transfer-commit span. Distinct
//! pairs never contend.

use std::sync::Arc;

use dashmap::DashMap;
use grantgate_types::GrantKey;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily created async mutex per grant key
#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<GrantKey, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    pub async fn lock(&self, key: &GrantKey) -> KeyGuard<'_> {
        let mutex = self.locks.entry(key.clone()).or_default().clone();
        let guard = mutex.lock_owned().await;
        KeyGuard {
            owner: self,
            key: key.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys with a live lock entry
    pub fn active(&self) -> usize {
        self.locks.len()
    }
}

/// Held lock on one grant key; released on drop
pub struct KeyGuard<'a> {
    owner: &'a KeyedLocks,
    key: GrantKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Only the map's own reference left: nobody holds or waits on it
        self.owner
            .locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grantgate_types::Address;
    use std::time::Duration;

    fn key(granter: &str, grantee: &str) -> GrantKey {
        GrantKey::new(Address::parse(granter).unwrap(), Address::parse(grantee).unwrap())
    }

    #[tokio::test]
    async fn test_entries_removed_after_release() {
        let locks = KeyedLocks::new();
        {
            let _a = locks.lock(&key("cosmos1a", "cosmos1b")).await;
            let _b = locks.lock(&key("cosmos1a", "cosmos1c")).await;
            assert_eq!(locks.active(), 2);
        }
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let k = key("cosmos1a", "cosmos1b");

        let held = locks.lock(&k).await;
        let contender = {
            let locks = locks.clone();
            let k = k.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&k).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(held);
        contender.await.unwrap();
        assert_eq!(locks.active(), 0);
    }
}
