//! In-memory grant store
//!
//! Thread-safe and designed for concurrent access. Records live in a map
//! ordered by (granter, grantee) so granter queries are range scans.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use grantgate_types::{Address, Grant, GrantKey, GrantRecord};
use tokio::sync::RwLock;

use crate::{GrantStore, StoreError, StoreResult};

/// Grant store backed by a process-local map
#[derive(Clone, Default)]
pub struct MemoryGrantStore {
    records: Arc<RwLock<BTreeMap<GrantKey, GrantRecord>>>,
    /// Last version stamp handed out
    versions: Arc<AtomicU64>,
}

impl MemoryGrantStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn next_version(&self) -> u64 {
        self.versions.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn record(&self, grant: Grant) -> GrantRecord {
        GrantRecord {
            grant,
            version: self.next_version(),
            updated_at: Utc::now(),
        }
    }

    /// Number of stored grants
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl GrantStore for MemoryGrantStore {
    async fn get(&self, key: &GrantKey) -> StoreResult<Option<GrantRecord>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&self, grant: Grant) -> StoreResult<GrantRecord> {
        let mut records = self.records.write().await;
        let record = self.record(grant);
        records.insert(record.key(), record.clone());
        Ok(record)
    }

    async fn compare_and_swap(
        &self,
        key: &GrantKey,
        expected_version: u64,
        next: Option<Grant>,
    ) -> StoreResult<Option<GrantRecord>> {
        let mut records = self.records.write().await;

        let found = records.get(key).map(|r| r.version);
        if found != Some(expected_version) {
            return Err(StoreError::Conflict {
                key: key.clone(),
                expected: expected_version,
                found,
            });
        }

        match next {
            Some(grant) => {
                let record = self.record(grant);
                records.insert(key.clone(), record.clone());
                Ok(Some(record))
            }
            None => {
                records.remove(key);
                Ok(None)
            }
        }
    }

    async fn delete(&self, key: &GrantKey) -> StoreResult<Option<GrantRecord>> {
        Ok(self.records.write().await.remove(key))
    }

    async fn list_by_granter(&self, granter: &Address) -> StoreResult<Vec<GrantRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .skip_while(|(key, _)| &key.granter < granter)
            .take_while(|(key, _)| &key.granter == granter)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn list_by_grantee(&self, grantee: &Address) -> StoreResult<Vec<GrantRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|(key, _)| &key.grantee == grantee)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn list_all(&self) -> StoreResult<Vec<GrantRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}
