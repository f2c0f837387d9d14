//! Persistent grant store on an embedded sled database
//!
//! Records are stored as JSON under `granter \0 grantee`. Addresses never
//! contain control characters, so a granter's grants form one key prefix.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use grantgate_types::{Address, Grant, GrantKey, GrantRecord};
use sled::{CompareAndSwapError, IVec, Tree};

use crate::{GrantStore, StoreError, StoreResult};

const GRANTS_TREE: &str = "grants";
const KEY_SEPARATOR: u8 = 0;

/// Grant store backed by sled
#[derive(Clone)]
pub struct SledGrantStore {
    db: sled::Db,
    grants: Tree,
}

impl SledGrantStore {
    /// Open (or create) a database at `path`
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Use an already opened database
    pub fn from_db(db: sled::Db) -> StoreResult<Self> {
        let grants = db.open_tree(GRANTS_TREE)?;
        tracing::debug!(records = grants.len(), "Opened grant tree");
        Ok(Self { db, grants })
    }

    fn prefix(granter: &Address) -> Vec<u8> {
        let mut prefix = granter.as_str().as_bytes().to_vec();
        prefix.push(KEY_SEPARATOR);
        prefix
    }

    fn encode_key(key: &GrantKey) -> Vec<u8> {
        let mut bytes = Self::prefix(&key.granter);
        bytes.extend_from_slice(key.grantee.as_str().as_bytes());
        bytes
    }

    fn decode(key: &[u8], value: &IVec) -> StoreResult<GrantRecord> {
        serde_json::from_slice(value).map_err(|e| StoreError::Corrupt {
            key: String::from_utf8_lossy(key).into_owned(),
            reason: e.to_string(),
        })
    }

    fn record(&self, grant: Grant) -> StoreResult<GrantRecord> {
        Ok(GrantRecord {
            grant,
            version: self.db.generate_id()? + 1,
            updated_at: Utc::now(),
        })
    }

    fn collect<I>(iter: I) -> StoreResult<Vec<GrantRecord>>
    where
        I: Iterator<Item = sled::Result<(IVec, IVec)>>,
    {
        iter.map(|entry| {
            let (key, value) = entry?;
            Self::decode(&key, &value)
        })
        .collect()
    }
}

#[async_trait]
impl GrantStore for SledGrantStore {
    async fn get(&self, key: &GrantKey) -> StoreResult<Option<GrantRecord>> {
        let encoded = Self::encode_key(key);
        self.grants
            .get(&encoded)?
            .map(|value| Self::decode(&encoded, &value))
            .transpose()
    }

    async fn put(&self, grant: Grant) -> StoreResult<GrantRecord> {
        let record = self.record(grant)?;
        let value = serde_json::to_vec(&record)?;
        self.grants.insert(Self::encode_key(&record.key()), value)?;
        self.grants.flush_async().await?;
        Ok(record)
    }

    async fn compare_and_swap(
        &self,
        key: &GrantKey,
        expected_version: u64,
        next: Option<Grant>,
    ) -> StoreResult<Option<GrantRecord>> {
        let encoded = Self::encode_key(key);
        let conflict = |found: Option<u64>| StoreError::Conflict {
            key: key.clone(),
            expected: expected_version,
            found,
        };

        let current = self.grants.get(&encoded)?.ok_or_else(|| conflict(None))?;
        let current_version = Self::decode(&encoded, &current)?.version;
        if current_version != expected_version {
            return Err(conflict(Some(current_version)));
        }

        let record = next.map(|grant| self.record(grant)).transpose()?;
        let value = record.as_ref().map(serde_json::to_vec).transpose()?;

        // Byte-level swap: fails if anything was written since the read above
        match self.grants.compare_and_swap(&encoded, Some(current), value)? {
            Ok(()) => {}
            Err(CompareAndSwapError { current, .. }) => {
                let found = current
                    .map(|value| Self::decode(&encoded, &value).map(|r| r.version))
                    .transpose()?;
                return Err(conflict(found));
            }
        }

        self.grants.flush_async().await?;
        Ok(record)
    }

    async fn delete(&self, key: &GrantKey) -> StoreResult<Option<GrantRecord>> {
        let encoded = Self::encode_key(key);
        let removed = self.grants.remove(&encoded)?;
        if removed.is_some() {
            self.grants.flush_async().await?;
        }
        removed.map(|value| Self::decode(&encoded, &value)).transpose()
    }

    async fn list_by_granter(&self, granter: &Address) -> StoreResult<Vec<GrantRecord>> {
        Self::collect(self.grants.scan_prefix(Self::prefix(granter)))
    }

    // Full scan: there is no grantee index
    async fn list_by_grantee(&self, grantee: &Address) -> StoreResult<Vec<GrantRecord>> {
        let mut records = self.list_all().await?;
        records.retain(|record| &record.grant.grantee == grantee);
        Ok(records)
    }

    async fn list_all(&self) -> StoreResult<Vec<GrantRecord>> {
        Self::collect(self.grants.iter())
    }
}
