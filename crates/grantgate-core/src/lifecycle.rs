//! Grant lifecycle: create/replace, revoke, expiry, queries
//!
//! A grant is replaced wholesale on re-grant, so a fresh grant resets the
//! spend limit rather than adding to it. Expired grants are never returned by
//! queries; they are deleted lazily on the next execution attempt or by an
//! explicit [`GrantLifecycle::prune_expired`] sweep.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use grantgate_store::{GrantStore, StoreError};
use grantgate_types::{
    Address, Allocation, AuthzError, Grant, GrantKey, GrantRecord, Result, TransferAuthorization,
};
use tokio::sync::broadcast;

use crate::events::GrantEvent;
use crate::locks::KeyedLocks;

/// Creates, replaces, revokes and lists grants
#[derive(Clone)]
pub struct GrantLifecycle {
    store: Arc<dyn GrantStore>,
    locks: Arc<KeyedLocks>,
    events: broadcast::Sender<GrantEvent>,
}

impl GrantLifecycle {
    pub fn new(
        store: Arc<dyn GrantStore>,
        locks: Arc<KeyedLocks>,
        events: broadcast::Sender<GrantEvent>,
    ) -> Self {
        Self {
            store,
            locks,
            events,
        }
    }

    fn emit(&self, event: GrantEvent) {
        // Ignore send errors (no receivers)
        let _ = self.events.send(event);
    }

    /// Create or fully replace the grant for (granter, grantee)
    pub async fn grant(
        &self,
        granter: Address,
        grantee: Address,
        allocations: Vec<Allocation>,
        expiration: Option<DateTime<Utc>>,
    ) -> Result<GrantRecord> {
        let grant = Grant::new(
            granter,
            grantee,
            TransferAuthorization::new(allocations),
            expiration,
        );
        grant.validate()?;

        let key = grant.key();
        let _guard = self.locks.lock(&key).await;

        if grant.is_expired(Utc::now()) {
            tracing::warn!(
                %key,
                ?expiration,
                "Grant stored with an expiration already in the past"
            );
        }

        let record = self.store.put(grant).await.map_err(AuthzError::from)?;

        tracing::info!(
            %key,
            version = record.version,
            allocations = record.grant.authorization.allocations.len(),
            "Grant stored"
        );
        self.emit(GrantEvent::Granted {
            granter: key.granter.to_string(),
            grantee: key.grantee.to_string(),
            allocations: record.grant.authorization.allocations.len(),
            expiration: record.grant.expiration,
            version: record.version,
            timestamp: record.updated_at,
        });

        Ok(record)
    }

    /// Remove the grant if present. Revoking nothing is not an error.
    pub async fn revoke(&self, granter: &Address, grantee: &Address) -> Result<bool> {
        let key = GrantKey::new(granter.clone(), grantee.clone());
        let _guard = self.locks.lock(&key).await;

        let removed = self.store.delete(&key).await.map_err(AuthzError::from)?;
        match removed {
            Some(record) => {
                tracing::info!(%key, version = record.version, "Grant revoked");
                self.emit(GrantEvent::Revoked {
                    granter: key.granter.to_string(),
                    grantee: key.grantee.to_string(),
                    timestamp: Utc::now(),
                });
                Ok(true)
            }
            None => {
                tracing::debug!(%key, "Revoke found no grant");
                Ok(false)
            }
        }
    }

    /// Current grant for the pair, if present and not expired
    pub async fn get(&self, granter: &Address, grantee: &Address) -> Result<Option<GrantRecord>> {
        let key = GrantKey::new(granter.clone(), grantee.clone());
        let now = Utc::now();
        let record = self.store.get(&key).await.map_err(AuthzError::from)?;
        Ok(record.filter(|r| !r.grant.is_expired(now)))
    }

    /// All live grants issued by `granter`
    pub async fn query_granter(&self, granter: &Address) -> Result<Vec<GrantRecord>> {
        let records = self
            .store
            .list_by_granter(granter)
            .await
            .map_err(AuthzError::from)?;
        Ok(Self::live(records, Utc::now()))
    }

    /// All live grants held by `grantee`
    pub async fn query_grantee(&self, grantee: &Address) -> Result<Vec<GrantRecord>> {
        let records = self
            .store
            .list_by_grantee(grantee)
            .await
            .map_err(AuthzError::from)?;
        Ok(Self::live(records, Utc::now()))
    }

    fn live(mut records: Vec<GrantRecord>, now: DateTime<Utc>) -> Vec<GrantRecord> {
        records.retain(|r| !r.grant.is_expired(now));
        records
    }

    /// Delete every grant expired as of `now`; returns the pruned keys
    pub async fn prune_expired(&self, now: DateTime<Utc>) -> Result<Vec<GrantKey>> {
        let candidates: Vec<GrantKey> = self
            .store
            .list_all()
            .await
            .map_err(AuthzError::from)?
            .into_iter()
            .filter(|r| r.grant.is_expired(now))
            .map(|r| r.key())
            .collect();

        let mut pruned = Vec::with_capacity(candidates.len());
        for key in candidates {
            let _guard = self.locks.lock(&key).await;
            // Re-read under the lock: the grant may have been replaced meanwhile
            let Some(record) = self.store.get(&key).await.map_err(AuthzError::from)? else {
                continue;
            };
            if !record.grant.is_expired(now) {
                continue;
            }
            if self.remove_expired(&record).await? {
                pruned.push(key);
            }
        }

        if !pruned.is_empty() {
            tracing::info!(count = pruned.len(), %now, "Pruned expired grants");
        }
        Ok(pruned)
    }

    /// Delete an expired record. Caller holds the key's lock.
    pub(crate) async fn remove_expired(&self, record: &GrantRecord) -> Result<bool> {
        let key = record.key();
        match self.store.compare_and_swap(&key, record.version, None).await {
            Ok(_) => {}
            // Someone else already replaced or removed it
            Err(StoreError::Conflict { .. }) => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        let expired_at = record.grant.expiration.unwrap_or(record.updated_at);
        tracing::info!(%key, %expired_at, "Expired grant pruned");
        self.emit(GrantEvent::Expired {
            granter: key.granter.to_string(),
            grantee: key.grantee.to_string(),
            expired_at,
            timestamp: Utc::now(),
        });
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use grantgate_store::MemoryGrantStore;
    use grantgate_types::{ChannelId, Denom, PortId};

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    fn allocations(limit: u64) -> Vec<Allocation> {
        vec![Allocation::new(
            PortId::parse("transfer").unwrap(),
            ChannelId::parse("channel-0").unwrap(),
        )
        .with_limit(Denom::parse("stake").unwrap(), limit)
        .allow(addr("cosmos1receiver"))]
    }

    fn lifecycle() -> (GrantLifecycle, MemoryGrantStore) {
        let store = MemoryGrantStore::new();
        let (tx, _) = broadcast::channel(16);
        let lifecycle = GrantLifecycle::new(Arc::new(store.clone()), Arc::new(KeyedLocks::new()), tx);
        (lifecycle, store)
    }

    #[tokio::test]
    async fn test_self_grant_rejected() {
        let (lifecycle, store) = lifecycle();
        let err = lifecycle
            .grant(addr("cosmos1a"), addr("cosmos1a"), allocations(10), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::InvalidGrant { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_allocations_rejected() {
        let (lifecycle, _) = lifecycle();
        let err = lifecycle
            .grant(addr("cosmos1a"), addr("cosmos1b"), vec![], None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::InvalidGrant { .. }));
    }

    #[tokio::test]
    async fn test_revoke_absent_is_noop() {
        let (lifecycle, _) = lifecycle();
        assert!(!lifecycle.revoke(&addr("cosmos1a"), &addr("cosmos1b")).await.unwrap());
    }

    #[tokio::test]
    async fn test_queries_hide_expired_without_deleting() {
        let (lifecycle, store) = lifecycle();
        let past = Utc::now() - Duration::hours(1);
        lifecycle
            .grant(addr("cosmos1a"), addr("cosmos1b"), allocations(10), Some(past))
            .await
            .unwrap();
        lifecycle
            .grant(addr("cosmos1a"), addr("cosmos1c"), allocations(10), None)
            .await
            .unwrap();

        let live = lifecycle.query_granter(&addr("cosmos1a")).await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].grant.grantee, addr("cosmos1c"));
        assert!(lifecycle.get(&addr("cosmos1a"), &addr("cosmos1b")).await.unwrap().is_none());
        assert!(lifecycle.query_grantee(&addr("cosmos1b")).await.unwrap().is_empty());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_prune_expired_sweeps_only_lapsed() {
        let (lifecycle, store) = lifecycle();
        let now = Utc::now();
        lifecycle
            .grant(addr("cosmos1a"), addr("cosmos1b"), allocations(10), Some(now - Duration::minutes(1)))
            .await
            .unwrap();
        lifecycle
            .grant(addr("cosmos1a"), addr("cosmos1c"), allocations(10), Some(now + Duration::hours(1)))
            .await
            .unwrap();

        let pruned = lifecycle.prune_expired(now).await.unwrap();
        assert_eq!(pruned, vec![GrantKey::new(addr("cosmos1a"), addr("cosmos1b"))]);
        assert_eq!(store.len().await, 1);

        // Nothing left to prune
        assert!(lifecycle.prune_expired(now).await.unwrap().is_empty());
    }
}
