//! The authorization engine facade
//!
//! Wires the store, the transfer executor, the per-pair locks and the event
//! channel together and exposes the public operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use grantgate_store::GrantStore;
use grantgate_types::{Address, Allocation, GrantKey, GrantRecord, Result, TransferAction};
use tokio::sync::broadcast;

use crate::config::EngineConfig;
use crate::coordinator::{ActionOutcome, ExecutionCoordinator};
use crate::events::GrantEvent;
use crate::lifecycle::GrantLifecycle;
use crate::locks::KeyedLocks;
use crate::transfer::TransferExecutor;

/// Grant-based transfer authorization engine
#[derive(Clone)]
pub struct AuthzEngine {
    lifecycle: GrantLifecycle,
    coordinator: ExecutionCoordinator,
    events: broadcast::Sender<GrantEvent>,
    config: EngineConfig,
}

impl AuthzEngine {
    pub fn new(
        store: Arc<dyn GrantStore>,
        executor: Arc<dyn TransferExecutor>,
        config: EngineConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let locks = Arc::new(KeyedLocks::new());
        let lifecycle = GrantLifecycle::new(store.clone(), locks.clone(), events.clone());
        let coordinator = ExecutionCoordinator::new(
            store,
            locks,
            lifecycle.clone(),
            executor,
            events.clone(),
            config.clone(),
        );

        tracing::debug!(
            transfer_timeout_ms = config.transfer_timeout_ms,
            event_capacity = config.event_capacity,
            "Authorization engine ready"
        );

        Self {
            lifecycle,
            coordinator,
            events,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create or replace the grant from `granter` to `grantee`
    pub async fn grant(
        &self,
        granter: Address,
        grantee: Address,
        allocations: Vec<Allocation>,
        expiration: Option<DateTime<Utc>>,
    ) -> Result<GrantRecord> {
        self.lifecycle.grant(granter, grantee, allocations, expiration).await
    }

    /// Remove the grant; `false` when there was none
    pub async fn revoke(&self, granter: &Address, grantee: &Address) -> Result<bool> {
        self.lifecycle.revoke(granter, grantee).await
    }

    /// Perform `action` as `grantee` against the granter's grant
    pub async fn execute(
        &self,
        granter: &Address,
        grantee: &Address,
        action: TransferAction,
    ) -> Result<ActionOutcome> {
        self.coordinator.execute(granter, grantee, action).await
    }

    /// Live grant for the pair
    pub async fn get(&self, granter: &Address, grantee: &Address) -> Result<Option<GrantRecord>> {
        self.lifecycle.get(granter, grantee).await
    }

    /// Live grants issued by `granter`
    pub async fn query(&self, granter: &Address) -> Result<Vec<GrantRecord>> {
        self.lifecycle.query_granter(granter).await
    }

    /// Live grants held by `grantee`
    pub async fn query_grantee(&self, grantee: &Address) -> Result<Vec<GrantRecord>> {
        self.lifecycle.query_grantee(grantee).await
    }

    /// Delete grants expired as of `now`
    pub async fn prune_expired(&self, now: DateTime<Utc>) -> Result<Vec<GrantKey>> {
        self.lifecycle.prune_expired(now).await
    }

    /// Subscribe to grant events
    pub fn subscribe(&self) -> broadcast::Receiver<GrantEvent> {
        self.events.subscribe()
    }
}
