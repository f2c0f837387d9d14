//! Execution coordinator
//!
//! Runs a delegated transfer end to end under the pair's lock:
//!
//! 1. load the grant (absent -> `NoAuthorization`)
//! 2. expired -> prune and `AuthorizationExpired`
//! 3. evaluate; a rejection changes nothing
//! 4. perform the transfer, bounded by the configured timeout
//! 5. on success only, swap in the decremented allocations, or delete the
//!    grant when nothing is left
//!
//! If the caller drops the future before step 5, nothing is committed.

use std::sync::Arc;

use chrono::Utc;
use grantgate_store::GrantStore;
use grantgate_types::{
    Address, AuthzError, Grant, GrantKey, GrantRecord, Result, TransferAction,
    TransferAuthorization,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::EngineConfig;
use crate::evaluator::evaluate;
use crate::events::GrantEvent;
use crate::lifecycle::GrantLifecycle;
use crate::locks::KeyedLocks;
use crate::transfer::{TransferExecutor, TransferFailure, TransferReceipt, TransferRequest};

/// What a successful execution did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub receipt: TransferReceipt,
    /// Updated grant; `None` when the grant was used up and deleted
    pub remaining: Option<GrantRecord>,
}

impl ActionOutcome {
    pub fn grant_deleted(&self) -> bool {
        self.remaining.is_none()
    }
}

/// Coordinates evaluation, the guarded transfer and the commit
#[derive(Clone)]
pub struct ExecutionCoordinator {
    store: Arc<dyn GrantStore>,
    locks: Arc<KeyedLocks>,
    lifecycle: GrantLifecycle,
    executor: Arc<dyn TransferExecutor>,
    events: broadcast::Sender<GrantEvent>,
    config: EngineConfig,
}

impl ExecutionCoordinator {
    pub fn new(
        store: Arc<dyn GrantStore>,
        locks: Arc<KeyedLocks>,
        lifecycle: GrantLifecycle,
        executor: Arc<dyn TransferExecutor>,
        events: broadcast::Sender<GrantEvent>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            locks,
            lifecycle,
            executor,
            events,
            config,
        }
    }

    fn emit(&self, event: GrantEvent) {
        let _ = self.events.send(event);
    }

    /// Execute `action` as `grantee` on behalf of `granter`
    pub async fn execute(
        &self,
        granter: &Address,
        grantee: &Address,
        action: TransferAction,
    ) -> Result<ActionOutcome> {
        action.validate()?;

        let key = GrantKey::new(granter.clone(), grantee.clone());
        let _guard = self.locks.lock(&key).await;

        let record = self
            .store
            .get(&key)
            .await
            .map_err(AuthzError::from)?
            .ok_or_else(|| AuthzError::NoAuthorization {
                granter: granter.to_string(),
                grantee: grantee.to_string(),
            })?;

        if let Some(expired_at) = record
            .grant
            .expiration
            .filter(|_| record.grant.is_expired(Utc::now()))
        {
            self.lifecycle.remove_expired(&record).await?;
            tracing::warn!(%key, %expired_at, "Execution on expired grant");
            return Err(AuthzError::AuthorizationExpired {
                granter: granter.to_string(),
                grantee: grantee.to_string(),
                expired_at: expired_at.to_rfc3339(),
            });
        }

        let evaluation = evaluate(&record.grant.authorization, &action).map_err(|rejection| {
            tracing::warn!(
                %key,
                token = %action.token,
                channel = %action.scope(),
                %rejection,
                "Transfer rejected"
            );
            AuthzError::from(rejection)
        })?;

        let request = TransferRequest::new(granter, grantee, &action);
        let receipt = match self.perform(&request).await {
            Ok(receipt) => receipt,
            Err(failure) => {
                tracing::warn!(
                    %key,
                    request_id = %request.request_id,
                    %failure,
                    "Guarded transfer failed"
                );
                self.emit(GrantEvent::ExecutionFailed {
                    granter: granter.to_string(),
                    grantee: grantee.to_string(),
                    reason: failure.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(AuthzError::GuardedActionFailed {
                    reason: failure.to_string(),
                });
            }
        };

        let next = if evaluation.fully_depleted {
            None
        } else {
            Some(Grant {
                authorization: TransferAuthorization::new(evaluation.allocations),
                ..record.grant.clone()
            })
        };

        let remaining = self
            .store
            .compare_and_swap(&key, record.version, next)
            .await
            .map_err(|e| {
                // The transfer already happened; this needs an operator
                tracing::error!(
                    %key,
                    transfer_id = %receipt.transfer_id,
                    error = %e,
                    "Commit failed after successful transfer"
                );
                AuthzError::from(e)
            })?;

        tracing::info!(
            %key,
            token = %action.token,
            channel = %action.scope(),
            receiver = %action.receiver,
            transfer_id = %receipt.transfer_id,
            depleted = evaluation.fully_depleted,
            "Delegated transfer executed"
        );
        self.emit(GrantEvent::Executed {
            granter: granter.to_string(),
            grantee: grantee.to_string(),
            receiver: action.receiver.to_string(),
            channel: action.scope().to_string(),
            amount: action.token.to_string(),
            transfer_id: receipt.transfer_id.clone(),
            timestamp: receipt.completed_at,
        });
        if evaluation.fully_depleted {
            self.emit(GrantEvent::Depleted {
                granter: granter.to_string(),
                grantee: grantee.to_string(),
                timestamp: Utc::now(),
            });
        }

        Ok(ActionOutcome { receipt, remaining })
    }

    async fn perform(
        &self,
        request: &TransferRequest,
    ) -> std::result::Result<TransferReceipt, TransferFailure> {
        let timeout = self.config.transfer_timeout();
        match tokio::time::timeout(timeout, self.executor.perform_transfer(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransferFailure::TimedOut(timeout.as_millis() as u64)),
        }
    }
}
