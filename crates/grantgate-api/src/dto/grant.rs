//! Grant DTO types

use chrono::{DateTime, Utc};
use grantgate_core::ActionOutcome;
use grantgate_types::{Address, Allocation, GrantKey, GrantRecord};
use serde::{Deserialize, Serialize};

/// Create or replace a grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantRequest {
    pub granter: Address,
    pub grantee: Address,
    pub allocations: Vec<Allocation>,
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}

/// A stored grant as seen by clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantView {
    pub granter: Address,
    pub grantee: Address,
    pub allocations: Vec<Allocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl From<GrantRecord> for GrantView {
    fn from(record: GrantRecord) -> Self {
        Self {
            granter: record.grant.granter,
            grantee: record.grant.grantee,
            allocations: record.grant.authorization.allocations,
            expiration: record.grant.expiration,
            version: record.version,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantListResponse {
    pub grants: Vec<GrantView>,
    pub total: usize,
}

impl From<Vec<GrantRecord>> for GrantListResponse {
    fn from(records: Vec<GrantRecord>) -> Self {
        let grants: Vec<GrantView> = records.into_iter().map(GrantView::from).collect();
        Self {
            total: grants.len(),
            grants,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeResponse {
    pub revoked: bool,
}

/// Result of a delegated transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecResponse {
    pub transfer_id: String,
    pub completed_at: DateTime<Utc>,
    /// The grant was used up and removed
    pub grant_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grant: Option<GrantView>,
}

impl From<ActionOutcome> for ExecResponse {
    fn from(outcome: ActionOutcome) -> Self {
        Self {
            grant_deleted: outcome.grant_deleted(),
            transfer_id: outcome.receipt.transfer_id,
            completed_at: outcome.receipt.completed_at,
            grant: outcome.remaining.map(GrantView::from),
        }
    }
}

/// Sweep expired grants as of `now`, capped at the server clock
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PruneRequest {
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruneResponse {
    pub pruned: usize,
    pub grants: Vec<GrantKey>,
}
