//! Grant events for audit streaming
//!
//! Events are broadcast to all subscribers (audit log task, tests, etc.)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events emitted by the engine as grants change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GrantEvent {
    /// A grant was created or replaced
    Granted {
        granter: String,
        grantee: String,
        allocations: usize,
        expiration: Option<DateTime<Utc>>,
        version: u64,
        timestamp: DateTime<Utc>,
    },

    /// A grant was removed by its granter
    Revoked {
        granter: String,
        grantee: String,
        timestamp: DateTime<Utc>,
    },

    /// A delegated transfer succeeded and the limit was decremented
    Executed {
        granter: String,
        grantee: String,
        receiver: String,
        channel: String,
        amount: String,
        transfer_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Spending consumed the last of the grant, which was deleted
    Depleted {
        granter: String,
        grantee: String,
        timestamp: DateTime<Utc>,
    },

    /// An expired grant was pruned
    Expired {
        granter: String,
        grantee: String,
        expired_at: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// The guarded transfer failed; nothing was committed
    ExecutionFailed {
        granter: String,
        grantee: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl GrantEvent {
    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            GrantEvent::Granted { timestamp, .. } => *timestamp,
            GrantEvent::Revoked { timestamp, .. } => *timestamp,
            GrantEvent::Executed { timestamp, .. } => *timestamp,
            GrantEvent::Depleted { timestamp, .. } => *timestamp,
            GrantEvent::Expired { timestamp, .. } => *timestamp,
            GrantEvent::ExecutionFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Short name for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            GrantEvent::Granted { .. } => "granted",
            GrantEvent::Revoked { .. } => "revoked",
            GrantEvent::Executed { .. } => "executed",
            GrantEvent::Depleted { .. } => "depleted",
            GrantEvent::Expired { .. } => "expired",
            GrantEvent::ExecutionFailed { .. } => "execution_failed",
        }
    }

    /// The (granter, grantee) pair the event concerns
    pub fn pair(&self) -> (&str, &str) {
        match self {
            GrantEvent::Granted { granter, grantee, .. }
            | GrantEvent::Revoked { granter, grantee, .. }
            | GrantEvent::Executed { granter, grantee, .. }
            | GrantEvent::Depleted { granter, grantee, .. }
            | GrantEvent::Expired { granter, grantee, .. }
            | GrantEvent::ExecutionFailed { granter, grantee, .. } => (granter, grantee),
        }
    }
}
