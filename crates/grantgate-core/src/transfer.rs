//! The guarded transfer
//!
//! The engine never moves funds itself. It hands a [`TransferRequest`] to a
//! [`TransferExecutor`] and commits accounting only when that call succeeds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grantgate_types::{Address, ChannelId, Coin, PortId, TransferAction};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A transfer the grantee is performing on the granter's behalf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub request_id: Uuid,
    /// Funds leave the granter's account
    pub sender: Address,
    /// Who triggered the transfer
    pub grantee: Address,
    pub receiver: Address,
    pub source_port: PortId,
    pub source_channel: ChannelId,
    pub token: Coin,
}

impl TransferRequest {
    pub fn new(granter: &Address, grantee: &Address, action: &TransferAction) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            sender: granter.clone(),
            grantee: grantee.clone(),
            receiver: action.receiver.clone(),
            source_port: action.source_port.clone(),
            source_channel: action.source_channel.clone(),
            token: action.token.clone(),
        }
    }
}

/// Proof that a transfer went through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transfer_id: String,
    pub completed_at: DateTime<Utc>,
}

impl TransferReceipt {
    pub fn new(transfer_id: impl Into<String>) -> Self {
        Self {
            transfer_id: transfer_id.into(),
            completed_at: Utc::now(),
        }
    }
}

/// Ways a guarded transfer can fail
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferFailure {
    /// The transfer layer refused the transfer
    #[error("transfer rejected: {0}")]
    Rejected(String),

    /// The transfer layer could not be reached
    #[error("transfer layer unavailable: {0}")]
    Unavailable(String),

    /// No answer within the configured bound
    #[error("transfer timed out after {0} ms")]
    TimedOut(u64),
}

/// Performs the actual cross-chain transfer
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    async fn perform_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, TransferFailure>;
}
