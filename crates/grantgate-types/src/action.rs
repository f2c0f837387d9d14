//! Transfer actions submitted for delegated execution

use serde::{Deserialize, Serialize};

use crate::{Address, AuthzError, ChannelId, ChannelScope, Coin, PortId, Result};

/// A proposed value transfer the grantee wants to perform on the granter's behalf
///
/// The sender is not part of the action: a delegated transfer always draws from
/// the granter named by the execution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAction {
    pub source_port: PortId,
    pub source_channel: ChannelId,
    pub token: Coin,
    pub receiver: Address,
}

impl TransferAction {
    pub fn new(
        source_port: PortId,
        source_channel: ChannelId,
        token: Coin,
        receiver: Address,
    ) -> Self {
        Self {
            source_port,
            source_channel,
            token,
            receiver,
        }
    }

    /// The channel scope this action travels over
    pub fn scope(&self) -> ChannelScope {
        ChannelScope::new(self.source_port.clone(), self.source_channel.clone())
    }

    /// Reject actions that no allocation could meaningfully authorize
    pub fn validate(&self) -> Result<()> {
        if self.token.amount.is_zero() {
            return Err(AuthzError::InvalidAction {
                field: "token.amount".to_string(),
                reason: "amount must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
