//! Transfer authorization types for grantgate
//!
//! A TransferAuthorization is an ordered list of Allocations. Each Allocation
//! scopes delegated spending to one (port, channel) pair, a per-denomination
//! spend limit and an explicit recipient allow-list.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    Address, Amount, AuthzError, ChannelId, ChannelScope, Denom, PortId, Result, TransferAction,
};

/// Remaining spend per denomination
pub type SpendLimit = BTreeMap<Denom, Amount>;

/// Recipients an allocation may pay
pub type AllowList = BTreeSet<Address>;

/// One authorized scope within a grant
///
/// Allocations are values: every operation that changes the remaining limit
/// returns a new Allocation and leaves the original untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Port the transfer must leave from
    pub source_port: PortId,
    /// Channel the transfer must leave from
    pub source_channel: ChannelId,
    /// Remaining amount per denomination
    pub spend_limit: SpendLimit,
    /// Permitted recipients; empty permits nobody
    #[serde(default)]
    pub allow_list: AllowList,
}

impl Allocation {
    pub fn new(source_port: PortId, source_channel: ChannelId) -> Self {
        Self {
            source_port,
            source_channel,
            spend_limit: SpendLimit::new(),
            allow_list: AllowList::new(),
        }
    }

    /// Set the limit for one denomination
    pub fn with_limit(mut self, denom: Denom, amount: impl Into<Amount>) -> Self {
        self.spend_limit.insert(denom, amount.into());
        self
    }

    /// Permit one more recipient
    pub fn allow(mut self, recipient: Address) -> Self {
        self.allow_list.insert(recipient);
        self
    }

    pub fn scope(&self) -> ChannelScope {
        ChannelScope::new(self.source_port.clone(), self.source_channel.clone())
    }

    /// True iff the action travels over this allocation's channel to an allowed recipient
    pub fn matches(&self, action: &TransferAction) -> bool {
        self.source_port == action.source_port
            && self.source_channel == action.source_channel
            && self.allow_list.contains(&action.receiver)
    }

    /// Remaining limit for a denomination; absent denominations have nothing left
    pub fn remaining(&self, denom: &Denom) -> Amount {
        self.spend_limit.get(denom).copied().unwrap_or_default()
    }

    /// True iff the remaining limit for the action's denomination covers its amount
    pub fn can_cover(&self, action: &TransferAction) -> bool {
        self.spend_limit
            .get(&action.token.denom)
            .is_some_and(|remaining| *remaining >= action.token.amount)
    }

    /// Return a copy with the action's amount deducted from its denomination
    pub fn decrement(&self, action: &TransferAction) -> Result<Allocation> {
        let denom = &action.token.denom;
        let remaining = self.remaining(denom);
        let left = remaining
            .checked_sub(action.token.amount)
            .filter(|_| self.spend_limit.contains_key(denom))
            .ok_or_else(|| AuthzError::InsufficientSpendLimit {
                denom: denom.to_string(),
                requested: action.token.amount.to_string(),
                remaining: remaining.to_string(),
            })?;

        let mut next = self.clone();
        next.spend_limit.insert(denom.clone(), left);
        Ok(next)
    }

    /// True when every denomination is at zero and no further spend can succeed
    pub fn is_exhausted(&self) -> bool {
        self.spend_limit.values().all(Amount::is_zero)
    }

    fn validate(&self) -> Result<()> {
        if self.spend_limit.is_empty() {
            return Err(AuthzError::invalid_grant(format!(
                "allocation for {} has an empty spend limit",
                self.scope()
            )));
        }
        Ok(())
    }
}

/// Ordered set of allocations carried by a grant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAuthorization {
    pub allocations: Vec<Allocation>,
}

impl TransferAuthorization {
    pub fn new(allocations: Vec<Allocation>) -> Self {
        Self { allocations }
    }

    /// Structural checks applied before a grant is stored
    ///
    /// Identifier and denomination syntax is already guaranteed by the types.
    /// Duplicate channel scopes are allowed; the first matching allocation wins.
    pub fn validate(&self) -> Result<()> {
        if self.allocations.is_empty() {
            return Err(AuthzError::invalid_grant("authorization has no allocations"));
        }
        for allocation in &self.allocations {
            allocation.validate()?;
        }
        Ok(())
    }

    /// True when no allocation has anything left to spend
    pub fn is_depleted(&self) -> bool {
        self.allocations.iter().all(Allocation::is_exhausted)
    }
}
