//! Grant types for grantgate
//!
//! A Grant delegates a TransferAuthorization from a granter to a grantee,
//! optionally until an expiration instant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Address, AuthzError, Result, TransferAuthorization};

/// Identity of a grant: the ordered (granter, grantee) pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GrantKey {
    pub granter: Address,
    pub grantee: Address,
}

impl GrantKey {
    pub fn new(granter: Address, grantee: Address) -> Self {
        Self { granter, grantee }
    }
}

impl fmt::Display for GrantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.granter, self.grantee)
    }
}

/// Delegated transfer authority from a granter to a grantee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub granter: Address,
    pub grantee: Address,
    pub authorization: TransferAuthorization,
    /// No expiration when absent
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}

impl Grant {
    pub fn new(
        granter: Address,
        grantee: Address,
        authorization: TransferAuthorization,
        expiration: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            granter,
            grantee,
            authorization,
            expiration,
        }
    }

    pub fn key(&self) -> GrantKey {
        GrantKey::new(self.granter.clone(), self.grantee.clone())
    }

    /// Pure comparison against the supplied instant
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|expiration| expiration <= now)
    }

    /// Check the grant can be stored
    pub fn validate(&self) -> Result<()> {
        if self.granter == self.grantee {
            return Err(AuthzError::invalid_grant("granter and grantee cannot be the same"));
        }
        self.authorization.validate()
    }
}

/// A grant as held by the store, with the version stamp used for commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRecord {
    pub grant: Grant,
    /// Bumped on every write for this key
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl GrantRecord {
    pub fn key(&self) -> GrantKey {
        self.grant.key()
    }
}
