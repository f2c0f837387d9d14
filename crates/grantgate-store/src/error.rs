//! Store error types

use grantgate_types::{AuthzError, GrantKey};
use thiserror::Error;

/// Errors that can occur in store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Version conflict on grant {key}: expected {expected}, found {found:?}")]
    Conflict {
        key: GrantKey,
        expected: u64,
        found: Option<u64>,
    },

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record under key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for AuthzError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { key, .. } => AuthzError::CommitConflict {
                granter: key.granter.to_string(),
                grantee: key.grantee.to_string(),
            },
            other => AuthzError::store(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grantgate_types::Address;

    #[test]
    fn test_conflict_maps_to_commit_conflict() {
        let key = GrantKey::new(
            Address::parse("cosmos1granter").unwrap(),
            Address::parse("cosmos1grantee").unwrap(),
        );
        let err: AuthzError = StoreError::Conflict {
            key,
            expected: 3,
            found: Some(4),
        }
        .into();
        assert_eq!(err.error_code(), "COMMIT_CONFLICT");
    }

    #[test]
    fn test_other_errors_map_to_store() {
        let err: AuthzError = StoreError::Corrupt {
            key: "k".to_string(),
            reason: "truncated".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "STORE_ERROR");
    }
}
