//! grantgate Store - keyed persistence for grants
//!
//! The store exclusively owns every grant record. Callers always receive
//! copies, so a record can only change through the store's own write paths:
//!
//! - `put` unconditionally creates or replaces the record for a pair
//! - `compare_and_swap` replaces or deletes only if the version stamp still matches
//! - `delete` removes the record if present
//!
//! Every write assigns a fresh, strictly increasing version stamp.
//!
//! Two backends are provided: [`MemoryGrantStore`] for tests and single-process
//! deployments, and [`SledGrantStore`] for an embedded persistent database.

pub mod error;
pub mod memory;
pub mod sled_store;

use async_trait::async_trait;
use grantgate_types::{Address, Grant, GrantKey, GrantRecord};

pub use error::{StoreError, StoreResult};
pub use memory::MemoryGrantStore;
pub use sled_store::SledGrantStore;

/// Persistent map from (granter, grantee) to a grant record
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Look up the record for a pair
    async fn get(&self, key: &GrantKey) -> StoreResult<Option<GrantRecord>>;

    /// Create or fully replace the record for the grant's pair
    async fn put(&self, grant: Grant) -> StoreResult<GrantRecord>;

    /// Replace (`Some`) or delete (`None`) the record, but only if its current
    /// version equals `expected_version`. Fails with [`StoreError::Conflict`]
    /// when the record is absent or has moved on.
    async fn compare_and_swap(
        &self,
        key: &GrantKey,
        expected_version: u64,
        next: Option<Grant>,
    ) -> StoreResult<Option<GrantRecord>>;

    /// Remove the record, returning it if it existed
    async fn delete(&self, key: &GrantKey) -> StoreResult<Option<GrantRecord>>;

    /// All records issued by a granter, ordered by grantee
    async fn list_by_granter(&self, granter: &Address) -> StoreResult<Vec<GrantRecord>>;

    /// All records received by a grantee, ordered by granter
    async fn list_by_grantee(&self, grantee: &Address) -> StoreResult<Vec<GrantRecord>>;

    /// Every record in the store
    async fn list_all(&self) -> StoreResult<Vec<GrantRecord>>;
}
