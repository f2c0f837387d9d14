//! grantgate Core - delegated transfer authorization
//!
//! This crate turns stored grants into decisions and keeps accounting in
//! step with real transfers:
//!
//! - `evaluator`: pure accept/reject of a transfer against a grant's allocations
//! - `coordinator`: lookup -> evaluate -> transfer -> commit-on-success
//! - `lifecycle`: grant (overwrite), revoke, expiry checks and queries
//! - `locks`: per-(granter, grantee) serialization
//! - `transfer`: the external transfer collaborator
//! - `engine`: the facade exposing Grant / Revoke / Execute / Query
//!
//! # Key Principle
//!
//! Spend limits are decremented if and only if the guarded transfer reports
//! success. A failed, timed-out or cancelled transfer leaves the grant exactly
//! as it was.
//!
//! ```text
//! Execute ─→ lock(pair) ─→ lookup ─→ expired? ─→ evaluate ─→ transfer ─→ commit
//!                                       │            │           │
//!                                    prune        reject      no commit
//! ```

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod evaluator;
pub mod events;
pub mod lifecycle;
pub mod locks;
pub mod transfer;

pub use config::EngineConfig;
pub use coordinator::{ActionOutcome, ExecutionCoordinator};
pub use engine::AuthzEngine;
pub use evaluator::{evaluate, Evaluation, Rejection};
pub use events::GrantEvent;
pub use lifecycle::GrantLifecycle;
pub use locks::{KeyGuard, KeyedLocks};
pub use transfer::{TransferExecutor, TransferFailure, TransferReceipt, TransferRequest};
