//! grantgate Types - Canonical domain types for delegated transfer authorization
//!
//! This crate contains all foundational types for grantgate with zero dependencies
//! on other grantgate crates. It defines:
//!
//! - Identifier types (Address, PortId, ChannelId, Denom)
//! - Amount and coin types (non-negative, checked arithmetic)
//! - Allocations and transfer authorizations
//! - Grants, grant keys and versioned grant records
//! - Transfer actions submitted for delegated execution
//! - The authorization error taxonomy
//!
//! # Invariants
//!
//! 1. At most one grant exists per ordered (granter, grantee) pair
//! 2. Spend limits never go negative
//! 3. An empty allow-list permits no recipient
//! 4. Allocations are evaluated in insertion order, first match wins

pub mod identity;
pub mod amount;
pub mod authorization;
pub mod grant;
pub mod action;
pub mod error;

pub use identity::*;
pub use amount::*;
pub use authorization::*;
pub use grant::*;
pub use action::*;
pub use error::*;
