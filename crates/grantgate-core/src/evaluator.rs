//! Authorization evaluator
//!
//! Decides whether a transfer fits a grant and, if so, computes the
//! allocation set that should replace the stored one once the transfer
//! succeeds. Pure: nothing here touches the store.

use grantgate_types::{Allocation, AuthzError, TransferAction, TransferAuthorization};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the evaluator refused a transfer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Wrong channel and unlisted recipient are deliberately the same case
    #[error("no allocation matches the transfer")]
    NoMatchingAllocation,

    #[error("spend limit for {denom} is {remaining}, transfer needs {requested}")]
    InsufficientSpendLimit {
        denom: String,
        requested: String,
        remaining: String,
    },
}

impl From<Rejection> for AuthzError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::NoMatchingAllocation => AuthzError::NoMatchingAllocation,
            Rejection::InsufficientSpendLimit {
                denom,
                requested,
                remaining,
            } => AuthzError::InsufficientSpendLimit {
                denom,
                requested,
                remaining,
            },
        }
    }
}

/// Result of a successful evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Replacement allocation sequence, matched allocation decremented
    pub allocations: Vec<Allocation>,
    /// Position of the allocation that authorized the transfer
    pub matched: usize,
    /// Nothing is left to spend anywhere in the grant
    pub fully_depleted: bool,
}

/// Evaluate a transfer against an authorization
///
/// Allocations are scanned in order and the first one matching the transfer's
/// channel and recipient is authoritative: later allocations are never
/// consulted, even when the first one cannot cover the amount. A matched
/// allocation that ends up with nothing left is dropped from the sequence.
pub fn evaluate(
    authorization: &TransferAuthorization,
    action: &TransferAction,
) -> Result<Evaluation, Rejection> {
    let (matched, allocation) = authorization
        .allocations
        .iter()
        .enumerate()
        .find(|(_, allocation)| allocation.matches(action))
        .ok_or(Rejection::NoMatchingAllocation)?;

    let decremented = allocation
        .decrement(action)
        .map_err(|_| insufficient(allocation, action))?;

    let mut allocations = authorization.allocations.clone();
    if decremented.is_exhausted() {
        allocations.remove(matched);
    } else {
        allocations[matched] = decremented;
    }

    let fully_depleted = allocations.iter().all(Allocation::is_exhausted);

    Ok(Evaluation {
        allocations,
        matched,
        fully_depleted,
    })
}

fn insufficient(allocation: &Allocation, action: &TransferAction) -> Rejection {
    Rejection::InsufficientSpendLimit {
        denom: action.token.denom.to_string(),
        requested: action.token.amount.to_string(),
        remaining: allocation.remaining(&action.token.denom).to_string(),
    }
}
