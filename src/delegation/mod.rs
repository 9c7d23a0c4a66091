//! Temporary permission delegation.
//!
//! A delegator lends a subset of its permissions to a delegate. The
//! [`DelegationValidator`] checks the delegator actually holds what it hands
//! over; the [`DelegationManager`] owns the lifecycle (grant, revoke, lookup,
//! cleanup) and rejects transitive grants that would close a cycle.

mod error;
mod manager;
mod validator;

pub use error::{DelegationError, ValidationError};
pub use manager::DelegationManager;
pub use validator::DelegationValidator;
