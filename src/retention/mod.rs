//! Background purging of expired and revoked delegations.
//!
//! The worker periodically calls [`DelegationManager::cleanup`], which
//! removes delegations whose terminal state is older than the store's
//! retention window.
//!
//! [`DelegationManager::cleanup`]: crate::delegation::DelegationManager::cleanup

mod worker;

pub use worker::{run_retention, start_retention_worker};
