//! In-memory repository implementations using `DashMap` for concurrent access.
//!
//! # Multi-Node Deployments
//!
//! **WARNING**: these stores are local to the process. Each node holds its own
//! independent copy, so a revocation on one node is not seen by another.
//! Multi-node deployments need a shared backend implementing the same traits.

mod delegations;
mod policies;

pub use delegations::InMemoryDelegationRepo;
pub use policies::InMemoryPolicyRepo;
