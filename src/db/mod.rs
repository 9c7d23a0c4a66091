//! Storage interfaces for policies and delegations.
//!
//! The engine only depends on the repository traits in [`repos`]. The
//! [`memory`] module provides `DashMap`-backed implementations suitable for
//! embedding and tests; persistent backends implement the same traits.

mod error;
pub mod memory;
pub mod repos;

pub use error::{DbError, DbResult};
pub use memory::{InMemoryDelegationRepo, InMemoryPolicyRepo};
pub use repos::*;
