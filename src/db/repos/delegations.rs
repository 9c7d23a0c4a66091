use async_trait::async_trait;
use uuid::Uuid;

use crate::{db::error::DbResult, models::Delegation};

/// Repository for delegations.
///
/// Implementations must give read-your-writes consistency to a single
/// caller: a `create` or `revoke` is visible to the next
/// `find_active_for_delegate` for the same delegate.
#[async_trait]
pub trait DelegationRepo: Send + Sync {
    /// Persist a new delegation.
    ///
    /// # Errors
    /// Returns `DbError::Conflict` if a delegation with the same id exists.
    async fn create(&self, delegation: Delegation) -> DbResult<Delegation>;

    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<Delegation>>;

    /// Active, unexpired delegations whose delegate is `delegate_id`,
    /// oldest first.
    ///
    /// This is the authorization hot path; real stores back it with an
    /// index on the delegate.
    async fn find_active_for_delegate(&self, delegate_id: &str) -> DbResult<Vec<Delegation>>;

    /// Mark a delegation revoked.
    ///
    /// # Errors
    /// Returns `DbError::NotFound` if the delegation doesn't exist.
    async fn revoke(&self, id: Uuid) -> DbResult<Delegation>;

    /// Remove delegations that have been expired or revoked for longer than
    /// the store's retention window. Returns the number removed.
    async fn cleanup(&self) -> DbResult<u64>;
}
