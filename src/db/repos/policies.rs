use async_trait::async_trait;

use crate::{
    db::error::DbResult,
    models::{Policy, Resource, Subject},
};

/// Repository for policies.
///
/// Policies are keyed by name, so only named policies can be stored.
///
/// Key features:
/// - Soft delete: deleted policies move to a trash and can be restored
/// - Inheritance: a policy naming a base in `extends` sees the base's rules
///   placed before its own
///
/// All lookups exclude soft-deleted policies unless stated otherwise.
#[async_trait]
pub trait PolicyRepo: Send + Sync {
    /// Build the policy that applies to a request.
    ///
    /// The returned policy's rules are plain values ready for evaluation.
    /// Implementations may pre-filter rules that cannot apply to `subject`.
    async fn get_policies_for(
        &self,
        subject: &Subject,
        resource: Option<&Resource>,
    ) -> DbResult<Policy>;

    /// Get a live policy by name, without resolving `extends`.
    async fn get_by_name(&self, name: &str) -> DbResult<Option<Policy>>;

    /// Insert or replace a policy.
    ///
    /// # Errors
    /// Returns `DbError::Validation` if the policy has no name.
    async fn save(&self, policy: Policy) -> DbResult<()>;

    /// Insert or replace several policies. Either all are saved or none.
    async fn save_many(&self, policies: Vec<Policy>) -> DbResult<()>;

    /// Soft-delete a policy. Deleting a missing policy returns `NotFound`.
    async fn delete(&self, name: &str) -> DbResult<()>;

    /// Soft-delete several policies, returning how many were deleted.
    /// Missing names are skipped.
    async fn delete_many(&self, names: &[String]) -> DbResult<u64>;

    /// Restore a soft-deleted policy.
    async fn restore(&self, name: &str) -> DbResult<()>;

    /// Permanently remove a policy, live or trashed.
    async fn force_delete(&self, name: &str) -> DbResult<()>;

    /// List soft-deleted policies, ordered by name.
    async fn get_trashed(&self) -> DbResult<Vec<Policy>>;
}
