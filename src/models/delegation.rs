use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::Attributes;
use crate::authz::pattern_matches;

/// The subset of permissions a delegation hands over.
///
/// Resource and action entries are glob patterns. `domain` is carried as
/// metadata for callers and does not take part in [`DelegationScope::matches`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationScope {
    pub resources: Vec<String>,
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl DelegationScope {
    pub fn new<R, A>(resources: R, actions: A) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        Self {
            resources: resources.into_iter().map(Into::into).collect(),
            actions: actions.into_iter().map(Into::into).collect(),
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// True iff `resource` matches a resource pattern and `action` matches an
    /// action pattern (or the scope grants every action via `*`).
    pub fn matches(&self, resource: &str, action: &str) -> bool {
        let resource_matches = self
            .resources
            .iter()
            .any(|pattern| pattern_matches(pattern, resource));
        if !resource_matches {
            return false;
        }

        self.actions.iter().any(|a| a == "*")
            || self
                .actions
                .iter()
                .any(|pattern| pattern_matches(pattern, action))
    }

    /// A scope with no resources or no actions grants nothing.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() || self.actions.is_empty()
    }

    /// Every (resource pattern, action pattern) pair the scope implies.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.resources.iter().flat_map(move |resource| {
            self.actions
                .iter()
                .map(move |action| (resource.as_str(), action.as_str()))
        })
    }

    /// Whether every pair of `other` falls within this scope.
    ///
    /// Patterns of `other` are treated as literal representatives, so a
    /// wildcard in `other` is only covered by an equally broad (or broader)
    /// pattern here.
    pub fn covers(&self, other: &DelegationScope) -> bool {
        other
            .pairs()
            .all(|(resource, action)| self.matches(resource, action))
    }
}

/// Lifecycle state of a delegation. `Active` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DelegationState {
    #[default]
    Active,
    Expired,
    Revoked,
}

impl DelegationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl std::fmt::Display for DelegationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A time-bounded grant of part of one subject's permissions to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delegation {
    pub id: Uuid,
    pub delegator_id: String,
    pub delegate_id: String,
    pub scope: DelegationScope,
    pub created_at: DateTime<Utc>,
    /// When the delegation stops applying. `None` never expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the delegate may re-delegate this scope onward.
    pub is_transitive: bool,
    #[serde(default)]
    pub status: DelegationState,
    /// When the delegation was revoked (None unless revoked)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Attributes,
}

impl Delegation {
    /// Create an active delegation with a fresh id, created now.
    pub fn new(
        delegator_id: impl Into<String>,
        delegate_id: impl Into<String>,
        scope: DelegationScope,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            delegator_id: delegator_id.into(),
            delegate_id: delegate_id.into(),
            scope,
            created_at: Utc::now(),
            expires_at: None,
            is_transitive: false,
            status: DelegationState::Active,
            revoked_at: None,
            metadata: Attributes::new(),
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn transitive(mut self, is_transitive: bool) -> Self {
        self.is_transitive = is_transitive;
        self
    }

    pub fn with_metadata(mut self, metadata: Attributes) -> Self {
        self.metadata = metadata;
        self
    }

    /// Whether the delegation has passed its expiry. Delegations without an
    /// expiry never expire and rely on revocation.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == DelegationState::Active && !self.is_expired_at(now)
    }

    /// The state as observed at `now`: an active row past its expiry reads
    /// as expired even though the stored status was never flipped.
    pub fn effective_state_at(&self, now: DateTime<Utc>) -> DelegationState {
        match self.status {
            DelegationState::Active if self.is_expired_at(now) => DelegationState::Expired,
            status => status,
        }
    }

    /// When the delegation entered a terminal state, if it has.
    pub fn terminal_since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.effective_state_at(now) {
            DelegationState::Active => None,
            DelegationState::Revoked => self.revoked_at.or(Some(self.created_at)),
            DelegationState::Expired => self.expires_at.or(Some(self.created_at)),
        }
    }
}

/// Input for granting a delegation.
#[derive(Debug, Clone, Default, Validate)]
pub struct GrantDelegation {
    #[validate(length(min = 1, max = 255))]
    pub delegator_id: String,
    #[validate(length(min = 1, max = 255))]
    pub delegate_id: String,
    pub scope: DelegationScope,
    pub expires_at: Option<DateTime<Utc>>,
    pub transitive: bool,
    pub metadata: Attributes,
}

impl GrantDelegation {
    pub fn new(
        delegator_id: impl Into<String>,
        delegate_id: impl Into<String>,
        scope: DelegationScope,
    ) -> Self {
        Self {
            delegator_id: delegator_id.into(),
            delegate_id: delegate_id.into(),
            scope,
            ..Default::default()
        }
    }

    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn transitive(mut self) -> Self {
        self.transitive = true;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_scope_glob_matching() {
        let scope = DelegationScope::new(["document:*"], ["read", "edit"]);
        assert!(scope.matches("document:123", "read"));
        assert!(scope.matches("document:123", "edit"));
        assert!(!scope.matches("document:123", "delete"));
        assert!(!scope.matches("report:1", "read"));
    }

    #[test]
    fn test_scope_wildcard_actions() {
        let scope = DelegationScope::new(["project:alpha"], ["*"]);
        assert!(scope.matches("project:alpha", "anything"));
        assert!(!scope.matches("project:beta", "read"));
    }

    #[test]
    fn test_scope_pairs_and_empty() {
        let scope = DelegationScope::new(["a", "b"], ["read", "write"]);
        let pairs: Vec<_> = scope.pairs().collect();
        assert_eq!(
            pairs,
            vec![("a", "read"), ("a", "write"), ("b", "read"), ("b", "write")]
        );
        assert!(!scope.is_empty());
        assert!(DelegationScope::new(Vec::<String>::new(), ["read"]).is_empty());
        assert!(DelegationScope::new(["a"], Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_scope_covers() {
        let broad = DelegationScope::new(["document:*"], ["*"]);
        let narrow = DelegationScope::new(["document:1", "document:2"], ["read"]);
        assert!(broad.covers(&narrow));
        assert!(!narrow.covers(&broad));
        assert!(broad.covers(&DelegationScope::new(["document:*"], ["read"])));
    }

    #[test]
    fn test_expired_delegation_is_inactive() {
        let delegation = Delegation::new("alice", "bob", DelegationScope::new(["doc:*"], ["read"]))
            .with_expiry(Utc::now() - Duration::hours(1));

        assert_eq!(delegation.status, DelegationState::Active);
        assert!(delegation.is_expired());
        assert!(!delegation.is_active());
        assert_eq!(
            delegation.effective_state_at(Utc::now()),
            DelegationState::Expired
        );
    }

    #[test]
    fn test_delegation_without_expiry_never_expires() {
        let delegation = Delegation::new("alice", "bob", DelegationScope::new(["doc:*"], ["read"]));
        let far_future = Utc::now() + Duration::days(365 * 100);

        assert!(!delegation.is_expired_at(far_future));
        assert!(delegation.is_active_at(far_future));
        assert!(delegation.terminal_since(far_future).is_none());
    }

    #[test]
    fn test_revoked_delegation_is_inactive() {
        let now = Utc::now();
        let mut delegation =
            Delegation::new("alice", "bob", DelegationScope::new(["doc:*"], ["read"]));
        delegation.status = DelegationState::Revoked;
        delegation.revoked_at = Some(now);

        assert!(!delegation.is_active_at(now));
        assert!(!delegation.is_expired_at(now));
        assert_eq!(delegation.terminal_since(now), Some(now));
        assert!(DelegationState::Revoked.is_terminal());
        assert!(!DelegationState::Active.is_terminal());
    }

    #[test]
    fn test_grant_input_validation() {
        let input = GrantDelegation::new("", "bob", DelegationScope::default());
        assert!(input.validate().is_err());

        let input = GrantDelegation::new("alice", "bob", DelegationScope::default());
        assert!(input.validate().is_ok());
    }
}
