use std::sync::Arc;

use super::{DelegationError, ValidationError};
use crate::{
    authz::{PolicyEvaluator, is_glob, pattern_matches},
    db::{DelegationRepo, PolicyRepo},
    models::{Action, Context, DOMAIN_CONTEXT_KEY, DelegationScope, Effect, Policy, Resource, Subject},
};

/// Confirms a delegator holds every permission it wants to hand off.
///
/// Each (resource pattern, action pattern) pair of the scope is evaluated
/// with the pattern itself as the representative resource and action, so a
/// delegator holding `document:*` may delegate `document:*` or `document:1`,
/// but one holding only `document:1` may not delegate `document:*`.
///
/// A wildcard pair is also refused when a deny rule carves an exception out
/// of it: holding `allow document:*` and `deny document:secret read` does
/// not let the delegator hand off `document:*` read.
///
/// When a delegation store is attached, a pair the policy denies is still
/// accepted if the delegator holds an active transitive delegation covering
/// it. This is what lets a chain A → B → C re-delegate.
pub struct DelegationValidator {
    evaluator: PolicyEvaluator,
    policies: Arc<dyn PolicyRepo>,
    delegations: Option<Arc<dyn DelegationRepo>>,
}

impl DelegationValidator {
    pub fn new(evaluator: PolicyEvaluator, policies: Arc<dyn PolicyRepo>) -> Self {
        Self {
            evaluator,
            policies,
            delegations: None,
        }
    }

    /// Also accept permissions held through transitive delegations.
    pub fn with_delegations(mut self, delegations: Arc<dyn DelegationRepo>) -> Self {
        self.delegations = Some(delegations);
        self
    }

    /// Validate that `delegator_id` holds every pair in `scope`.
    ///
    /// An empty scope passes without consulting the policy store.
    ///
    /// # Errors
    /// - [`DelegationError::ValidationFailed`] naming the first pair not held
    /// - [`DelegationError::Storage`] if a store lookup fails
    pub async fn validate(
        &self,
        delegator_id: &str,
        scope: &DelegationScope,
    ) -> Result<(), DelegationError> {
        self.validate_subject(&Subject::new(delegator_id), scope)
            .await
    }

    /// Like [`DelegationValidator::validate`] for a subject carrying roles
    /// and attributes.
    pub async fn validate_subject(
        &self,
        delegator: &Subject,
        scope: &DelegationScope,
    ) -> Result<(), DelegationError> {
        if scope.is_empty() {
            tracing::debug!(delegator = %delegator.id, "Empty delegation scope, nothing to validate");
            return Ok(());
        }

        let policy = self.policies.get_policies_for(delegator, None).await?;

        let mut context = Context::new();
        if let Some(domain) = &scope.domain {
            context.insert(DOMAIN_CONTEXT_KEY.to_string(), domain.clone().into());
        }

        // Loaded lazily, only when the policy alone is not enough
        let mut held_transitively = None;

        for (resource_pattern, action_pattern) in scope.pairs() {
            let resource = Resource::from_id(resource_pattern);
            let action = Action::new(action_pattern);

            let effect =
                self.evaluator
                    .evaluate(&policy, delegator, Some(&resource), &action, &context);
            if effect.is_allow()
                && !self.has_denied_exception(
                    &policy,
                    delegator,
                    resource_pattern,
                    action_pattern,
                    &context,
                )
            {
                continue;
            }

            if let Some(delegations) = &self.delegations {
                if held_transitively.is_none() {
                    let active = delegations.find_active_for_delegate(&delegator.id).await?;
                    held_transitively = Some(
                        active
                            .into_iter()
                            .filter(|d| d.is_transitive)
                            .collect::<Vec<_>>(),
                    );
                }
                let covered = held_transitively.iter().flatten().any(|d| {
                    d.scope.matches(resource_pattern, action_pattern)
                });
                if covered {
                    tracing::debug!(
                        delegator = %delegator.id,
                        resource = resource_pattern,
                        action = action_pattern,
                        "Permission held through transitive delegation"
                    );
                    continue;
                }
            }

            tracing::debug!(
                delegator = %delegator.id,
                resource = resource_pattern,
                action = action_pattern,
                "Delegator does not hold permission"
            );
            return Err(ValidationError::PermissionNotHeld {
                delegator: delegator.id.clone(),
                resource: resource_pattern.to_string(),
                action: action_pattern.to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Whether a deny rule inside a wildcard pair denies the delegator some
    /// resource or action the pair would hand off.
    fn has_denied_exception(
        &self,
        policy: &Policy,
        delegator: &Subject,
        resource_pattern: &str,
        action_pattern: &str,
        context: &Context,
    ) -> bool {
        if !is_glob(resource_pattern) && !is_glob(action_pattern) {
            return false;
        }

        policy
            .iter()
            .filter(|rule| rule.effect == Effect::Deny)
            .filter_map(|rule| {
                let resource = match rule.resource.as_deref() {
                    None => resource_pattern,
                    Some(r) if pattern_matches(resource_pattern, r) => r,
                    Some(_) => return None,
                };
                let action = if pattern_matches(action_pattern, &rule.action) {
                    rule.action.as_str()
                } else if pattern_matches(&rule.action, action_pattern) {
                    action_pattern
                } else {
                    return None;
                };
                Some((resource, action))
            })
            .any(|(resource, action)| {
                let denied = !self
                    .evaluator
                    .evaluate(
                        policy,
                        delegator,
                        Some(&Resource::from_id(resource)),
                        &Action::new(action),
                        context,
                    )
                    .is_allow();
                if denied {
                    tracing::debug!(
                        delegator = %delegator.id,
                        resource,
                        action,
                        "Deny rule carves an exception out of the delegated scope"
                    );
                }
                denied
            })
    }
}
