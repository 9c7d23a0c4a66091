//! Policy evaluator composing a rule matcher and an effect resolver.

use serde::{Deserialize, Serialize};

use super::{EffectResolver, RuleMatcher};
use crate::{
    config::EvaluationConfig,
    models::{Action, Context, Effect, Policy, PolicyRule, Resource, Subject},
    observability::metrics,
};

/// Configuration for authorization decision audit logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Log allowed authorization decisions.
    /// Defaults to false (only denied decisions are logged).
    #[serde(default)]
    pub log_allowed: bool,

    /// Log denied authorization decisions.
    /// Defaults to true for security monitoring.
    #[serde(default = "default_true")]
    pub log_denied: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_allowed: false,
            log_denied: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Result of an authorization check.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub effect: Effect,
    /// The rule that decided the outcome (None on default deny)
    pub rule: Option<PolicyRule>,
    /// Number of rules that matched the request
    pub matched: usize,
    /// Human-readable reason
    pub reason: String,
}

impl Decision {
    fn by_rule(rule: &PolicyRule, matched: usize) -> Self {
        Self {
            effect: rule.effect,
            reason: format!("Rule '{}' {}", rule.signature(), rule.effect),
            rule: Some(rule.without_condition()),
            matched,
        }
    }

    fn deny_default() -> Self {
        Self {
            effect: Effect::Deny,
            rule: None,
            matched: 0,
            reason: "No matching rule (default deny)".to_string(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.effect.is_allow()
    }
}

/// Answers a single authorization question against a [`Policy`].
///
/// The evaluator is immutable and holds no per-request state.
#[derive(Debug, Clone, Default)]
pub struct PolicyEvaluator {
    matcher: RuleMatcher,
    resolver: EffectResolver,
    audit: AuditConfig,
}

impl PolicyEvaluator {
    pub fn new(matcher: RuleMatcher, resolver: EffectResolver) -> Self {
        Self {
            matcher,
            resolver,
            audit: AuditConfig::default(),
        }
    }

    pub fn from_config(config: &EvaluationConfig) -> Self {
        Self {
            matcher: config.matcher,
            resolver: config.resolver,
            audit: config.audit.clone(),
        }
    }

    pub fn with_audit(mut self, audit: AuditConfig) -> Self {
        self.audit = audit;
        self
    }

    pub fn matcher(&self) -> RuleMatcher {
        self.matcher
    }

    pub fn resolver(&self) -> EffectResolver {
        self.resolver
    }

    /// Decide the effect for a request. Never fails: no match is a deny.
    pub fn evaluate(
        &self,
        policy: &Policy,
        subject: &Subject,
        resource: Option<&Resource>,
        action: &Action,
        context: &Context,
    ) -> Effect {
        self.decide(policy, subject, resource, action, context).effect
    }

    /// Like [`PolicyEvaluator::evaluate`], also reporting which rule decided.
    pub fn decide(
        &self,
        policy: &Policy,
        subject: &Subject,
        resource: Option<&Resource>,
        action: &Action,
        context: &Context,
    ) -> Decision {
        let matched = self.matching_rules(policy, subject, resource, action, context);

        let decision = match self.resolver.deciding_rule(&matched) {
            Some(rule) => Decision::by_rule(rule, matched.len()),
            None => Decision::deny_default(),
        };

        tracing::debug!(
            subject = %subject.id,
            resource = ?resource.map(|r| r.id.as_str()),
            action = %action.name,
            matcher = self.matcher.as_str(),
            resolver = self.resolver.as_str(),
            rules = policy.len(),
            matched = decision.matched,
            effect = %decision.effect,
            "Evaluated policy"
        );
        self.audit_decision(&decision, subject, resource, action);
        metrics::record_decision(decision.effect, self.matcher.as_str());

        decision
    }

    /// Rules of `policy` that apply to the request, in scan order.
    ///
    /// Priority-ordered strategies scan `policy.by_priority()`; the others
    /// scan insertion order.
    pub fn matching_rules<'a>(
        &self,
        policy: &'a Policy,
        subject: &Subject,
        resource: Option<&Resource>,
        action: &Action,
        context: &Context,
    ) -> Vec<&'a PolicyRule> {
        let candidates: Vec<&PolicyRule> =
            if self.matcher.is_priority_ordered() || self.resolver.is_priority_ordered() {
                policy.by_priority()
            } else {
                policy.iter().collect()
            };

        candidates
            .into_iter()
            .filter(|rule| {
                self.matcher
                    .matches(rule, subject, resource, action, context)
            })
            .collect()
    }

    fn audit_decision(
        &self,
        decision: &Decision,
        subject: &Subject,
        resource: Option<&Resource>,
        action: &Action,
    ) {
        let should_log = match decision.effect {
            Effect::Allow => self.audit.log_allowed,
            Effect::Deny => self.audit.log_denied,
        };
        if !should_log {
            return;
        }

        tracing::info!(
            target: "castellan::audit",
            subject = %subject.id,
            resource = ?resource.map(|r| r.id.as_str()),
            action = %action.name,
            effect = %decision.effect,
            reason = %decision.reason,
            "Authorization decision"
        );
    }
}
