use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use super::{Context, DOMAIN_CONTEXT_KEY, Domain};

/// Authorization outcome.
///
/// Defaults to `Deny` so that anything left unset fails closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    #[default]
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Effect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "allow" => Ok(Effect::Allow),
            "deny" => Ok(Effect::Deny),
            _ => Err(format!("Invalid policy effect: {}", s)),
        }
    }
}

/// Rule priority. Higher values are evaluated first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl Priority {
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(1)
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-supplied condition evaluated against the request context.
///
/// The engine never looks inside a predicate; it only invokes it.
pub trait Predicate: Send + Sync {
    fn evaluate(&self, context: &Context) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&Context) -> bool + Send + Sync,
{
    fn evaluate(&self, context: &Context) -> bool {
        self(context)
    }
}

/// Shared handle to a [`Predicate`].
#[derive(Clone)]
pub struct Condition(Arc<dyn Predicate>);

impl Condition {
    pub fn new(predicate: impl Predicate + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    pub fn evaluate(&self, context: &Context) -> bool {
        self.0.evaluate(context)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Condition(..)")
    }
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A declarative authorization rule.
///
/// `resource = None` matches any resource. A rule carrying a condition only
/// applies when the condition holds for the request context; conditions are
/// never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub subject: String,
    #[serde(default)]
    pub resource: Option<String>,
    pub action: String,
    pub effect: Effect,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    #[serde(skip)]
    pub condition: Option<Condition>,
}

/// A rule that carries a [`Condition`].
///
/// Built with [`PolicyRule::with_condition`]; [`PolicyRule::without_condition`]
/// converts it back to the plain form used for persistence and compilation.
pub type ConditionalPolicyRule = PolicyRule;

impl PolicyRule {
    pub fn new(
        subject: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
        effect: Effect,
    ) -> Self {
        Self {
            subject: subject.into(),
            resource: Some(resource.into()),
            action: action.into(),
            effect,
            priority: Priority::default(),
            domain: None,
            condition: None,
        }
    }

    /// A type-level rule that applies to every resource.
    pub fn any_resource(subject: impl Into<String>, action: impl Into<String>, effect: Effect) -> Self {
        Self {
            resource: None,
            ..Self::new(subject, String::new(), action, effect)
        }
    }

    pub fn allow(
        subject: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self::new(subject, resource, action, Effect::Allow)
    }

    pub fn deny(
        subject: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self::new(subject, resource, action, Effect::Deny)
    }

    pub fn with_priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = priority.into();
        self
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn with_condition(mut self, predicate: impl Predicate + 'static) -> ConditionalPolicyRule {
        self.condition = Some(Condition::new(predicate));
        self
    }

    /// Drop the condition, producing an unconditional rule.
    pub fn without_condition(&self) -> PolicyRule {
        Self {
            condition: None,
            ..self.clone()
        }
    }

    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }

    /// Whether the condition (if any) holds. Unconditional rules always hold.
    pub fn condition_holds(&self, context: &Context) -> bool {
        self.condition
            .as_ref()
            .is_none_or(|condition| condition.evaluate(context))
    }

    /// Whether the rule applies in the context's domain.
    ///
    /// Rules without a domain apply everywhere; domain-scoped rules require
    /// the context's `domain` entry to equal the domain id.
    pub fn applies_in_domain(&self, context: &Context) -> bool {
        match &self.domain {
            None => true,
            Some(domain) => context
                .get(DOMAIN_CONTEXT_KEY)
                .and_then(|v| v.as_str())
                .is_some_and(|id| id == domain.id),
        }
    }

    /// The (subject, resource, action) triple identifying this rule.
    pub fn signature(&self) -> RuleSignature {
        RuleSignature {
            subject: self.subject.clone(),
            resource: self.resource.clone(),
            action: self.action.clone(),
        }
    }
}

/// Identity of a rule for grouping and diffing: its patterns, not its
/// effect or priority.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuleSignature {
    pub subject: String,
    pub resource: Option<String>,
    pub action: String,
}

impl fmt::Display for RuleSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.subject,
            self.resource.as_deref().unwrap_or("<any>"),
            self.action
        )
    }
}
