//! Effect resolution strategies.

use serde::{Deserialize, Serialize};

use crate::models::{Effect, PolicyRule};

/// Strategy combining the effects of matched rules into one decision.
///
/// Every strategy denies when nothing matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EffectResolver {
    /// Any matching deny wins, otherwise any matching allow.
    #[default]
    Standard,
    /// Deny wins whenever present. Behaves like `Standard`; kept distinct so
    /// callers can state the intent explicitly.
    DenyOverride,
    /// The highest-priority match wins; ties go to the earliest rule.
    Priority,
}

impl EffectResolver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::DenyOverride => "deny_override",
            Self::Priority => "priority",
        }
    }

    /// Whether this resolver depends on priority order.
    pub fn is_priority_ordered(&self) -> bool {
        matches!(self, Self::Priority)
    }

    /// Reduce matched rules to an effect. No match resolves to `Deny`.
    pub fn resolve(&self, matched: &[&PolicyRule]) -> Effect {
        self.deciding_rule(matched)
            .map_or(Effect::Deny, |rule| rule.effect)
    }

    /// The rule whose effect decides the outcome, if any rule matched.
    pub fn deciding_rule<'a>(&self, matched: &[&'a PolicyRule]) -> Option<&'a PolicyRule> {
        match self {
            Self::Standard | Self::DenyOverride => matched
                .iter()
                .find(|rule| rule.effect == Effect::Deny)
                .or_else(|| matched.iter().find(|rule| rule.effect == Effect::Allow))
                .copied(),
            // Equivalent to taking the first rule of a stable priority sort,
            // without relying on the caller having sorted.
            Self::Priority => matched.iter().copied().fold(None, |best, rule| match best {
                Some(best) if best.priority >= rule.priority => Some(best),
                _ => Some(rule),
            }),
        }
    }
}
