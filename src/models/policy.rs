use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use super::PolicyRule;

/// An ordered collection of rules.
///
/// Policies are values: every "mutating" operation returns a new policy and
/// leaves the receiver untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    rules: Vec<PolicyRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extends: Option<String>,
}

impl Policy {
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self {
            rules,
            name: None,
            extends: None,
        }
    }

    pub fn named(name: impl Into<String>, rules: Vec<PolicyRule>) -> Self {
        Self::new(rules).with_name(name)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Record the name of the policy this one extends.
    pub fn extending(mut self, base: impl Into<String>) -> Self {
        self.extends = Some(base.into());
        self
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn extends(&self) -> Option<&str> {
        self.extends.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PolicyRule> {
        self.rules.iter()
    }

    /// Rules ordered by priority, highest first.
    ///
    /// The sort is stable: rules with equal priority keep their insertion
    /// order, which is what makes first-match resolution deterministic.
    pub fn sorted_by_priority(&self) -> Vec<PolicyRule> {
        self.by_priority().into_iter().cloned().collect()
    }

    /// Borrowing form of [`Policy::sorted_by_priority`].
    pub fn by_priority(&self) -> Vec<&PolicyRule> {
        let mut ordered: Vec<&PolicyRule> = self.rules.iter().collect();
        // slice::sort_by_key is stable
        ordered.sort_by_key(|rule| Reverse(rule.priority));
        ordered
    }

    /// Return a new policy with `rule` appended.
    pub fn add_rule(&self, rule: PolicyRule) -> Policy {
        let mut rules = Vec::with_capacity(self.rules.len() + 1);
        rules.extend_from_slice(&self.rules);
        rules.push(rule);
        Self {
            rules,
            name: self.name.clone(),
            extends: self.extends.clone(),
        }
    }

    /// Return a new policy with `base`'s rules placed before this policy's
    /// own rules.
    ///
    /// Priority still governs primary ordering; placement only matters among
    /// rules of equal priority.
    pub fn inherit_from(&self, base: &Policy) -> Policy {
        let mut rules = Vec::with_capacity(base.rules.len() + self.rules.len());
        rules.extend_from_slice(&base.rules);
        rules.extend_from_slice(&self.rules);
        Self {
            rules,
            name: self.name.clone(),
            extends: self.extends.clone().or_else(|| base.name.clone()),
        }
    }
}

impl From<Vec<PolicyRule>> for Policy {
    fn from(rules: Vec<PolicyRule>) -> Self {
        Self::new(rules)
    }
}

impl<'a> IntoIterator for &'a Policy {
    type Item = &'a PolicyRule;
    type IntoIter = std::slice::Iter<'a, PolicyRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
