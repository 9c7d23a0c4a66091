use std::collections::HashSet;

use serde::Serialize;

use crate::models::{Policy, PolicyRule, RuleSignature};

/// Rules added, removed and kept between two policy versions.
///
/// Identity is the rule signature (subject, resource, action). A rule whose
/// effect or priority changed is `unchanged`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PolicyDiff {
    /// Rules of the new version with no counterpart in the old one.
    pub added: Vec<PolicyRule>,
    /// Rules of the old version with no counterpart in the new one.
    pub removed: Vec<PolicyRule>,
    /// Rules of the new version whose signature also appears in the old one.
    pub unchanged: Vec<PolicyRule>,
}

impl PolicyDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compare two policy versions by rule signature.
pub fn diff(old: &Policy, new: &Policy) -> PolicyDiff {
    let old_signatures: HashSet<RuleSignature> = old.iter().map(PolicyRule::signature).collect();
    let new_signatures: HashSet<RuleSignature> = new.iter().map(PolicyRule::signature).collect();

    let (unchanged, added): (Vec<PolicyRule>, Vec<PolicyRule>) = new
        .iter()
        .cloned()
        .partition(|rule| old_signatures.contains(&rule.signature()));
    let removed: Vec<PolicyRule> = old
        .iter()
        .filter(|rule| !new_signatures.contains(&rule.signature()))
        .cloned()
        .collect();

    tracing::debug!(
        old = ?old.name(),
        new = ?new.name(),
        added = added.len(),
        removed = removed.len(),
        unchanged = unchanged.len(),
        "Diffed policies"
    );

    PolicyDiff {
        added,
        removed,
        unchanged,
    }
}
