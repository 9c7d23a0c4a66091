use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::models::{Effect, Policy, PolicyRule, Priority, RuleSignature};

/// Rules on one triple that disagree on the effect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllowDenyConflict {
    pub signature: RuleSignature,
    /// Every rule of the triple, in policy order.
    pub rules: Vec<PolicyRule>,
}

/// Two or more rules sharing a priority value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityCollision {
    pub priority: Priority,
    pub rules: Vec<PolicyRule>,
}

/// An allow that can never decide because a deny on the same triple has
/// strictly higher priority.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnreachableRule {
    pub rule: PolicyRule,
    pub shadowed_by: PolicyRule,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConflictReport {
    pub allow_deny_conflicts: Vec<AllowDenyConflict>,
    /// Highest priority first.
    pub priority_collisions: Vec<PriorityCollision>,
    pub unreachable_rules: Vec<UnreachableRule>,
}

impl ConflictReport {
    pub fn is_empty(&self) -> bool {
        self.allow_deny_conflicts.is_empty()
            && self.priority_collisions.is_empty()
            && self.unreachable_rules.is_empty()
    }

    /// Whether the report contains findings that change decisions.
    /// Priority collisions alone are informational.
    pub fn has_conflicts(&self) -> bool {
        !self.allow_deny_conflicts.is_empty() || !self.unreachable_rules.is_empty()
    }
}

/// Inspect `policy` for conflicting, colliding and unreachable rules.
pub fn detect_conflicts(policy: &Policy) -> ConflictReport {
    let triples = group_by_signature(policy);

    let mut report = ConflictReport::default();
    for (signature, rules) in &triples {
        let has_allow = rules.iter().any(|r| r.effect == Effect::Allow);
        let has_deny = rules.iter().any(|r| r.effect == Effect::Deny);
        if !(has_allow && has_deny) {
            continue;
        }

        report.allow_deny_conflicts.push(AllowDenyConflict {
            signature: signature.clone(),
            rules: rules.iter().map(|r| (*r).clone()).collect(),
        });

        // Highest-priority deny, earliest on ties
        let strongest_deny = rules
            .iter()
            .filter(|r| r.effect == Effect::Deny)
            .copied()
            .fold(None::<&PolicyRule>, |best, rule| match best {
                Some(best) if best.priority >= rule.priority => Some(best),
                _ => Some(rule),
            });
        if let Some(deny) = strongest_deny {
            report.unreachable_rules.extend(
                rules
                    .iter()
                    .filter(|r| r.effect == Effect::Allow && r.priority < deny.priority)
                    .map(|allow| UnreachableRule {
                        rule: (*allow).clone(),
                        shadowed_by: deny.clone(),
                    }),
            );
        }
    }

    let mut by_priority: BTreeMap<Priority, Vec<PolicyRule>> = BTreeMap::new();
    for rule in policy {
        by_priority.entry(rule.priority).or_default().push(rule.clone());
    }
    report.priority_collisions = by_priority
        .into_iter()
        .rev()
        .filter(|(_, rules)| rules.len() > 1)
        .map(|(priority, rules)| PriorityCollision { priority, rules })
        .collect();

    tracing::debug!(
        policy = ?policy.name(),
        rules = policy.len(),
        conflicts = report.allow_deny_conflicts.len(),
        collisions = report.priority_collisions.len(),
        unreachable = report.unreachable_rules.len(),
        "Analyzed policy"
    );

    report
}

/// Rules grouped by exact triple, groups in order of first appearance.
fn group_by_signature(policy: &Policy) -> Vec<(RuleSignature, Vec<&PolicyRule>)> {
    let mut index: HashMap<RuleSignature, usize> = HashMap::new();
    let mut groups: Vec<(RuleSignature, Vec<&PolicyRule>)> = Vec::new();

    for rule in policy {
        let signature = rule.signature();
        match index.get(&signature) {
            Some(&i) => groups[i].1.push(rule),
            None => {
                index.insert(signature.clone(), groups.len());
                groups.push((signature, vec![rule]));
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_deny_conflict() {
        let policy = Policy::new(vec![
            PolicyRule::allow("admin", "doc", "read").with_priority(1),
            PolicyRule::deny("admin", "doc", "read").with_priority(2),
        ]);
        let report = detect_conflicts(&policy);

        assert_eq!(report.allow_deny_conflicts.len(), 1);
        assert_eq!(report.allow_deny_conflicts[0].rules, policy.rules().to_vec());
        assert_eq!(
            report.allow_deny_conflicts[0].signature.to_string(),
            "admin doc read"
        );
        // The priority-1 allow loses to the priority-2 deny
        assert_eq!(report.unreachable_rules.len(), 1);
        assert!(report.has_conflicts());
    }

    #[test]
    fn test_unreachable_allow() {
        let policy = Policy::new(vec![
            PolicyRule::deny("admin", "secret", "read").with_priority(100),
            PolicyRule::allow("admin", "secret", "read").with_priority(10),
        ]);
        let report = detect_conflicts(&policy);

        assert_eq!(report.unreachable_rules.len(), 1);
        let unreachable = &report.unreachable_rules[0];
        assert_eq!(unreachable.rule.priority, Priority(10));
        assert_eq!(unreachable.rule.effect, Effect::Allow);
        assert_eq!(unreachable.shadowed_by.priority, Priority(100));
    }

    #[test]
    fn test_equal_priority_not_unreachable() {
        let policy = Policy::new(vec![
            PolicyRule::allow("u", "r", "read").with_priority(5),
            PolicyRule::deny("u", "r", "read").with_priority(5),
        ]);
        let report = detect_conflicts(&policy);

        assert_eq!(report.allow_deny_conflicts.len(), 1);
        assert!(report.unreachable_rules.is_empty());
        assert_eq!(report.priority_collisions.len(), 1);
    }

    #[test]
    fn test_higher_priority_allow_stays_reachable() {
        let policy = Policy::new(vec![
            PolicyRule::allow("u", "r", "read").with_priority(20),
            PolicyRule::deny("u", "r", "read").with_priority(10),
            PolicyRule::allow("u", "r", "read").with_priority(1),
        ]);
        let report = detect_conflicts(&policy);

        assert_eq!(report.unreachable_rules.len(), 1);
        assert_eq!(report.unreachable_rules[0].rule.priority, Priority(1));
    }

    #[test]
    fn test_priority_collisions_ordered() {
        let policy = Policy::new(vec![
            PolicyRule::allow("a", "r", "read").with_priority(1),
            PolicyRule::allow("b", "r", "read").with_priority(7),
            PolicyRule::allow("c", "r", "read").with_priority(1),
            PolicyRule::allow("d", "r", "read").with_priority(7),
            PolicyRule::allow("e", "r", "read").with_priority(3),
        ]);
        let report = detect_conflicts(&policy);

        let priorities: Vec<_> = report
            .priority_collisions
            .iter()
            .map(|c| c.priority.value())
            .collect();
        assert_eq!(priorities, vec![7, 1]);
        let subjects: Vec<_> = report.priority_collisions[1]
            .rules
            .iter()
            .map(|r| r.subject.as_str())
            .collect();
        assert_eq!(subjects, vec!["a", "c"]);
        // Different triples never conflict
        assert!(report.allow_deny_conflicts.is_empty());
        assert!(!report.has_conflicts());
    }

    #[test]
    fn test_null_resource_is_its_own_triple() {
        let policy = Policy::new(vec![
            PolicyRule::any_resource("u", "read", Effect::Allow),
            PolicyRule::deny("u", "r", "read").with_priority(2),
        ]);
        let report = detect_conflicts(&policy);
        assert!(report.allow_deny_conflicts.is_empty());
        assert!(report.unreachable_rules.is_empty());
    }

    #[test]
    fn test_empty_policy() {
        assert!(detect_conflicts(&Policy::default()).is_empty());
    }
}
