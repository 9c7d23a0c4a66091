use serde::Serialize;

use crate::{
    authz::{is_glob, pattern_matches},
    models::{Effect, Priority},
};

/// A compiled test on one request component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Guard {
    /// Always true: `*` or an unset resource pattern.
    Any,
    Exact(String),
    Glob(String),
}

impl Guard {
    pub fn from_pattern(pattern: Option<&str>) -> Self {
        match pattern {
            None | Some("*") => Self::Any,
            Some(p) if is_glob(p) => Self::Glob(p.to_string()),
            Some(p) => Self::Exact(p.to_string()),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == value,
            Self::Glob(pattern) => pattern_matches(pattern, value),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

/// One guarded return of a compiled policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledRule {
    pub subject: Guard,
    pub resource: Guard,
    pub action: Guard,
    pub effect: Effect,
    pub priority: Priority,
}

impl CompiledRule {
    pub fn matches(&self, subject: &str, resource: &str, action: &str) -> bool {
        self.subject.matches(subject) && self.resource.matches(resource) && self.action.matches(action)
    }

    /// True when no guard can fail, so later entries are unreachable.
    pub fn is_unconditional(&self) -> bool {
        self.subject.is_any() && self.resource.is_any() && self.action.is_any()
    }

    pub(crate) fn has_glob(&self) -> bool {
        [&self.subject, &self.resource, &self.action]
            .into_iter()
            .any(|guard| matches!(guard, Guard::Glob(_)))
    }
}

/// A policy specialized into an ordered decision table.
///
/// Entries are in priority-descending order; the first matching entry
/// decides, and no match is a deny.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPolicy {
    pub(crate) id: String,
    pub(crate) entries: Vec<CompiledRule>,
}

impl CompiledPolicy {
    /// Content-derived identifier: equal rule tables share an id.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn entries(&self) -> &[CompiledRule] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn evaluate(&self, subject: &str, resource: &str, action: &str) -> Effect {
        self.entries
            .iter()
            .find(|entry| entry.matches(subject, resource, action))
            .map_or(Effect::Deny, |entry| entry.effect)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(None, "anything", true)]
    #[case(Some("*"), "", true)]
    #[case(Some("document:1"), "document:1", true)]
    #[case(Some("document:1"), "document:10", false)]
    #[case(Some("document:?"), "document:7", true)]
    #[case(Some("doc*:1"), "document:1", true)]
    #[case(Some("doc*:1"), "document:2", false)]
    fn test_guard_matches(#[case] pattern: Option<&str>, #[case] value: &str, #[case] expected: bool) {
        assert_eq!(Guard::from_pattern(pattern).matches(value), expected);
    }

    #[test]
    fn test_guard_kinds() {
        assert_eq!(Guard::from_pattern(None), Guard::Any);
        assert_eq!(Guard::from_pattern(Some("*")), Guard::Any);
        assert_eq!(Guard::from_pattern(Some("a*")), Guard::Glob("a*".into()));
        assert_eq!(Guard::from_pattern(Some("a")), Guard::Exact("a".into()));
    }
}
