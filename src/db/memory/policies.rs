use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::{
    authz::pattern_matches,
    db::{
        error::{DbError, DbResult},
        repos::PolicyRepo,
    },
    models::{Policy, PolicyRule, Resource, Subject},
};

struct StoredPolicy {
    policy: Policy,
    deleted_at: Option<DateTime<Utc>>,
}

impl StoredPolicy {
    fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// In-memory [`PolicyRepo`].
#[derive(Default)]
pub struct InMemoryPolicyRepo {
    policies: DashMap<String, StoredPolicy>,
}

impl InMemoryPolicyRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn name_of(policy: &Policy) -> DbResult<String> {
        match policy.name() {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(DbError::Validation(
                "Policy name cannot be empty".to_string(),
            )),
        }
    }

    /// Snapshot of live policies keyed by name.
    fn live_policies(&self) -> BTreeMap<String, Policy> {
        self.policies
            .iter()
            .filter(|entry| entry.is_live())
            .map(|entry| (entry.key().clone(), entry.policy.clone()))
            .collect()
    }

    /// Append `name`'s rules after those of its bases. Each policy
    /// contributes once; a cycle in `extends` stops at the first revisit.
    fn collect_rules<'a>(
        name: &'a str,
        live: &'a BTreeMap<String, Policy>,
        visited: &mut HashSet<&'a str>,
        rules: &mut Vec<&'a PolicyRule>,
    ) {
        if !visited.insert(name) {
            return;
        }
        let Some(policy) = live.get(name) else {
            return;
        };
        if let Some(base) = policy.extends() {
            if live.contains_key(base) {
                Self::collect_rules(base, live, visited, rules);
            } else {
                tracing::warn!(policy = %name, base = %base, "Base policy not found, skipping");
            }
        }
        rules.extend(policy.iter());
    }
}

/// Whether a rule's subject pattern could match the subject under any
/// matcher (by id or by role).
fn subject_may_match(rule: &PolicyRule, subject: &Subject) -> bool {
    pattern_matches(&rule.subject, &subject.id)
        || subject
            .roles()
            .into_iter()
            .any(|role| pattern_matches(&rule.subject, role))
}

#[async_trait]
impl PolicyRepo for InMemoryPolicyRepo {
    async fn get_policies_for(
        &self,
        subject: &Subject,
        _resource: Option<&Resource>,
    ) -> DbResult<Policy> {
        let live = self.live_policies();
        let mut visited = HashSet::new();
        let mut rules = Vec::new();
        for name in live.keys() {
            Self::collect_rules(name, &live, &mut visited, &mut rules);
        }

        let applicable: Vec<PolicyRule> = rules
            .into_iter()
            .filter(|rule| subject_may_match(rule, subject))
            .cloned()
            .collect();

        tracing::debug!(
            subject = %subject.id,
            policies = live.len(),
            rules = applicable.len(),
            "Loaded policies for subject"
        );

        Ok(Policy::new(applicable))
    }

    async fn get_by_name(&self, name: &str) -> DbResult<Option<Policy>> {
        Ok(self
            .policies
            .get(name)
            .filter(|entry| entry.is_live())
            .map(|entry| entry.policy.clone()))
    }

    async fn save(&self, policy: Policy) -> DbResult<()> {
        let name = Self::name_of(&policy)?;
        self.policies.insert(
            name,
            StoredPolicy {
                policy,
                deleted_at: None,
            },
        );
        Ok(())
    }

    async fn save_many(&self, policies: Vec<Policy>) -> DbResult<()> {
        let named = policies
            .into_iter()
            .map(|policy| Self::name_of(&policy).map(|name| (name, policy)))
            .collect::<DbResult<Vec<_>>>()?;

        for (name, policy) in named {
            self.policies.insert(
                name,
                StoredPolicy {
                    policy,
                    deleted_at: None,
                },
            );
        }
        Ok(())
    }

    async fn delete(&self, name: &str) -> DbResult<()> {
        match self.policies.get_mut(name) {
            Some(mut entry) if entry.is_live() => {
                entry.deleted_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(DbError::NotFound),
        }
    }

    async fn delete_many(&self, names: &[String]) -> DbResult<u64> {
        let mut deleted = 0;
        for name in names {
            match self.delete(name).await {
                Ok(()) => deleted += 1,
                Err(DbError::NotFound) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(deleted)
    }

    async fn restore(&self, name: &str) -> DbResult<()> {
        match self.policies.get_mut(name) {
            Some(mut entry) if !entry.is_live() => {
                entry.deleted_at = None;
                Ok(())
            }
            _ => Err(DbError::NotFound),
        }
    }

    async fn force_delete(&self, name: &str) -> DbResult<()> {
        self.policies
            .remove(name)
            .map(|_| ())
            .ok_or(DbError::NotFound)
    }

    async fn get_trashed(&self) -> DbResult<Vec<Policy>> {
        let mut trashed: Vec<(String, Policy)> = self
            .policies
            .iter()
            .filter(|entry| !entry.is_live())
            .map(|entry| (entry.key().clone(), entry.policy.clone()))
            .collect();
        trashed.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(trashed.into_iter().map(|(_, policy)| policy).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Effect;

    fn subjects(policy: &Policy) -> Vec<&str> {
        policy.iter().map(|r| r.subject.as_str()).collect()
    }

    #[tokio::test]
    async fn test_save_requires_name() {
        let repo = InMemoryPolicyRepo::new();
        let result = repo.save(Policy::new(vec![])).await;
        assert!(matches!(result, Err(DbError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_policies_for_filters_by_subject() {
        let repo = InMemoryPolicyRepo::new();
        repo.save(Policy::named(
            "docs",
            vec![
                PolicyRule::allow("user:*", "doc:*", "read"),
                PolicyRule::allow("editor", "doc:*", "edit"),
                PolicyRule::allow("service:*", "doc:*", "read"),
            ],
        ))
        .await
        .unwrap();

        let policy = repo
            .get_policies_for(&Subject::new("user:1").with_roles(["editor"]), None)
            .await
            .unwrap();
        assert_eq!(subjects(&policy), vec!["user:*", "editor"]);
    }

    #[tokio::test]
    async fn test_get_policies_for_resolves_extends() {
        let repo = InMemoryPolicyRepo::new();
        repo.save_many(vec![
            Policy::named("a-child", vec![PolicyRule::deny("user:1", "doc:1", "read")])
                .extending("z-base"),
            Policy::named("z-base", vec![PolicyRule::allow("user:1", "doc:*", "read")]),
        ])
        .await
        .unwrap();

        let policy = repo
            .get_policies_for(&Subject::new("user:1"), None)
            .await
            .unwrap();
        // Base rules come first and are included once
        let effects: Vec<_> = policy.iter().map(|r| r.effect).collect();
        assert_eq!(effects, vec![Effect::Allow, Effect::Deny]);
    }

    #[tokio::test]
    async fn test_extends_cycle_terminates() {
        let repo = InMemoryPolicyRepo::new();
        repo.save_many(vec![
            Policy::named("a", vec![PolicyRule::allow("u", "r", "x")]).extending("b"),
            Policy::named("b", vec![PolicyRule::allow("u", "r", "y")]).extending("a"),
        ])
        .await
        .unwrap();

        let policy = repo.get_policies_for(&Subject::new("u"), None).await.unwrap();
        assert_eq!(policy.len(), 2);
    }

    #[tokio::test]
    async fn test_save_many_is_all_or_nothing() {
        let repo = InMemoryPolicyRepo::new();
        let result = repo
            .save_many(vec![Policy::named("ok", vec![]), Policy::new(vec![])])
            .await;
        assert!(result.is_err());
        assert!(repo.get_by_name("ok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_soft_delete_restore_and_force_delete() {
        let repo = InMemoryPolicyRepo::new();
        repo.save(Policy::named("p", vec![PolicyRule::allow("u", "r", "read")]))
            .await
            .unwrap();

        repo.delete("p").await.unwrap();
        assert!(repo.get_by_name("p").await.unwrap().is_none());
        assert_eq!(repo.get_trashed().await.unwrap().len(), 1);
        assert!(
            repo.get_policies_for(&Subject::new("u"), None)
                .await
                .unwrap()
                .is_empty()
        );
        assert!(matches!(repo.delete("p").await, Err(DbError::NotFound)));

        repo.restore("p").await.unwrap();
        assert!(repo.get_by_name("p").await.unwrap().is_some());
        assert!(repo.get_trashed().await.unwrap().is_empty());
        assert!(matches!(repo.restore("p").await, Err(DbError::NotFound)));

        repo.force_delete("p").await.unwrap();
        assert!(repo.get_by_name("p").await.unwrap().is_none());
        assert!(matches!(repo.force_delete("p").await, Err(DbError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_many_skips_missing() {
        let repo = InMemoryPolicyRepo::new();
        repo.save_many(vec![Policy::named("a", vec![]), Policy::named("b", vec![])])
            .await
            .unwrap();

        let deleted = repo
            .delete_many(&["a".to_string(), "missing".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        let trashed = repo.get_trashed().await.unwrap();
        let names: Vec<_> = trashed.iter().filter_map(|p| p.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
