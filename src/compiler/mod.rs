//! Ahead-of-time policy compilation.
//!
//! A [`Policy`] is specialized into a [`CompiledPolicy`] decision table:
//! rules in stable priority-descending order, duplicates by signature
//! dropped (the first one wins under priority resolution anyway), each
//! pattern turned into a [`Guard`]. The table can be evaluated directly or
//! rendered as a Rust module for hosts that build it in.
//!
//! The table is equivalent to [`crate::authz::PolicyEvaluator`] with the
//! priority matcher and resolver for requests without context. Two things
//! have no compiled form:
//! - conditions, which are dropped (the rule compiles as unconditional)
//! - domain-scoped rules, which are left out

mod codegen;
mod table;

use std::collections::HashSet;

use sha2::{Digest, Sha256};
pub use table::{CompiledPolicy, CompiledRule, Guard};

use crate::{config::CompilerConfig, models::Policy};

/// Hex characters of the content hash used in generated names.
const ID_LEN: usize = 16;

/// Strict and reserved keywords (edition 2024) usable as raw identifiers.
const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Path keywords, which cannot be raw identifiers.
const PATH_KEYWORDS: &[&str] = &["crate", "self", "super", "Self"];

#[derive(Debug, Clone, Default)]
pub struct PolicyCompiler {
    config: CompilerConfig,
}

impl PolicyCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Compile `policy` to Rust source in module `namespace`.
    ///
    /// Output is byte-identical for equal policies. Characters that cannot
    /// appear in a module name are replaced with `_`.
    pub fn compile(&self, policy: &Policy, namespace: &str) -> String {
        let table = self.compile_table(policy);
        let module = module_name(namespace, &self.config.default_namespace);
        let source = codegen::render(&table, &module);

        tracing::debug!(
            policy = ?policy.name(),
            id = %table.id,
            module = %module,
            entries = table.entries.len(),
            bytes = source.len(),
            "Compiled policy"
        );
        source
    }

    /// Compile into the configured default namespace.
    pub fn compile_default(&self, policy: &Policy) -> String {
        self.compile(policy, &self.config.default_namespace)
    }

    /// Build the decision table for `policy`.
    pub fn compile_table(&self, policy: &Policy) -> CompiledPolicy {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for rule in policy.by_priority() {
            if let Some(domain) = &rule.domain {
                tracing::warn!(
                    rule = %rule.signature(),
                    domain = %domain.id,
                    "Domain-scoped rule left out of compiled policy"
                );
                continue;
            }
            if !seen.insert(rule.signature()) {
                continue;
            }
            if rule.is_conditional() {
                tracing::warn!(
                    rule = %rule.signature(),
                    "Condition dropped from compiled rule"
                );
            }

            let entry = CompiledRule {
                subject: Guard::from_pattern(Some(&rule.subject)),
                resource: Guard::from_pattern(rule.resource.as_deref()),
                action: Guard::from_pattern(Some(&rule.action)),
                effect: rule.effect,
                priority: rule.priority,
            };
            let unconditional = entry.is_unconditional();
            entries.push(entry);
            if unconditional {
                // Everything after a catch-all is unreachable
                break;
            }
        }

        CompiledPolicy {
            id: table_id(&entries),
            entries,
        }
    }
}

fn table_id(entries: &[CompiledRule]) -> String {
    let canonical = serde_json::to_vec(entries).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    let mut id = hex::encode(hasher.finalize());
    id.truncate(ID_LEN);
    id
}

fn module_name(namespace: &str, fallback: &str) -> String {
    let mut name: String = namespace
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if name.is_empty() || name == "_" {
        name = fallback.to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    if PATH_KEYWORDS.contains(&name.as_str()) {
        name.push('_');
    } else if RUST_KEYWORDS.contains(&name.as_str()) {
        name.insert_str(0, "r#");
    }
    if name != namespace {
        tracing::debug!(namespace, module = %name, "Adjusted namespace to a valid module name");
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        authz::{EffectResolver, PolicyEvaluator, RuleMatcher},
        models::{Action, Context, Domain, Effect, PolicyRule, Resource, Subject},
    };

    fn example_policy() -> Policy {
        Policy::new(vec![PolicyRule::allow("user:123", "document:456", "read")])
    }

    #[test]
    fn test_compile_is_deterministic() {
        let compiler = PolicyCompiler::new();
        let policy = Policy::new(vec![
            PolicyRule::allow("user:*", "document:*", "read").with_priority(5),
            PolicyRule::deny("user:mallory", "*", "*").with_priority(10),
            PolicyRule::any_resource("admin", "*", Effect::Allow),
        ]);

        let first = compiler.compile(&policy, "authz");
        let second = compiler.compile(&policy.clone(), "authz");
        assert_eq!(first, second);
        assert_eq!(compiler.compile_table(&policy).id(), compiler.compile_table(&policy).id());
    }

    #[test]
    fn test_single_rule_routine() {
        let compiler = PolicyCompiler::new();
        let table = compiler.compile_table(&example_policy());

        assert_eq!(table.evaluate("user:123", "document:456", "read"), Effect::Allow);
        assert_eq!(table.evaluate("user:124", "document:456", "read"), Effect::Deny);
        assert_eq!(table.evaluate("user:123", "document:457", "read"), Effect::Deny);
        assert_eq!(table.evaluate("user:123", "document:456", "write"), Effect::Deny);

        let source = compiler.compile(&example_policy(), "generated");
        assert!(source.contains("pub mod generated {"));
        assert!(source.contains(&format!("pub struct Policy_{};", table.id())));
        assert!(source.contains(
            r#"if subject == "user:123" && resource == "document:456" && action == "read" {"#
        ));
        assert!(source.contains("return Effect::Allow;"));
        assert!(source.trim_end().ends_with("}"));
        assert!(source.contains("            Effect::Deny\n"));
        assert!(!source.contains("fn wildcard_match"));
    }

    #[test]
    fn test_empty_policy_compiles_to_default_deny() {
        let compiler = PolicyCompiler::new();
        let table = compiler.compile_table(&Policy::default());
        assert!(table.is_empty());
        assert_eq!(table.evaluate("a", "b", "c"), Effect::Deny);

        let source = compiler.compile(&Policy::default(), "empty");
        assert!(!source.contains("return Effect::"));
        assert!(source.contains("Effect::Deny"));
    }

    #[test]
    fn test_wildcards_compile_to_open_guards() {
        let compiler = PolicyCompiler::new();
        let policy = Policy::new(vec![
            PolicyRule::any_resource("admin", "read", Effect::Allow),
            PolicyRule::allow("*", "public:*", "*"),
        ]);
        let source = compiler.compile(&policy, "ns");

        assert!(source.contains(r#"if subject == "admin" && action == "read" {"#));
        assert!(source.contains(r#"if wildcard_match("public:*", resource) {"#));
        assert!(source.contains("fn wildcard_match"));
    }

    #[test]
    fn test_priority_order_and_dedup() {
        let compiler = PolicyCompiler::new();
        let policy = Policy::new(vec![
            PolicyRule::allow("u", "r", "read").with_priority(1),
            PolicyRule::deny("u", "r", "read").with_priority(1),
            PolicyRule::deny("u", "r", "write").with_priority(9),
        ]);
        let table = compiler.compile_table(&policy);

        let summary: Vec<_> = table
            .entries()
            .iter()
            .map(|e| (e.action.clone(), e.effect))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Guard::Exact("write".into()), Effect::Deny),
                (Guard::Exact("read".into()), Effect::Allow),
            ]
        );
    }

    #[test]
    fn test_catch_all_ends_table() {
        let compiler = PolicyCompiler::new();
        let policy = Policy::new(vec![
            PolicyRule::deny("*", "*", "*").with_priority(100),
            PolicyRule::allow("u", "r", "read"),
        ]);
        let table = compiler.compile_table(&policy);
        assert_eq!(table.len(), 1);
        assert!(compiler.compile(&policy, "ns").contains("if true {"));
    }

    #[test]
    fn test_matches_priority_evaluator() {
        let policy = Policy::new(vec![
            PolicyRule::allow("user:*", "document:*", "read").with_priority(1),
            PolicyRule::deny("user:mallory", "document:*", "*").with_priority(50),
            PolicyRule::allow("user:?", "report:*", "*").with_priority(3),
            PolicyRule::deny("user:1", "report:secret", "read").with_priority(3),
            PolicyRule::any_resource("auditor", "list", Effect::Allow),
        ]);
        let table = PolicyCompiler::new().compile_table(&policy);
        let evaluator = PolicyEvaluator::new(RuleMatcher::Priority, EffectResolver::Priority);

        let subjects = ["user:1", "user:mallory", "auditor", "user:22"];
        let resources = ["document:1", "report:secret", "report:q3", "invoice:9"];
        let actions = ["read", "write", "list"];
        for subject in subjects {
            for resource in resources {
                for action in actions {
                    let expected = evaluator.evaluate(
                        &policy,
                        &Subject::new(subject),
                        Some(&Resource::from_id(resource)),
                        &Action::new(action),
                        &Context::new(),
                    );
                    assert_eq!(
                        table.evaluate(subject, resource, action),
                        expected,
                        "{subject} {resource} {action}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_domain_rules_excluded_and_conditions_dropped() {
        let policy = Policy::new(vec![
            PolicyRule::allow("u", "r", "read").with_domain(Domain::new("tenant-a")),
            PolicyRule::allow("u", "r", "write").with_condition(|_: &Context| false),
        ]);
        let table = PolicyCompiler::new().compile_table(&policy);

        assert_eq!(table.len(), 1);
        assert_eq!(table.evaluate("u", "r", "read"), Effect::Deny);
        assert_eq!(table.evaluate("u", "r", "write"), Effect::Allow);
    }

    #[test]
    fn test_id_tracks_content() {
        let compiler = PolicyCompiler::new();
        let a = compiler.compile_table(&example_policy());
        let b = compiler.compile_table(&example_policy().add_rule(PolicyRule::deny("x", "y", "z")));
        assert_eq!(a.id().len(), ID_LEN);
        assert_ne!(a.id(), b.id());
        // Names and namespaces do not affect the id
        assert_eq!(a.id(), compiler.compile_table(&example_policy().with_name("v2")).id());
    }

    mod generated {
        include!("testdata/golden_policy.rs");
    }

    fn golden_policy() -> Policy {
        Policy::new(vec![
            PolicyRule::allow("user:*", "document:*", "read").with_priority(1),
            PolicyRule::deny("user:mallory", "document:*", "*").with_priority(50),
            PolicyRule::allow("user:?", "report:*", "*").with_priority(3),
            PolicyRule::deny("user:1", "report:secret", "read").with_priority(3),
            PolicyRule::any_resource("auditor", "list", Effect::Allow),
        ])
    }

    #[test]
    fn test_generated_source_matches_golden() {
        let compiler = PolicyCompiler::new();
        let source = compiler.compile(&golden_policy(), "golden");
        assert_eq!(source, include_str!("testdata/golden_policy.rs"));
        assert_eq!(
            generated::golden::Policy_48e50e45a49457ff::ID,
            compiler.compile_table(&golden_policy()).id()
        );
    }

    #[test]
    fn test_generated_routine_matches_priority_evaluator() {
        use generated::golden::{Effect as GeneratedEffect, Policy_48e50e45a49457ff as Generated};

        let policy = golden_policy();
        let evaluator = PolicyEvaluator::new(RuleMatcher::Priority, EffectResolver::Priority);

        let subjects = ["user:1", "user:mallory", "auditor", "user:22", ""];
        let resources = ["document:1", "document:", "report:secret", "report:q3", "invoice:9"];
        let actions = ["read", "write", "list"];
        for subject in subjects {
            for resource in resources {
                for action in actions {
                    let expected = evaluator.evaluate(
                        &policy,
                        &Subject::new(subject),
                        Some(&Resource::from_id(resource)),
                        &Action::new(action),
                        &Context::new(),
                    );
                    let generated = match Generated::evaluate(subject, resource, action) {
                        GeneratedEffect::Allow => Effect::Allow,
                        GeneratedEffect::Deny => Effect::Deny,
                    };
                    assert_eq!(generated, expected, "{subject} {resource} {action}");
                }
            }
        }
    }

    #[test]
    fn test_module_name_sanitized() {
        assert_eq!(module_name("acme-policies.v2", "fallback"), "acme_policies_v2");
        assert_eq!(module_name("2024", "fallback"), "_2024");
        assert_eq!(module_name("", "fallback"), "fallback");
        assert_eq!(module_name("type", "fallback"), "r#type");
        assert_eq!(module_name("gen", "fallback"), "r#gen");
        assert_eq!(module_name("yield", "fallback"), "r#yield");
        assert_eq!(module_name("crate", "fallback"), "crate_");
        assert_eq!(module_name("self", "fallback"), "self_");
        assert_eq!(module_name("super", "fallback"), "super_");
        assert_eq!(module_name("Self", "fallback"), "Self_");
        assert_eq!(module_name("-", "fallback"), "fallback");

        let compiler = PolicyCompiler::from_config(&CompilerConfig {
            default_namespace: "tenant_policies".into(),
        });
        assert!(compiler.compile_default(&example_policy()).contains("pub mod tenant_policies {"));
    }
}
