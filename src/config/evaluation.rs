use serde::{Deserialize, Serialize};

use crate::authz::{AuditConfig, EffectResolver, RuleMatcher};

/// Evaluator configuration.
///
/// ```toml
/// [evaluation]
/// matcher = "abac"
/// resolver = "priority"
///
/// [evaluation.audit]
/// log_allowed = false
/// log_denied = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationConfig {
    /// Rule matching strategy: acl, rbac, abac, restful or priority.
    #[serde(default)]
    pub matcher: RuleMatcher,

    /// Effect resolution strategy: standard, deny_override or priority.
    #[serde(default)]
    pub resolver: EffectResolver,

    /// Decision audit logging.
    #[serde(default)]
    pub audit: AuditConfig,
}
