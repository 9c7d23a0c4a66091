//! Configuration for the policy engine.
//!
//! The engine is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [evaluation]
//! matcher = "rbac"
//! resolver = "deny_override"
//!
//! [delegation]
//! max_chain_depth = 8
//! retention_days = ${DELEGATION_RETENTION_DAYS}
//!
//! [cache]
//! type = "memory"
//! max_entries = 10000
//! ```

mod cache;
mod compiler;
mod delegation;
mod evaluation;
mod observability;
mod retention;

use std::path::Path;

pub use cache::*;
pub use compiler::*;
pub use delegation::*;
pub use evaluation::*;
pub use observability::*;
pub use retention::*;
use serde::{Deserialize, Serialize};

/// Root configuration for the engine.
///
/// All sections are optional with sensible defaults, so an empty file is a
/// valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Matcher, resolver and audit settings for the evaluator.
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    #[serde(default)]
    pub delegation: DelegationConfig,

    #[serde(default)]
    pub compiler: CompilerConfig,

    /// Cache in front of delegation lookups.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Background cleanup of expired and revoked delegations.
    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing variables cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: EngineConfig = toml::from_str(&expanded)?;
        config.validate()?;

        tracing::debug!(
            matcher = config.evaluation.matcher.as_str(),
            resolver = config.evaluation.resolver.as_str(),
            cache = config.cache.kind(),
            retention = config.retention.enabled,
            "Loaded engine configuration"
        );

        Ok(config)
    }

    /// Validate the configuration for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.delegation.validate()?;
        self.compiler.validate()?;
        self.cache.validate()?;
        self.retention.validate()?;

        if self.retention.enabled && self.delegation.retention_days == 0 {
            tracing::warn!(
                "Retention is enabled with delegation.retention_days = 0. \
                 Revoked and expired delegations are removed on the next run."
            );
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Variables after a `#` on the same line are left alone.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::Validation(e.to_string()))?;
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            if comment_pos.is_some_and(|pos| whole.start() >= pos) {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);
            let value = std::env::var(name.as_str())
                .map_err(|_| ConfigError::EnvVarNotFound(name.as_str().to_string()))?;
            result.push_str(&value);
            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{EffectResolver, RuleMatcher};

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_str("").unwrap();
        assert_eq!(config.evaluation.matcher, RuleMatcher::Acl);
        assert_eq!(config.evaluation.resolver, EffectResolver::Standard);
        assert!(config.evaluation.audit.log_denied);
        assert!(!config.evaluation.audit.log_allowed);
        assert_eq!(config.delegation.max_chain_depth, 16);
        assert!(config.cache.is_none());
        assert!(!config.retention.enabled);
        assert_eq!(config.observability.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_full_config() {
        let config = EngineConfig::from_str(
            r#"
            [evaluation]
            matcher = "restful"
            resolver = "priority"

            [evaluation.audit]
            log_allowed = true

            [delegation]
            max_chain_depth = 4
            retention_days = 7
            cache_ttl_secs = 60

            [compiler]
            default_namespace = "acme_policies"

            [cache]
            type = "memory"
            max_entries = 500

            [retention]
            enabled = true
            interval_hours = 6

            [observability.logging]
            level = "debug"
            format = "json"
            filter = "castellan=trace"
        "#,
        )
        .unwrap();

        assert_eq!(config.evaluation.matcher, RuleMatcher::Restful);
        assert_eq!(config.evaluation.resolver, EffectResolver::Priority);
        assert!(config.evaluation.audit.log_allowed);
        assert_eq!(config.delegation.max_chain_depth, 4);
        assert_eq!(config.delegation.retention_days, 7);
        assert_eq!(config.compiler.default_namespace, "acme_policies");
        match &config.cache {
            CacheConfig::Memory(memory) => {
                assert_eq!(memory.max_entries, 500);
                assert_eq!(memory.eviction_batch_size, 100);
            }
            other => panic!("expected memory cache, got {other:?}"),
        }
        assert_eq!(config.retention.interval_hours, 6);
        assert_eq!(config.observability.logging.format, LogFormat::Json);
        assert_eq!(
            config.observability.logging.filter.as_deref(),
            Some("castellan=trace")
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = EngineConfig::from_str(
            r#"
            [delegation]
            max_depth = 3
        "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_matcher_rejected() {
        let result = EngineConfig::from_str(
            r#"
            [evaluation]
            matcher = "xacml"
        "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_errors() {
        let zero_depth = EngineConfig::from_str(
            r#"
            [delegation]
            max_chain_depth = 0
        "#,
        );
        assert!(matches!(zero_depth, Err(ConfigError::Validation(_))));

        let bad_namespace = EngineConfig::from_str(
            r#"
            [compiler]
            default_namespace = "not a module"
        "#,
        );
        assert!(matches!(bad_namespace, Err(ConfigError::Validation(_))));

        let zero_interval = EngineConfig::from_str(
            r#"
            [retention]
            enabled = true
            interval_hours = 0
        "#,
        );
        assert!(matches!(zero_interval, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = EngineConfig::from_file("/nonexistent/castellan.toml");
        assert!(matches!(result, Err(ConfigError::Io(_, _))));
    }

    #[test]
    fn test_env_var_expansion() {
        temp_env::with_var("CASTELLAN_TEST_DEPTH", Some("5"), || {
            let config = EngineConfig::from_str(
                r#"
                [delegation]
                max_chain_depth = ${CASTELLAN_TEST_DEPTH}
            "#,
            )
            .unwrap();
            assert_eq!(config.delegation.max_chain_depth, 5);
        });
    }

    #[test]
    fn test_missing_env_var() {
        temp_env::with_var_unset("CASTELLAN_TEST_MISSING", || {
            let result = expand_env_vars("value = \"${CASTELLAN_TEST_MISSING}\"");
            assert!(
                matches!(result, Err(ConfigError::EnvVarNotFound(name)) if name == "CASTELLAN_TEST_MISSING")
            );
        });
    }

    #[test]
    fn test_env_var_in_comment_ignored() {
        let result = expand_env_vars("# namespace = \"${NONEXISTENT_VAR}\"").unwrap();
        assert_eq!(result, "# namespace = \"${NONEXISTENT_VAR}\"");

        let result = expand_env_vars("key = \"value\" # ${NONEXISTENT_VAR}").unwrap();
        assert_eq!(result, "key = \"value\" # ${NONEXISTENT_VAR}");
    }

    #[test]
    fn test_multiline_expansion_keeps_layout() {
        temp_env::with_var("CASTELLAN_TEST_NS", Some("tenant_a"), || {
            let input = "[compiler]\n# ${IGNORED}\ndefault_namespace = \"${CASTELLAN_TEST_NS}\"\n";
            let result = expand_env_vars(input).unwrap();
            assert_eq!(
                result,
                "[compiler]\n# ${IGNORED}\ndefault_namespace = \"tenant_a\"\n"
            );
        });
    }
}
