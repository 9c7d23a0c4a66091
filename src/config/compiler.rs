use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Policy compiler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Module name used for generated source when the caller gives none.
    #[serde(default = "default_namespace")]
    pub default_namespace: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_namespace: default_namespace(),
        }
    }
}

impl CompilerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ns = &self.default_namespace;
        let valid = ns
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && ns.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(ConfigError::Validation(format!(
                "compiler.default_namespace '{}' is not a valid module name",
                ns
            )));
        }
        Ok(())
    }
}

fn default_namespace() -> String {
    "compiled_policies".to_string()
}
