use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Delegation lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelegationConfig {
    /// Longest delegation chain walked during cycle detection.
    /// Grants whose chain exceeds this are rejected.
    #[serde(default = "default_max_chain_depth")]
    pub max_chain_depth: usize,

    /// Days an expired or revoked delegation is kept before cleanup removes it.
    /// 0 removes terminal rows on the next cleanup.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// TTL for cached active-delegation lists, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            max_chain_depth: default_max_chain_depth(),
            retention_days: default_retention_days(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl DelegationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_chain_depth == 0 {
            return Err(ConfigError::Validation(
                "delegation.max_chain_depth must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_ttl_secs)
    }
}

fn default_max_chain_depth() -> usize {
    16
}

fn default_retention_days() -> u32 {
    30
}

fn default_cache_ttl_secs() -> u64 {
    300 // 5 minutes
}
