use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Cache configuration.
///
/// The cache holds active-delegation lists per delegate, the hot path of
/// delegated permission checks.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum CacheConfig {
    /// No caching. Every lookup reads the delegation store.
    #[default]
    None,

    /// In-memory cache. Good for single-node deployments.
    /// Not shared across processes.
    Memory(MemoryCacheConfig),
}

impl CacheConfig {
    pub fn is_none(&self) -> bool {
        matches!(self, CacheConfig::None)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CacheConfig::None => "none",
            CacheConfig::Memory(_) => "memory",
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            CacheConfig::None => Ok(()),
            CacheConfig::Memory(c) => c.validate(),
        }
    }
}

/// In-memory cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryCacheConfig {
    /// Maximum number of entries in the cache.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Number of entries to evict when cache is full.
    /// Eviction removes expired entries first, then uses LRU.
    #[serde(default = "default_eviction_batch_size")]
    pub eviction_batch_size: usize,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            eviction_batch_size: default_eviction_batch_size(),
        }
    }
}

impl MemoryCacheConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 {
            return Err(ConfigError::Validation(
                "Memory cache max_entries must be greater than 0".into(),
            ));
        }
        if self.eviction_batch_size > self.max_entries {
            return Err(ConfigError::Validation(format!(
                "Memory cache eviction_batch_size ({}) cannot exceed max_entries ({})",
                self.eviction_batch_size, self.max_entries
            )));
        }
        Ok(())
    }
}

fn default_max_entries() -> usize {
    10_000
}

fn default_eviction_batch_size() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache_validation() {
        assert!(MemoryCacheConfig::default().validate().is_ok());

        let zero = MemoryCacheConfig {
            max_entries: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let oversized_batch = MemoryCacheConfig {
            max_entries: 10,
            eviction_batch_size: 11,
        };
        assert!(CacheConfig::Memory(oversized_batch).validate().is_err());
    }
}
