//! Counters for authorization decisions and delegation lifecycle events.
//!
//! Every function is a no-op unless the `prometheus` feature is enabled.

#[cfg(feature = "prometheus")]
use metrics::counter;

use crate::models::Effect;

/// Record an evaluated authorization decision.
pub fn record_decision(effect: Effect, matcher: &str) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "castellan_decisions_total",
            "effect" => effect.as_str(),
            "matcher" => matcher.to_string()
        )
        .increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (effect, matcher);
    }
}

/// Record a granted delegation.
pub fn record_delegation_granted(transitive: bool) {
    #[cfg(feature = "prometheus")]
    {
        let kind = if transitive { "transitive" } else { "direct" };
        counter!("castellan_delegations_granted_total", "kind" => kind).increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = transitive;
    }
}

/// Record a rejected grant.
///
/// # Arguments
/// * `reason` - "validation", "cycle", "chain_too_deep", "invalid_expiry" or "invalid_input"
pub fn record_delegation_rejected(reason: &'static str) {
    #[cfg(feature = "prometheus")]
    {
        counter!("castellan_delegations_rejected_total", "reason" => reason).increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = reason;
    }
}

/// Record a revoked delegation.
pub fn record_delegation_revoked() {
    #[cfg(feature = "prometheus")]
    {
        counter!("castellan_delegations_revoked_total").increment(1);
    }
}

/// Record rows removed by a cleanup run.
pub fn record_cleanup(removed: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!("castellan_delegations_cleaned_total").increment(removed);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = removed;
    }
}

/// Record a delegation cache lookup.
///
/// # Arguments
/// * `result` - "hit", "miss" or "error"
pub fn record_cache_lookup(result: &'static str) {
    #[cfg(feature = "prometheus")]
    {
        counter!("castellan_delegation_cache_total", "result" => result).increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = result;
    }
}
