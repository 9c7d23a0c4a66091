use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::{DelegationError, DelegationValidator};
use crate::{
    cache::{Cache, CacheExt, CacheKeys},
    config::DelegationConfig,
    db::{DbError, DelegationRepo},
    models::{Delegation, DelegationState, GrantDelegation},
    observability::metrics,
};

/// Orchestrates the delegation lifecycle over a [`DelegationRepo`].
///
/// Active-delegation lookups are read-through cached when a cache is
/// attached. Cached lists are re-filtered for activity on every read, and
/// grant and revoke invalidate the delegate's entry.
pub struct DelegationManager {
    validator: DelegationValidator,
    store: Arc<dyn DelegationRepo>,
    cache: Option<Arc<dyn Cache>>,
    config: DelegationConfig,
}

impl DelegationManager {
    pub fn new(validator: DelegationValidator, store: Arc<dyn DelegationRepo>) -> Self {
        Self {
            validator,
            store,
            cache: None,
            config: DelegationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DelegationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Grant a delegation after validating it.
    ///
    /// Nothing is stored unless every check passes.
    ///
    /// # Errors
    /// - [`DelegationError::InvalidInput`] for empty or oversized ids, or a
    ///   delegator delegating to itself
    /// - [`DelegationError::InvalidExpiry`] if `expires_at` is not in the future
    /// - [`DelegationError::CycleDetected`] if a transitive grant would close a cycle
    /// - [`DelegationError::ChainTooDeep`] if the chain behind the delegator
    ///   is longer than `max_chain_depth`
    /// - [`DelegationError::ValidationFailed`] if the delegator lacks part of the scope
    pub async fn grant(&self, request: GrantDelegation) -> Result<Delegation, DelegationError> {
        match self.try_grant(request).await {
            Ok(delegation) => Ok(delegation),
            Err(e) => {
                metrics::record_delegation_rejected(e.kind());
                tracing::info!(error = %e, kind = e.kind(), "Delegation grant rejected");
                Err(e)
            }
        }
    }

    async fn try_grant(&self, request: GrantDelegation) -> Result<Delegation, DelegationError> {
        request.validate()?;
        if request.delegator_id == request.delegate_id {
            return Err(DelegationError::InvalidInput(
                "delegator and delegate must differ".to_string(),
            ));
        }
        if let Some(expires_at) = request.expires_at
            && expires_at <= Utc::now()
        {
            return Err(DelegationError::InvalidExpiry(expires_at));
        }

        if request.transitive {
            self.detect_cycle(&request.delegator_id, &request.delegate_id)
                .await?;
        }

        self.validator
            .validate(&request.delegator_id, &request.scope)
            .await?;

        let mut delegation = Delegation::new(
            request.delegator_id,
            request.delegate_id,
            request.scope,
        )
        .transitive(request.transitive)
        .with_metadata(request.metadata);
        delegation.expires_at = request.expires_at;

        let delegation = self.store.create(delegation).await?;
        self.invalidate(&delegation.delegate_id).await;

        metrics::record_delegation_granted(delegation.is_transitive);
        tracing::info!(
            delegation_id = %delegation.id,
            delegator = %delegation.delegator_id,
            delegate = %delegation.delegate_id,
            transitive = delegation.is_transitive,
            expires_at = ?delegation.expires_at,
            "Delegation granted"
        );

        Ok(delegation)
    }

    /// Revoke a delegation. Unknown ids and already revoked delegations are
    /// a no-op.
    ///
    /// Returns the delegation as stored after the call, if it exists.
    pub async fn revoke(&self, id: Uuid) -> Result<Option<Delegation>, DelegationError> {
        let Some(existing) = self.store.find_by_id(id).await? else {
            tracing::debug!(delegation_id = %id, "Revoke of unknown delegation ignored");
            return Ok(None);
        };
        if existing.status == DelegationState::Revoked {
            return Ok(Some(existing));
        }

        let revoked = match self.store.revoke(id).await {
            Ok(revoked) => revoked,
            // Removed between lookup and revoke
            Err(DbError::NotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        self.invalidate(&revoked.delegate_id).await;

        metrics::record_delegation_revoked();
        tracing::info!(
            delegation_id = %id,
            delegator = %revoked.delegator_id,
            delegate = %revoked.delegate_id,
            "Delegation revoked"
        );

        Ok(Some(revoked))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Delegation>, DelegationError> {
        Ok(self.store.find_by_id(id).await?)
    }

    /// Active delegations held by `delegate_id`, oldest first.
    pub async fn find_active_for_delegate(
        &self,
        delegate_id: &str,
    ) -> Result<Vec<Delegation>, DelegationError> {
        let Some(cache) = &self.cache else {
            return Ok(self.store.find_active_for_delegate(delegate_id).await?);
        };

        let key = CacheKeys::delegations_for(delegate_id);
        match cache.get_json::<Vec<Delegation>>(&key).await {
            Ok(Some(cached)) => {
                metrics::record_cache_lookup("hit");
                // Entries may have expired since they were cached
                let now = Utc::now();
                return Ok(cached
                    .into_iter()
                    .filter(|d| d.is_active_at(now))
                    .collect());
            }
            Ok(None) => metrics::record_cache_lookup("miss"),
            Err(e) => {
                metrics::record_cache_lookup("error");
                tracing::warn!(delegate = %delegate_id, error = %e, "Delegation cache read failed");
            }
        }

        let active = self.store.find_active_for_delegate(delegate_id).await?;
        if let Err(e) = cache.set_json(&key, &active, self.config.cache_ttl()).await {
            tracing::warn!(delegate = %delegate_id, error = %e, "Delegation cache write failed");
        }
        Ok(active)
    }

    /// Whether `delegate_id` holds `action` on `resource` through any active
    /// delegation.
    pub async fn has_delegated_permission(
        &self,
        delegate_id: &str,
        resource: &str,
        action: &str,
    ) -> Result<bool, DelegationError> {
        let active = self.find_active_for_delegate(delegate_id).await?;
        Ok(active.iter().any(|d| d.scope.matches(resource, action)))
    }

    /// Remove expired and revoked delegations past the store's retention
    /// window.
    pub async fn cleanup(&self) -> Result<u64, DelegationError> {
        let removed = self.store.cleanup().await?;
        metrics::record_cleanup(removed);
        if removed > 0 {
            tracing::info!(removed, "Cleaned up delegations");
        } else {
            tracing::debug!("No delegations to clean up");
        }
        Ok(removed)
    }

    /// Walk the chain backward from `delegator` (who delegated to it, who
    /// delegated to them, ...) and fail if `delegate` is on it.
    ///
    /// Every node is visited at most once, so the walk ends even if the
    /// stored graph already contains a cycle.
    async fn detect_cycle(&self, delegator: &str, delegate: &str) -> Result<(), DelegationError> {
        let max_depth = self.config.max_chain_depth;
        let cycle = || DelegationError::CycleDetected {
            delegator: delegator.to_string(),
            delegate: delegate.to_string(),
        };

        let mut visited: HashSet<String> = HashSet::from([delegator.to_string()]);
        let mut frontier = vec![delegator.to_string()];
        let mut depth = 0;

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for node in &frontier {
                for upstream in self.store.find_active_for_delegate(node).await? {
                    if upstream.delegator_id == delegate {
                        tracing::debug!(delegator, delegate, depth, "Delegation cycle detected");
                        return Err(cycle());
                    }
                    if visited.insert(upstream.delegator_id.clone()) {
                        next.push(upstream.delegator_id);
                    }
                }
            }

            if !next.is_empty() {
                depth += 1;
                if depth > max_depth {
                    return Err(DelegationError::ChainTooDeep { max_depth });
                }
            }
            frontier = next;
        }

        Ok(())
    }

    async fn invalidate(&self, delegate_id: &str) {
        if let Some(cache) = &self.cache
            && let Err(e) = cache.delete(&CacheKeys::delegations_for(delegate_id)).await
        {
            tracing::warn!(delegate = %delegate_id, error = %e, "Delegation cache invalidation failed");
        }
    }
}
