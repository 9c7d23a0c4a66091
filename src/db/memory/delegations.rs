use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::{
    config::DelegationConfig,
    db::{
        error::{DbError, DbResult},
        repos::DelegationRepo,
    },
    models::{Delegation, DelegationState},
};

/// In-memory [`DelegationRepo`] with a delegate index.
pub struct InMemoryDelegationRepo {
    rows: DashMap<Uuid, Delegation>,
    /// delegate_id -> delegation ids, in creation order
    by_delegate: DashMap<String, Vec<Uuid>>,
    /// How long expired/revoked rows are kept before `cleanup` removes them
    retention: Duration,
}

impl Default for InMemoryDelegationRepo {
    fn default() -> Self {
        Self::new(Duration::days(30))
    }
}

impl InMemoryDelegationRepo {
    pub fn new(retention: Duration) -> Self {
        Self {
            rows: DashMap::new(),
            by_delegate: DashMap::new(),
            retention,
        }
    }

    pub fn with_retention_days(days: u32) -> Self {
        Self::new(Duration::days(i64::from(days)))
    }

    /// Repo whose cleanup keeps terminal rows for `delegation.retention_days`.
    pub fn from_config(config: &DelegationConfig) -> Self {
        Self::with_retention_days(config.retention_days)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn unindex(&self, delegation: &Delegation) {
        let mut now_empty = false;
        if let Some(mut ids) = self.by_delegate.get_mut(&delegation.delegate_id) {
            ids.retain(|id| *id != delegation.id);
            now_empty = ids.is_empty();
        }
        if now_empty {
            self.by_delegate
                .remove_if(&delegation.delegate_id, |_, ids| ids.is_empty());
        }
    }
}

#[async_trait]
impl DelegationRepo for InMemoryDelegationRepo {
    async fn create(&self, delegation: Delegation) -> DbResult<Delegation> {
        use dashmap::mapref::entry::Entry;

        match self.rows.entry(delegation.id) {
            Entry::Occupied(_) => {
                return Err(DbError::Conflict(format!(
                    "Delegation {} already exists",
                    delegation.id
                )));
            }
            Entry::Vacant(e) => {
                e.insert(delegation.clone());
            }
        }

        self.by_delegate
            .entry(delegation.delegate_id.clone())
            .or_default()
            .push(delegation.id);

        Ok(delegation)
    }

    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<Delegation>> {
        Ok(self.rows.get(&id).map(|row| row.clone()))
    }

    async fn find_active_for_delegate(&self, delegate_id: &str) -> DbResult<Vec<Delegation>> {
        // Clone the id list so no index guard is held while reading rows
        let ids = match self.by_delegate.get(delegate_id) {
            Some(ids) => ids.clone(),
            None => return Ok(Vec::new()),
        };

        let now = Utc::now();
        let mut active: Vec<Delegation> = ids
            .iter()
            .filter_map(|id| self.rows.get(id).map(|row| row.clone()))
            .filter(|delegation| delegation.is_active_at(now))
            .collect();
        active.sort_by_key(|d| d.created_at);
        Ok(active)
    }

    async fn revoke(&self, id: Uuid) -> DbResult<Delegation> {
        let mut row = self.rows.get_mut(&id).ok_or(DbError::NotFound)?;
        if row.status != DelegationState::Revoked {
            row.status = DelegationState::Revoked;
            row.revoked_at = Some(Utc::now());
        }
        Ok(row.clone())
    }

    async fn cleanup(&self) -> DbResult<u64> {
        let now = Utc::now();
        let cutoff = now - self.retention;

        let stale: Vec<Delegation> = self
            .rows
            .iter()
            .filter(|row| row.terminal_since(now).is_some_and(|since| since <= cutoff))
            .map(|row| row.clone())
            .collect();

        let mut removed = 0;
        for delegation in &stale {
            if self.rows.remove(&delegation.id).is_some() {
                self.unindex(delegation);
                removed += 1;
            }
        }
        Ok(removed)
    }
}
