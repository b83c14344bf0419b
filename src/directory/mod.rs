//! Store directory cache.
//!
//! Maps external store identifiers to platform users. The mapping is rebuilt from a
//! full paginated scan of `GET /users` and held as an immutable [`DirectorySnapshot`].
//! A refresh swaps the snapshot pointer; readers never see a half-built map.

mod clock;

pub use clock::*;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::config::DirectoryConfig;
use crate::errors::AppResult;
use crate::models::{DirectoryUser, StoreUser, VerifyOutcome};
use crate::upstream::{Pager, Upstream};

/// Store identifier to store user mapping, as of `fetched_at`.
#[derive(Debug, Clone)]
pub struct DirectorySnapshot {
    stores: HashMap<String, StoreUser>,
    fetched_at: DateTime<Utc>,
}

impl DirectorySnapshot {
    pub fn new(stores: HashMap<String, StoreUser>, fetched_at: DateTime<Utc>) -> Self {
        Self { stores, fetched_at }
    }

    pub fn get(&self, store_id: &str) -> Option<&StoreUser> {
        self.stores.get(store_id)
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Partition `store_ids` into known stores and unknown identifiers.
    ///
    /// Identifiers are trimmed and deduplicated; first occurrence wins the position.
    pub fn verify(&self, store_ids: &[String]) -> VerifyOutcome {
        let mut seen = HashSet::new();
        let mut outcome = VerifyOutcome::default();

        for id in store_ids.iter().map(|s| s.trim()) {
            if !seen.insert(id) {
                continue;
            }
            match self.get(id) {
                Some(user) => outcome.found_users.push(user.clone()),
                None => outcome.not_found_ids.push(id.to_string()),
            }
        }

        outcome
    }

    /// Resolve identifiers to store users, silently skipping unknown ones.
    pub fn resolve(&self, store_ids: &[String]) -> Vec<StoreUser> {
        self.verify(store_ids).found_users
    }
}

/// Owns the current snapshot and refreshes it lazily on read.
pub struct DirectoryCache {
    upstream: Arc<dyn Upstream>,
    clock: Arc<dyn Clock>,
    config: DirectoryConfig,
    page_size: usize,
    snapshot: RwLock<Option<Arc<DirectorySnapshot>>>,
}

impl DirectoryCache {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        clock: Arc<dyn Clock>,
        config: DirectoryConfig,
        page_size: usize,
    ) -> Self {
        Self {
            upstream,
            clock,
            config,
            page_size,
            snapshot: RwLock::new(None),
        }
    }

    /// Current snapshot, refreshed first if missing or older than the TTL.
    pub async fn get(&self) -> AppResult<Arc<DirectorySnapshot>> {
        self.get_directory(false).await
    }

    /// Rebuild the snapshot regardless of its age.
    pub async fn force_refresh(&self) -> AppResult<Arc<DirectorySnapshot>> {
        self.get_directory(true).await
    }

    pub async fn get_directory(&self, force_refresh: bool) -> AppResult<Arc<DirectorySnapshot>> {
        if !force_refresh {
            if let Some(current) = self.snapshot.read().await.as_ref() {
                if self.is_fresh(current) {
                    return Ok(Arc::clone(current));
                }
            }
        }

        tracing::info!(force_refresh, "Refreshing store directory");

        match self.scan().await {
            Ok(stores) => {
                let snapshot = Arc::new(DirectorySnapshot::new(stores, self.clock.now()));
                *self.snapshot.write().await = Some(Arc::clone(&snapshot));
                tracing::info!(stores = snapshot.len(), "Store directory refreshed");
                Ok(snapshot)
            }
            Err(err) => match self.snapshot.read().await.as_ref() {
                Some(previous) => {
                    tracing::warn!(
                        error = %err,
                        fetched_at = %previous.fetched_at(),
                        "Directory refresh failed, keeping previous snapshot"
                    );
                    Ok(Arc::clone(previous))
                }
                None => Err(err),
            },
        }
    }

    /// Snapshot currently held, without refreshing.
    pub async fn current(&self) -> Option<Arc<DirectorySnapshot>> {
        self.snapshot.read().await.clone()
    }

    fn is_fresh(&self, snapshot: &DirectorySnapshot) -> bool {
        match (self.clock.now() - snapshot.fetched_at()).to_std() {
            Ok(age) => age < self.config.ttl,
            // Clock moved backwards; the snapshot cannot be older than the TTL.
            Err(_) => true,
        }
    }

    async fn scan(&self) -> AppResult<HashMap<String, StoreUser>> {
        let mut pager: Pager<DirectoryUser> =
            Pager::new(self.upstream.as_ref(), "/users", self.page_size);
        let mut stores = HashMap::new();

        while let Some(page) = pager.next_page().await? {
            for user in page {
                if let Some(store) = user.to_store_user(&self.config.store_attribute) {
                    stores.insert(store.csv_id.clone(), store);
                }
            }

            if self.should_pace(&pager) {
                tokio::time::sleep(self.config.pace_delay).await;
            }
        }

        Ok(stores)
    }

    fn should_pace(&self, pager: &Pager<'_, DirectoryUser>) -> bool {
        let every = self.config.pace_every;
        !pager.is_finished()
            && every > 0
            && self.config.pace_delay > Duration::ZERO
            && pager.offset() % every == 0
    }
}
