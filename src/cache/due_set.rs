//! Per-owner cache of due cards.
//!
//! Entries are versioned JSON snapshots keyed by owner. Each invalidated
//! owner also has an in-process generation: `invalidate` gives it a fresh one
//! before deleting the backend entry, and a snapshot is only served when it
//! was populated under the current generation. A reader that raced an
//! invalidation therefore cannot resurrect a pre-review due list, and a failed
//! backend delete still retires the old snapshot.
//!
//! Generations are drawn from one process-wide counter and expire after the
//! snapshot ttl. Once expired, an owner reads generation 0 again; snapshots
//! older than the ttl and populations that took longer than the ttl are
//! rejected, so an expired generation cannot let an old snapshot back in.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Utc};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CacheBackend, CacheResult};
use crate::flashcards::Card;
use crate::store::{self, CardStore};

/// Bump when the snapshot layout changes; older snapshots are discarded
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

const KEY_PREFIX: &str = "flashcards:due:";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DueSetSnapshot {
    schema_version: u32,
    owner_id: Uuid,
    generation: u64,
    /// The day the due list was computed for
    as_of: NaiveDate,
    cached_at: DateTime<Utc>,
    cards: Vec<Card>,
}

/// Where a due list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueSource {
    Cache,
    /// Cache miss; read from the store and cached
    Store,
    /// Cache unavailable; read from the store without caching
    StoreFallback,
}

#[derive(Debug, Clone)]
pub struct DueSet {
    pub cards: Vec<Card>,
    pub source: DueSource,
}

/// Read-through cache of due cards per owner
pub struct DueSetCache {
    backend: Arc<dyn CacheBackend>,
    store: Arc<dyn CardStore>,
    ttl: Duration,
    capacity: usize,
    generations: Cache<Uuid, u64>,
    epoch: AtomicU64,
}

impl DueSetCache {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        store: Arc<dyn CardStore>,
        ttl: Duration,
        capacity: usize,
    ) -> Self {
        Self {
            backend,
            store,
            ttl,
            capacity,
            generations: Cache::builder().time_to_live(ttl).build(),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    fn key(owner_id: Uuid) -> String {
        format!("{}{}", KEY_PREFIX, owner_id)
    }

    async fn generation(&self, owner_id: Uuid) -> u64 {
        self.generations.get(&owner_id).await.unwrap_or(0)
    }

    async fn bump_generation(&self, owner_id: Uuid) {
        let next = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.generations.insert(owner_id, next).await;
    }

    /// Due cards of `owner_id` on `today`, at most the configured capacity
    pub async fn get_due(&self, owner_id: Uuid, today: NaiveDate) -> store::Result<DueSet> {
        let started = Instant::now();
        let generation = self.generation(owner_id).await;

        match self.lookup(owner_id, today, generation).await {
            CacheResult::Hit(cards) => {
                log::debug!("Due set cache hit for owner {}", owner_id);
                Ok(DueSet {
                    cards,
                    source: DueSource::Cache,
                })
            }
            CacheResult::Miss => {
                let cards = self.store.query_due(owner_id, today, self.capacity).await?;
                self.populate(owner_id, today, generation, started, &cards).await;
                Ok(DueSet {
                    cards,
                    source: DueSource::Store,
                })
            }
            CacheResult::Unavailable(reason) => {
                log::warn!(
                    "Due set cache unavailable for owner {}, reading store directly: {}",
                    owner_id,
                    reason
                );
                let cards = self.store.query_due(owner_id, today, self.capacity).await?;
                Ok(DueSet {
                    cards,
                    source: DueSource::StoreFallback,
                })
            }
        }
    }

    /// Retire the cached due list of `owner_id`.
    ///
    /// Never fails: once this returns, no later read serves the old snapshot,
    /// whether or not the backend delete went through.
    pub async fn invalidate(&self, owner_id: Uuid) {
        self.bump_generation(owner_id).await;
        if let Err(e) = self.backend.delete(&Self::key(owner_id)).await {
            log::warn!("Failed to delete due set for owner {}: {}", owner_id, e);
        }
    }

    async fn lookup(
        &self,
        owner_id: Uuid,
        today: NaiveDate,
        generation: u64,
    ) -> CacheResult<Vec<Card>> {
        let raw = match self.backend.get(&Self::key(owner_id)).await {
            CacheResult::Hit(raw) => raw,
            CacheResult::Miss => return CacheResult::Miss,
            CacheResult::Unavailable(reason) => return CacheResult::Unavailable(reason),
        };

        let snapshot: DueSetSnapshot = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Discarding unreadable due set for owner {}: {}", owner_id, e);
                self.discard(owner_id).await;
                return CacheResult::Miss;
            }
        };

        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            log::debug!(
                "Discarding due set with schema {} (expected {})",
                snapshot.schema_version,
                SNAPSHOT_SCHEMA_VERSION
            );
            self.discard(owner_id).await;
            return CacheResult::Miss;
        }

        if snapshot.owner_id != owner_id
            || snapshot.generation != generation
            || snapshot.as_of != today
            || self.outlived_ttl(snapshot.cached_at)
        {
            return CacheResult::Miss;
        }

        CacheResult::Hit(snapshot.cards)
    }

    async fn populate(
        &self,
        owner_id: Uuid,
        today: NaiveDate,
        generation: u64,
        started: Instant,
        cards: &[Card],
    ) {
        // An invalidation landed while we were reading the store, or may have
        // landed and expired already
        if started.elapsed() >= self.ttl || self.generation(owner_id).await != generation {
            log::debug!("Not caching due set for owner {} read under an old generation", owner_id);
            return;
        }

        let snapshot = DueSetSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            owner_id,
            generation,
            as_of: today,
            cached_at: Utc::now(),
            cards: cards.to_vec(),
        };

        let raw = match serde_json::to_string(&snapshot) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Failed to encode due set for owner {}: {}", owner_id, e);
                return;
            }
        };

        if let Err(e) = self.backend.set(&Self::key(owner_id), raw, self.ttl).await {
            log::warn!("Failed to cache due set for owner {}: {}", owner_id, e);
        }
    }

    fn outlived_ttl(&self, cached_at: DateTime<Utc>) -> bool {
        match (Utc::now() - cached_at).to_std() {
            Ok(age) => age >= self.ttl,
            // Stamped in the future by a skewed clock
            Err(_) => false,
        }
    }

    async fn discard(&self, owner_id: Uuid) {
        if let Err(e) = self.backend.delete(&Self::key(owner_id)).await {
            log::debug!("Failed to discard due set for owner {}: {}", owner_id, e);
        }
    }
}
