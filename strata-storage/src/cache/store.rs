//! Tiered entity store.
//!
//! [`EntityCache`] owns the memory tier, the optional persistent tier, the
//! admission table and the precomputed field projections, and exposes
//! `get`/`set`/`delete` for every cached kind. Cascades, the consistency
//! maintainer and the event dispatcher extend it from their own modules.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use strata_core::{
    CacheOptions, CacheResult, EntityKind, FieldProjection, IntoSnowflake, StorageError,
};

use super::admission::{AdmissionPolicy, AdmissionTable};
use super::kind::TieredEntity;
use super::memory::{MemoryTier, MemoryWrite};
use super::stats::{CacheStats, Counter, StatsRecorder};
use super::traits::{NoPersistentTier, PersistentTier};

/// Result of [`EntityCache::set`].
#[derive(Debug, Clone, PartialEq)]
pub enum SetOutcome<T> {
    /// The admission filter refused the entity. No tier changed.
    Rejected,
    Stored {
        memory: MemoryWrite,
        /// Whether the persistent tier was written.
        persisted: bool,
        /// The in-memory copy that was replaced.
        previous: Option<T>,
    },
}

impl<T> SetOutcome<T> {
    pub fn is_rejected(&self) -> bool {
        matches!(self, SetOutcome::Rejected)
    }

    pub fn memory(&self) -> Option<MemoryWrite> {
        match self {
            SetOutcome::Rejected => None,
            SetOutcome::Stored { memory, .. } => Some(*memory),
        }
    }

    pub fn into_previous(self) -> Option<T> {
        match self {
            SetOutcome::Rejected => None,
            SetOutcome::Stored { previous, .. } => previous,
        }
    }
}

/// Builder for [`EntityCache`].
pub struct EntityCacheBuilder<P: PersistentTier = NoPersistentTier> {
    options: CacheOptions,
    persistent: Option<Arc<P>>,
    admission: AdmissionTable,
}

impl EntityCacheBuilder<NoPersistentTier> {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            options,
            persistent: None,
            admission: AdmissionTable::new(),
        }
    }
}

impl<P: PersistentTier> EntityCacheBuilder<P> {
    /// Attach the persistent tier used by kinds with `outside_memory`.
    pub fn persistent<Q: PersistentTier>(self, tier: Arc<Q>) -> EntityCacheBuilder<Q> {
        EntityCacheBuilder {
            options: self.options,
            persistent: Some(tier),
            admission: self.admission,
        }
    }

    /// Install the admission policy for kind `T`.
    pub fn admission<T: TieredEntity>(mut self, policy: Arc<dyn AdmissionPolicy<T>>) -> Self {
        self.admission.set(policy);
        self
    }

    /// Validate the options and build the cache.
    pub fn build(self) -> CacheResult<EntityCache<P>> {
        self.options.validate()?;

        if self.persistent.is_none() {
            for kind in EntityKind::ALL {
                if self.options.kind(kind).outside_memory {
                    tracing::warn!(
                        kind = %kind,
                        "outside_memory is set but no persistent tier is attached, writes will only reach memory"
                    );
                }
            }
        }

        let projections =
            EntityKind::ALL.map(|kind| FieldProjection::from_options(self.options.kind(kind)));

        tracing::debug!(
            nested = ?EntityKind::ALL.iter().filter(|k| self.options.is_nested(**k)).collect::<Vec<_>>(),
            admission = ?self.admission,
            "Entity cache built"
        );

        Ok(EntityCache {
            memory: RwLock::new(MemoryTier::new(&self.options)),
            options: self.options,
            projections,
            persistent: self.persistent,
            admission: self.admission,
            stats: StatsRecorder::default(),
        })
    }
}

/// Tiered cache for the six entity kinds.
///
/// Memory is always consulted first; the persistent tier is read only on a
/// memory miss. Memory is updated before the persistent write starts, and the
/// lock guarding it is never held across an `.await`.
///
/// # Example
///
/// ```ignore
/// let cache = EntityCache::builder(CacheOptions::all_in_memory())
///     .persistent(Arc::new(tier))
///     .admission::<User>(admit_fn(|u: &User| u.bot != Some(true)))
///     .build()?;
///
/// cache.set(guild).await?;
/// let channel = cache.get::<Channel>("41771983423143937").await?;
/// ```
pub struct EntityCache<P: PersistentTier = NoPersistentTier> {
    options: CacheOptions,
    projections: [FieldProjection; 6],
    memory: RwLock<MemoryTier>,
    persistent: Option<Arc<P>>,
    admission: AdmissionTable,
    stats: StatsRecorder,
}

impl EntityCache<NoPersistentTier> {
    /// Memory-only cache with no admission policies.
    pub fn new(options: CacheOptions) -> CacheResult<Self> {
        EntityCacheBuilder::new(options).build()
    }

    pub fn builder(options: CacheOptions) -> EntityCacheBuilder<NoPersistentTier> {
        EntityCacheBuilder::new(options)
    }
}

impl<P: PersistentTier> EntityCache<P> {
    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    pub fn persistent(&self) -> Option<&Arc<P>> {
        self.persistent.as_ref()
    }

    /// Read access to the memory tier.
    ///
    /// Do not hold the guard across an `.await`.
    pub fn memory(&self) -> CacheResult<RwLockReadGuard<'_, MemoryTier>> {
        self.memory
            .read()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    pub(crate) fn memory_mut(&self) -> CacheResult<RwLockWriteGuard<'_, MemoryTier>> {
        self.memory
            .write()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    /// The persistent tier, if `kind` is written to it.
    pub(crate) fn tier_for(&self, kind: EntityKind) -> Option<&Arc<P>> {
        if self.options.kind(kind).outside_memory {
            self.persistent.as_ref()
        } else {
            None
        }
    }

    pub(crate) fn record(&self, kind: EntityKind, counter: Counter) {
        self.stats.record(kind, counter);
    }

    pub(crate) fn record_n(&self, kind: EntityKind, counter: Counter, n: u64) {
        self.stats.add(kind, counter, n);
    }

    pub fn stats(&self, kind: EntityKind) -> CacheStats {
        self.stats.snapshot(kind)
    }

    pub fn projection(&self, kind: EntityKind) -> &FieldProjection {
        &self.projections[kind.index()]
    }

    /// Memory-only lookup.
    pub fn peek<T: TieredEntity>(&self, id: impl IntoSnowflake) -> CacheResult<Option<T>> {
        let id = id.into_snowflake()?;
        Ok(self.memory()?.get::<T>(id).cloned())
    }

    /// Look up an entity, memory first, then the persistent tier.
    ///
    /// A persistent hit is promoted into memory when the kind is kept there
    /// and no copy was stored while the read was in flight; otherwise the
    /// in-memory copy wins and is returned.
    pub async fn get<T: TieredEntity>(&self, id: impl IntoSnowflake) -> CacheResult<Option<T>> {
        let id = id.into_snowflake()?;

        let cached = self.memory()?.get::<T>(id).cloned();
        if let Some(entity) = cached {
            self.record(T::KIND, Counter::MemoryHit);
            return Ok(Some(entity));
        }

        let Some(tier) = self.tier_for(T::KIND) else {
            self.record(T::KIND, Counter::Miss);
            return Ok(None);
        };
        let Some(entity) = tier.read::<T>(id).await? else {
            self.record(T::KIND, Counter::Miss);
            return Ok(None);
        };
        self.record(T::KIND, Counter::PersistentHit);

        if self.options.kind(T::KIND).in_memory {
            let mut memory = self.memory_mut()?;
            // A write that landed during the read is newer than the row.
            if let Some(current) = memory.get::<T>(id) {
                return Ok(Some(current.clone()));
            }
            let parent = entity.parent_id();
            let (write, _) = memory.insert(entity.clone(), parent);
            if let MemoryWrite::Skipped(reason) = write {
                tracing::debug!(kind = %T::KIND, id, ?reason, "Persistent hit not promoted");
            }
        }

        Ok(Some(entity))
    }

    /// Admit, project and store an entity in every tier its kind uses.
    ///
    /// A skipped nested placement is logged and reported in the outcome; the
    /// persistent write still happens. A persistent failure is returned
    /// after memory has been updated.
    ///
    /// Memory is updated before the persistent write starts, and the future
    /// resolves once that write has finished. For fire-and-forget
    /// persistence, spawn the future: the in-memory copy is visible while
    /// the persistent write is still pending.
    pub async fn set<T: TieredEntity>(&self, entity: T) -> CacheResult<SetOutcome<T>> {
        if !self.admission.admits(&entity).await {
            self.record(T::KIND, Counter::Rejected);
            tracing::trace!(kind = %T::KIND, id = entity.id(), "Entity not admitted");
            return Ok(SetOutcome::Rejected);
        }

        let id = entity.id();
        let parent = entity.parent_id();
        let entity = self.projection(T::KIND).project(entity);
        let tier = self.tier_for(T::KIND);
        let outgoing = tier.map(|_| entity.clone());

        let (memory, previous) = self.memory_mut()?.insert(entity, parent);
        if let MemoryWrite::Skipped(reason) = memory {
            self.record(T::KIND, Counter::SkippedPlacement);
            tracing::warn!(
                kind = %T::KIND,
                id,
                ?reason,
                "Nested placement skipped, entity not cached in memory"
            );
        }

        let persisted = match (tier, outgoing) {
            (Some(tier), Some(entity)) => {
                tier.write(&entity).await?;
                true
            }
            _ => false,
        };

        self.record(T::KIND, Counter::Write);
        Ok(SetOutcome::Stored {
            memory,
            persisted,
            previous,
        })
    }

    /// Remove one entity from every tier. Owned entities are not touched.
    ///
    /// Returns the removed in-memory copy.
    pub async fn delete<T: TieredEntity>(&self, id: impl IntoSnowflake) -> CacheResult<Option<T>> {
        let id = id.into_snowflake()?;
        let removed = self.memory_mut()?.remove::<T>(id);
        if let Some(tier) = self.tier_for(T::KIND) {
            tier.remove(T::KIND, id).await?;
        }
        self.record(T::KIND, Counter::Removal);
        Ok(removed)
    }
}

impl<P: PersistentTier> std::fmt::Debug for EntityCache<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityCache")
            .field("options", &self.options)
            .field("persistent", &self.persistent.is_some())
            .field("admission", &self.admission)
            .finish_non_exhaustive()
    }
}
