//! Strata Storage - Tiered Entity Cache
//!
//! The memory tier, containment indices, tiered store, cascade delete engine,
//! consistency maintainer and event dispatcher, plus an in-process mock of the
//! persistent tier for tests.

pub mod cache;

pub use cache::{
    admit_fn, AdmissionPolicy, AdmissionTable, CacheEvent, CacheStats, CachedValue, CascadePlan,
    ContainmentIndex, EntityCache, EntityCacheBuilder, FnAdmission, KindStore, MembershipDelta,
    MemoryTier, MemoryWrite, NoPersistentTier, PersistentTier, Placement, PlacementSkip, Removal,
    RoleRemoval, SetOutcome, TieredEntity,
};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value;
use strata_core::{CacheResult, CachedEntity, EntityKind, Snowflake, StorageError};

// ============================================================================
// MOCK PERSISTENT TIER
// ============================================================================

type Tables = HashMap<EntityKind, HashMap<Snowflake, Value>>;

/// Operation counts recorded by [`MockPersistentTier`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockOps {
    pub reads: u64,
    pub writes: u64,
    pub removes: u64,
    /// Calls to the bulk guild and message hooks.
    pub bulk_removes: u64,
}

#[derive(Debug, Default)]
struct OpCounters {
    reads: AtomicU64,
    writes: AtomicU64,
    removes: AtomicU64,
    bulk_removes: AtomicU64,
}

/// In-memory persistent tier for testing.
///
/// Rows are stored as JSON, one table per kind, the way a key-value backend
/// would hold them. Guild and message-batch removal are overridden with
/// single-lock bulk versions; channel and role removal use the default hooks.
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockPersistentTier {
    tables: Arc<RwLock<Tables>>,
    ops: Arc<OpCounters>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MockPersistentTier {
    /// Create a new mock tier.
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> CacheResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    fn tables_mut(&self) -> CacheResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    fn failure(operation: &'static str, kind: EntityKind) -> StorageError {
        StorageError::Persistent {
            operation,
            kind,
            reason: "injected failure".to_string(),
        }
    }

    /// Make every subsequent read fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Operation counts so far.
    pub fn ops(&self) -> MockOps {
        MockOps {
            reads: self.ops.reads.load(Ordering::SeqCst),
            writes: self.ops.writes.load(Ordering::SeqCst),
            removes: self.ops.removes.load(Ordering::SeqCst),
            bulk_removes: self.ops.bulk_removes.load(Ordering::SeqCst),
        }
    }

    /// Store a row directly, bypassing the cache and the counters.
    pub fn seed<T: CachedEntity>(&self, entity: &T) -> CacheResult<()> {
        let row = encode(entity)?;
        self.tables_mut()?
            .entry(T::KIND)
            .or_default()
            .insert(entity.id(), row);
        Ok(())
    }

    /// Read a row directly, bypassing the counters.
    pub fn peek<T: CachedEntity>(&self, id: Snowflake) -> CacheResult<Option<T>> {
        let row = self
            .tables()?
            .get(&T::KIND)
            .and_then(|table| table.get(&id))
            .cloned();
        row.map(|row| decode(row, id)).transpose()
    }

    pub fn contains(&self, kind: EntityKind, id: Snowflake) -> bool {
        self.tables()
            .map(|tables| tables.get(&kind).is_some_and(|table| table.contains_key(&id)))
            .unwrap_or(false)
    }

    /// Number of rows stored for a kind.
    pub fn len(&self, kind: EntityKind) -> usize {
        self.tables()
            .map(|tables| tables.get(&kind).map_or(0, HashMap::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.tables()
            .map(|tables| tables.values().all(HashMap::is_empty))
            .unwrap_or(true)
    }

    /// Clear all stored rows.
    pub fn clear(&self) -> CacheResult<()> {
        self.tables_mut()?.clear();
        Ok(())
    }
}

fn encode<T: CachedEntity>(entity: &T) -> CacheResult<Value> {
    serde_json::to_value(entity).map_err(|e| {
        StorageError::Serialization {
            kind: T::KIND,
            id: entity.id(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn decode<T: CachedEntity>(row: Value, id: Snowflake) -> CacheResult<T> {
    serde_json::from_value(row).map_err(|e| {
        StorageError::Serialization {
            kind: T::KIND,
            id,
            reason: e.to_string(),
        }
        .into()
    })
}

#[async_trait]
impl PersistentTier for MockPersistentTier {
    async fn read<T: CachedEntity>(&self, id: Snowflake) -> CacheResult<Option<T>> {
        self.ops.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::failure("read", T::KIND).into());
        }
        self.peek(id)
    }

    async fn write<T: CachedEntity>(&self, entity: &T) -> CacheResult<()> {
        self.ops.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::failure("write", T::KIND).into());
        }
        self.seed(entity)
    }

    async fn remove(&self, kind: EntityKind, id: Snowflake) -> CacheResult<()> {
        self.ops.removes.fetch_add(1, Ordering::SeqCst);
        if let Some(table) = self.tables_mut()?.get_mut(&kind) {
            table.remove(&id);
        }
        Ok(())
    }

    async fn remove_guild(&self, plan: &CascadePlan) -> CacheResult<()> {
        self.ops.bulk_removes.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables_mut()?;
        for (kind, id) in plan.entries() {
            if let Some(table) = tables.get_mut(&kind) {
                table.remove(&id);
            }
        }
        Ok(())
    }

    async fn remove_messages(&self, ids: &[Snowflake]) -> CacheResult<()> {
        self.ops.bulk_removes.fetch_add(1, Ordering::SeqCst);
        if let Some(table) = self.tables_mut()?.get_mut(&EntityKind::Message) {
            for id in ids {
                table.remove(id);
            }
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{CacheError, Guild, Message, User};

    #[tokio::test]
    async fn test_mock_write_read_remove() {
        let tier = MockPersistentTier::new();
        let mut user = User::new(1);
        user.username = Some("wumpus".into());

        tier.write(&user).await.unwrap();
        assert_eq!(tier.read::<User>(1).await.unwrap(), Some(user));
        assert_eq!(tier.len(EntityKind::User), 1);

        tier.remove(EntityKind::User, 1).await.unwrap();
        tier.remove(EntityKind::User, 1).await.unwrap();
        assert!(tier.is_empty());
        assert_eq!(
            tier.ops(),
            MockOps {
                reads: 1,
                writes: 1,
                removes: 2,
                bulk_removes: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let tier = MockPersistentTier::new();
        tier.fail_writes(true);
        let err = tier.write(&Guild::new(1)).await.unwrap_err();
        assert!(matches!(
            err,
            CacheError::Storage(StorageError::Persistent {
                operation: "write",
                kind: EntityKind::Guild,
                ..
            })
        ));
        assert!(!tier.contains(EntityKind::Guild, 1));

        tier.fail_writes(false);
        tier.fail_reads(true);
        tier.write(&Guild::new(1)).await.unwrap();
        assert!(tier.read::<Guild>(1).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_bulk_message_removal() {
        let tier = MockPersistentTier::new();
        for id in [1, 2, 3] {
            tier.seed(&Message::new(id, 10)).unwrap();
        }
        tier.remove_messages(&[1, 3]).await.unwrap();
        assert_eq!(tier.len(EntityKind::Message), 1);
        assert_eq!(tier.ops().bulk_removes, 1);
    }

    #[test]
    fn test_mock_rows_use_string_ids() {
        let tier = MockPersistentTier::new();
        tier.seed(&Message::new(80351110224678912, 10)).unwrap();
        let tables = tier.tables().unwrap();
        let row = &tables[&EntityKind::Message][&80351110224678912];
        assert_eq!(row["id"], "80351110224678912");
        assert_eq!(row["channel_id"], "10");
    }
}
