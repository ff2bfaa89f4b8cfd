//! Persistent tier trait.
//!
//! The cache talks to its out-of-process tier through this trait. Storage
//! layout is implementation-defined; each kind maps to its own table
//! ([`EntityKind::table`]). Nested containers are never written: a child is
//! always stored under its own kind.

use async_trait::async_trait;
use strata_core::{CacheResult, CachedEntity, EntityKind, Snowflake};

use super::cascade::{CascadePlan, RoleRemoval};

/// Out-of-process entity storage.
///
/// Implementations must be thread-safe. The four bulk hooks have per-entity
/// default implementations; override them to remove a whole subtree in one
/// round trip. The in-memory half of a cascade always runs before the hook
/// is called.
#[async_trait]
pub trait PersistentTier: Send + Sync {
    /// Read one entity.
    async fn read<T: CachedEntity>(&self, id: Snowflake) -> CacheResult<Option<T>>;

    /// Insert or replace one entity.
    async fn write<T: CachedEntity>(&self, entity: &T) -> CacheResult<()>;

    /// Remove one entity. Removing an absent entity is not an error.
    async fn remove(&self, kind: EntityKind, id: Snowflake) -> CacheResult<()>;

    /// Remove a guild and everything it owns.
    ///
    /// `plan` only carries entries whose kind is persisted.
    async fn remove_guild(&self, plan: &CascadePlan) -> CacheResult<()> {
        for (kind, id) in plan.entries() {
            self.remove(kind, id).await?;
        }
        Ok(())
    }

    /// Remove a channel and its messages.
    async fn remove_channel(&self, plan: &CascadePlan) -> CacheResult<()> {
        for (kind, id) in plan.entries() {
            self.remove(kind, id).await?;
        }
        Ok(())
    }

    /// Remove a role and write back every member it was stripped from.
    ///
    /// `edited_members` only holds members the cache had in memory. Rows
    /// that exist only in this tier still list the role after the default;
    /// override to strip it from them too.
    async fn remove_role(&self, removal: &RoleRemoval) -> CacheResult<()> {
        if removal.role_persisted {
            self.remove(EntityKind::Role, removal.role_id).await?;
        }
        for member in &removal.edited_members {
            self.write(member).await?;
        }
        Ok(())
    }

    /// Remove a batch of messages.
    async fn remove_messages(&self, ids: &[Snowflake]) -> CacheResult<()> {
        for id in ids {
            self.remove(EntityKind::Message, *id).await?;
        }
        Ok(())
    }
}

/// Stand-in for caches that keep everything in memory.
///
/// Reads miss and writes are discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPersistentTier;

#[async_trait]
impl PersistentTier for NoPersistentTier {
    async fn read<T: CachedEntity>(&self, _id: Snowflake) -> CacheResult<Option<T>> {
        Ok(None)
    }

    async fn write<T: CachedEntity>(&self, _entity: &T) -> CacheResult<()> {
        Ok(())
    }

    async fn remove(&self, _kind: EntityKind, _id: Snowflake) -> CacheResult<()> {
        Ok(())
    }
}
