//! In-memory tier.
//!
//! All in-memory state (six per-kind stores, their containment indices and
//! the guild availability set) lives in one [`MemoryTier`]. The cache keeps
//! it behind a single lock; every method here is synchronous and completes
//! under that lock.

use std::collections::{HashMap, HashSet};

use strata_core::{
    CacheOptions, Channel, EntityKind, Guild, Member, Message, Role, Snowflake, User,
};

use super::index::ContainmentIndex;
use super::kind::TieredEntity;

/// Flat map and containment index for one kind.
#[derive(Debug)]
pub struct KindStore<T> {
    pub(crate) flat: HashMap<Snowflake, T>,
    pub(crate) index: ContainmentIndex,
    enabled: bool,
    nested: bool,
}

impl<T> KindStore<T> {
    fn new(kind: EntityKind, options: &CacheOptions) -> Self {
        Self {
            flat: HashMap::new(),
            index: ContainmentIndex::new(),
            enabled: options.kind(kind).in_memory,
            nested: options.is_nested(kind),
        }
    }

    /// Whether this kind is kept in memory at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether in-memory entities live inside their parent.
    pub fn is_nested(&self) -> bool {
        self.nested
    }

    pub fn index(&self) -> &ContainmentIndex {
        &self.index
    }

    /// Entities held in the flat map (not counting nested ones).
    pub fn flat_len(&self) -> usize {
        self.flat.len()
    }
}

/// Where an in-memory write landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Flat,
    Nested { parent: Snowflake },
}

/// Why a nested placement could not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementSkip {
    /// No parent id on the entity and none recorded in the index.
    MissingParentId,
    /// The parent is not in memory.
    ParentNotCached { parent: Snowflake },
}

/// Outcome of the in-memory half of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryWrite {
    /// The kind is not kept in memory.
    Disabled,
    Stored(Placement),
    Skipped(PlacementSkip),
}

impl MemoryWrite {
    pub fn is_stored(&self) -> bool {
        matches!(self, MemoryWrite::Stored(_))
    }
}

#[derive(Debug)]
pub struct MemoryTier {
    pub(crate) guilds: KindStore<Guild>,
    pub(crate) channels: KindStore<Channel>,
    pub(crate) roles: KindStore<Role>,
    pub(crate) members: KindStore<Member>,
    pub(crate) messages: KindStore<Message>,
    pub(crate) users: KindStore<User>,
    pub(crate) unavailable: HashSet<Snowflake>,
}

impl MemoryTier {
    pub fn new(options: &CacheOptions) -> Self {
        Self {
            guilds: KindStore::new(EntityKind::Guild, options),
            channels: KindStore::new(EntityKind::Channel, options),
            roles: KindStore::new(EntityKind::Role, options),
            members: KindStore::new(EntityKind::Member, options),
            messages: KindStore::new(EntityKind::Message, options),
            users: KindStore::new(EntityKind::User, options),
            unavailable: HashSet::new(),
        }
    }

    pub fn store<T: TieredEntity>(&self) -> &KindStore<T> {
        T::slot(self)
    }

    pub fn get<T: TieredEntity>(&self, id: Snowflake) -> Option<&T> {
        let store = T::slot(self);
        if !store.enabled {
            return None;
        }
        if store.nested {
            let parent = store.index.parent_of(id)?;
            T::container(self, parent)?.get(&id)
        } else {
            store.flat.get(&id)
        }
    }

    pub fn get_mut<T: TieredEntity>(&mut self, id: Snowflake) -> Option<&mut T> {
        let store = T::slot(self);
        if !store.enabled {
            return None;
        }
        if store.nested {
            let parent = store.index.parent_of(id)?;
            T::container_mut(self, parent)?.get_mut(&id)
        } else {
            T::slot_mut(self).flat.get_mut(&id)
        }
    }

    pub fn contains<T: TieredEntity>(&self, id: Snowflake) -> bool {
        self.get::<T>(id).is_some()
    }

    /// Parent recorded for `id` in the kind's containment index.
    pub fn parent_of<T: TieredEntity>(&self, id: Snowflake) -> Option<Snowflake> {
        T::slot(self).index.parent_of(id)
    }

    /// Store `entity` according to the kind's placement.
    ///
    /// `parent` is the parent id observed on the entity before projection.
    /// It is recorded in the index whenever present, even when the kind is
    /// not kept in memory. Returns the copy that was replaced, if any.
    pub fn insert<T: TieredEntity>(
        &mut self,
        mut entity: T,
        parent: Option<Snowflake>,
    ) -> (MemoryWrite, Option<T>) {
        let id = entity.id();
        let store = T::slot_mut(self);
        let recorded = match parent {
            Some(parent) => store.index.set_parent(id, parent),
            None => store.index.parent_of(id),
        };

        if !store.enabled {
            return (MemoryWrite::Disabled, None);
        }

        if !store.nested {
            let mut previous = store.flat.remove(&id);
            entity.adopt_children(previous.as_mut());
            store.flat.insert(id, entity);
            return (MemoryWrite::Stored(Placement::Flat), previous);
        }

        let Some(parent) = parent.or(recorded) else {
            return (MemoryWrite::Skipped(PlacementSkip::MissingParentId), None);
        };

        // Moved to another parent: the old copy must not linger.
        let moved = match recorded {
            Some(old) if old != parent => {
                T::container_mut(self, old).and_then(|container| container.remove(&id))
            }
            _ => None,
        };

        match T::container_mut(self, parent) {
            Some(container) => {
                let mut previous = container.remove(&id).or(moved);
                entity.adopt_children(previous.as_mut());
                container.insert(id, entity);
                (MemoryWrite::Stored(Placement::Nested { parent }), previous)
            }
            None => (
                MemoryWrite::Skipped(PlacementSkip::ParentNotCached { parent }),
                moved,
            ),
        }
    }

    /// Remove `id` from the flat map, its parent's container and the index.
    pub fn remove<T: TieredEntity>(&mut self, id: Snowflake) -> Option<T> {
        let store = T::slot_mut(self);
        let parent = store.index.remove(id);
        let flat = store.flat.remove(&id);
        let nested = parent
            .and_then(|parent| T::container_mut(self, parent))
            .and_then(|container| container.remove(&id));
        nested.or(flat)
    }

    /// Ids of every in-memory entity of kind `T`, sorted.
    pub fn ids<T: TieredEntity>(&self) -> Vec<Snowflake> {
        let store = T::slot(self);
        let mut ids: Vec<Snowflake> = store.flat.keys().copied().collect();
        if store.nested {
            ids.extend(
                store
                    .index
                    .iter()
                    .filter(|(child, parent)| {
                        T::container(self, *parent).is_some_and(|c| c.contains_key(child))
                    })
                    .map(|(child, _)| child),
            );
        }
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Number of in-memory entities of kind `T`, flat and nested.
    pub fn len<T: TieredEntity>(&self) -> usize {
        self.ids::<T>().len()
    }

    /// Ids of entities of kind `T` known to belong to `parent`: recorded in
    /// the index, held flat with that parent id, or held in its container.
    pub fn owned_by<T: TieredEntity>(&self, parent: Snowflake) -> Vec<Snowflake> {
        let store = T::slot(self);
        let mut ids: Vec<Snowflake> = store.index.children_of(parent).to_vec();
        ids.extend(
            store
                .flat
                .values()
                .filter(|entity| entity.parent_id() == Some(parent))
                .map(|entity| entity.id()),
        );
        if let Some(container) = T::container(self, parent) {
            ids.extend(container.keys().copied());
        }
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
