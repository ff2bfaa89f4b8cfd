//! Per-kind wiring between the entity types and the memory tier.

use std::collections::HashMap;
use std::sync::Arc;

use strata_core::{
    CachedEntity, Channel, EntityKind, Guild, Member, Message, Role, Snowflake, User,
};

use super::admission::{AdmissionPolicy, AdmissionTable};
use super::memory::{KindStore, MemoryTier};

/// An entity kind the tiered store can hold.
///
/// Implemented for the six cached kinds only. Nestable kinds override
/// [`container`](TieredEntity::container) to name the map inside their
/// parent; kinds that own containers override
/// [`adopt_children`](TieredEntity::adopt_children).
pub trait TieredEntity: CachedEntity {
    fn slot(memory: &MemoryTier) -> &KindStore<Self>;

    fn slot_mut(memory: &mut MemoryTier) -> &mut KindStore<Self>;

    /// The map inside the in-memory parent that holds nested entities.
    fn container(_memory: &MemoryTier, _parent: Snowflake) -> Option<&HashMap<Snowflake, Self>> {
        None
    }

    fn container_mut(
        _memory: &mut MemoryTier,
        _parent: Snowflake,
    ) -> Option<&mut HashMap<Snowflake, Self>> {
        None
    }

    /// Take over the nested containers of the copy being replaced, or start
    /// empty on a fresh insert.
    fn adopt_children(&mut self, _previous: Option<&mut Self>) {}

    fn admission(table: &AdmissionTable) -> Option<&Arc<dyn AdmissionPolicy<Self>>>;

    fn admission_mut(table: &mut AdmissionTable) -> &mut Option<Arc<dyn AdmissionPolicy<Self>>>;

    fn wrap(self) -> CachedValue;
}

/// A cached entity of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Guild(Guild),
    Channel(Channel),
    Role(Role),
    Member(Member),
    Message(Message),
    User(User),
}

impl CachedValue {
    pub fn kind(&self) -> EntityKind {
        match self {
            CachedValue::Guild(_) => EntityKind::Guild,
            CachedValue::Channel(_) => EntityKind::Channel,
            CachedValue::Role(_) => EntityKind::Role,
            CachedValue::Member(_) => EntityKind::Member,
            CachedValue::Message(_) => EntityKind::Message,
            CachedValue::User(_) => EntityKind::User,
        }
    }

    pub fn id(&self) -> Snowflake {
        match self {
            CachedValue::Guild(e) => e.id,
            CachedValue::Channel(e) => e.id,
            CachedValue::Role(e) => e.id,
            CachedValue::Member(e) => e.id,
            CachedValue::Message(e) => e.id,
            CachedValue::User(e) => e.id,
        }
    }
}

impl TieredEntity for Guild {
    fn slot(memory: &MemoryTier) -> &KindStore<Self> {
        &memory.guilds
    }

    fn slot_mut(memory: &mut MemoryTier) -> &mut KindStore<Self> {
        &mut memory.guilds
    }

    fn adopt_children(&mut self, previous: Option<&mut Self>) {
        match previous {
            Some(previous) => {
                self.channels = std::mem::take(&mut previous.channels);
                self.roles = std::mem::take(&mut previous.roles);
                self.members = std::mem::take(&mut previous.members);
            }
            None => {
                self.channels.clear();
                self.roles.clear();
                self.members.clear();
            }
        }
    }

    fn admission(table: &AdmissionTable) -> Option<&Arc<dyn AdmissionPolicy<Self>>> {
        table.guilds.as_ref()
    }

    fn admission_mut(table: &mut AdmissionTable) -> &mut Option<Arc<dyn AdmissionPolicy<Self>>> {
        &mut table.guilds
    }

    fn wrap(self) -> CachedValue {
        CachedValue::Guild(self)
    }
}

impl TieredEntity for Channel {
    fn slot(memory: &MemoryTier) -> &KindStore<Self> {
        &memory.channels
    }

    fn slot_mut(memory: &mut MemoryTier) -> &mut KindStore<Self> {
        &mut memory.channels
    }

    fn container(memory: &MemoryTier, parent: Snowflake) -> Option<&HashMap<Snowflake, Self>> {
        memory.guilds.flat.get(&parent).map(|g| &g.channels)
    }

    fn container_mut(
        memory: &mut MemoryTier,
        parent: Snowflake,
    ) -> Option<&mut HashMap<Snowflake, Self>> {
        memory.guilds.flat.get_mut(&parent).map(|g| &mut g.channels)
    }

    fn adopt_children(&mut self, previous: Option<&mut Self>) {
        match previous {
            Some(previous) => self.messages = std::mem::take(&mut previous.messages),
            None => self.messages.clear(),
        }
    }

    fn admission(table: &AdmissionTable) -> Option<&Arc<dyn AdmissionPolicy<Self>>> {
        table.channels.as_ref()
    }

    fn admission_mut(table: &mut AdmissionTable) -> &mut Option<Arc<dyn AdmissionPolicy<Self>>> {
        &mut table.channels
    }

    fn wrap(self) -> CachedValue {
        CachedValue::Channel(self)
    }
}

impl TieredEntity for Role {
    fn slot(memory: &MemoryTier) -> &KindStore<Self> {
        &memory.roles
    }

    fn slot_mut(memory: &mut MemoryTier) -> &mut KindStore<Self> {
        &mut memory.roles
    }

    fn container(memory: &MemoryTier, parent: Snowflake) -> Option<&HashMap<Snowflake, Self>> {
        memory.guilds.flat.get(&parent).map(|g| &g.roles)
    }

    fn container_mut(
        memory: &mut MemoryTier,
        parent: Snowflake,
    ) -> Option<&mut HashMap<Snowflake, Self>> {
        memory.guilds.flat.get_mut(&parent).map(|g| &mut g.roles)
    }

    fn admission(table: &AdmissionTable) -> Option<&Arc<dyn AdmissionPolicy<Self>>> {
        table.roles.as_ref()
    }

    fn admission_mut(table: &mut AdmissionTable) -> &mut Option<Arc<dyn AdmissionPolicy<Self>>> {
        &mut table.roles
    }

    fn wrap(self) -> CachedValue {
        CachedValue::Role(self)
    }
}

impl TieredEntity for Member {
    fn slot(memory: &MemoryTier) -> &KindStore<Self> {
        &memory.members
    }

    fn slot_mut(memory: &mut MemoryTier) -> &mut KindStore<Self> {
        &mut memory.members
    }

    fn container(memory: &MemoryTier, parent: Snowflake) -> Option<&HashMap<Snowflake, Self>> {
        memory.guilds.flat.get(&parent).map(|g| &g.members)
    }

    fn container_mut(
        memory: &mut MemoryTier,
        parent: Snowflake,
    ) -> Option<&mut HashMap<Snowflake, Self>> {
        memory.guilds.flat.get_mut(&parent).map(|g| &mut g.members)
    }

    fn admission(table: &AdmissionTable) -> Option<&Arc<dyn AdmissionPolicy<Self>>> {
        table.members.as_ref()
    }

    fn admission_mut(table: &mut AdmissionTable) -> &mut Option<Arc<dyn AdmissionPolicy<Self>>> {
        &mut table.members
    }

    fn wrap(self) -> CachedValue {
        CachedValue::Member(self)
    }
}

impl TieredEntity for Message {
    fn slot(memory: &MemoryTier) -> &KindStore<Self> {
        &memory.messages
    }

    fn slot_mut(memory: &mut MemoryTier) -> &mut KindStore<Self> {
        &mut memory.messages
    }

    // The owning channel may itself be nested inside its guild.
    fn container(memory: &MemoryTier, parent: Snowflake) -> Option<&HashMap<Snowflake, Self>> {
        memory.get::<Channel>(parent).map(|c| &c.messages)
    }

    fn container_mut(
        memory: &mut MemoryTier,
        parent: Snowflake,
    ) -> Option<&mut HashMap<Snowflake, Self>> {
        memory.get_mut::<Channel>(parent).map(|c| &mut c.messages)
    }

    fn admission(table: &AdmissionTable) -> Option<&Arc<dyn AdmissionPolicy<Self>>> {
        table.messages.as_ref()
    }

    fn admission_mut(table: &mut AdmissionTable) -> &mut Option<Arc<dyn AdmissionPolicy<Self>>> {
        &mut table.messages
    }

    fn wrap(self) -> CachedValue {
        CachedValue::Message(self)
    }
}

impl TieredEntity for User {
    fn slot(memory: &MemoryTier) -> &KindStore<Self> {
        &memory.users
    }

    fn slot_mut(memory: &mut MemoryTier) -> &mut KindStore<Self> {
        &mut memory.users
    }

    fn admission(table: &AdmissionTable) -> Option<&Arc<dyn AdmissionPolicy<Self>>> {
        table.users.as_ref()
    }

    fn admission_mut(table: &mut AdmissionTable) -> &mut Option<Arc<dyn AdmissionPolicy<Self>>> {
        &mut table.users
    }

    fn wrap(self) -> CachedValue {
        CachedValue::User(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guild_adopts_previous_children() {
        let mut previous = Guild::new(1);
        previous.roles.insert(2, Role::new(2, 1));

        let mut next = Guild::new(1);
        next.adopt_children(Some(&mut previous));
        assert!(next.roles.contains_key(&2));
        assert!(previous.roles.is_empty());
    }

    #[test]
    fn test_fresh_guild_starts_empty() {
        let mut guild = Guild::new(1);
        guild.channels.insert(5, Channel::new(5, 1));
        guild.adopt_children(None);
        assert!(guild.channels.is_empty());
    }

    #[test]
    fn test_cached_value_identity() {
        let value = Message::new(7, 3).wrap();
        assert_eq!(value.kind(), EntityKind::Message);
        assert_eq!(value.id(), 7);
    }
}
