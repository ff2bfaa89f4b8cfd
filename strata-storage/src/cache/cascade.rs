//! Cascade delete engine.
//!
//! The in-memory half of every cascade runs under one write lock and always
//! runs. The persistent half is delegated to the bulk hooks on
//! [`PersistentTier`], which have per-entity defaults.
//!
//! A cascade reaches every descendant the cache knows of: entries in the
//! containment indices, flat entries carrying the parent id, and nested
//! containers. Descendants that only exist in the persistent tier from an
//! earlier process are reachable only by an overridden bulk hook.

use std::collections::BTreeMap;

use strata_core::{
    CacheResult, Channel, EntityKind, Guild, IntoSnowflake, Member, Message, Role, Snowflake,
};

use super::kind::TieredEntity;
use super::memory::MemoryTier;
use super::stats::Counter;
use super::store::EntityCache;
use super::traits::PersistentTier;

/// Everything a cascade removed, leaves first and root last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadePlan {
    root_kind: EntityKind,
    root_id: Snowflake,
    entries: Vec<(EntityKind, Snowflake)>,
}

impl CascadePlan {
    pub fn new(root_kind: EntityKind, root_id: Snowflake) -> Self {
        Self {
            root_kind,
            root_id,
            entries: Vec::new(),
        }
    }

    fn push_all(&mut self, kind: EntityKind, ids: &[Snowflake]) {
        self.entries.extend(ids.iter().map(|id| (kind, *id)));
    }

    fn push_root(&mut self) {
        self.entries.push((self.root_kind, self.root_id));
    }

    pub fn root(&self) -> (EntityKind, Snowflake) {
        (self.root_kind, self.root_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = (EntityKind, Snowflake)> + '_ {
        self.entries.iter().copied()
    }

    /// Ids of one kind, in removal order.
    pub fn ids(&self, kind: EntityKind) -> Vec<Snowflake> {
        self.entries()
            .filter(|(k, _)| *k == kind)
            .map(|(_, id)| id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the plan with only the entries whose kind passes `keep`.
    pub fn retain_kinds(&self, keep: impl Fn(EntityKind) -> bool) -> CascadePlan {
        CascadePlan {
            root_kind: self.root_kind,
            root_id: self.root_id,
            entries: self.entries().filter(|(kind, _)| keep(*kind)).collect(),
        }
    }
}

/// A role deletion as seen by the persistent tier.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleRemoval {
    pub role_id: Snowflake,
    pub guild_id: Option<Snowflake>,
    /// The in-memory copy of the role, if there was one.
    pub removed: Option<Role>,
    /// Whether roles are written to the persistent tier.
    pub role_persisted: bool,
    /// Members whose `roles` list lost the role, after the edit.
    pub edited_members: Vec<Member>,
}

/// Result of a guild or channel cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct Removal<T> {
    /// The in-memory copy of the root, if there was one.
    pub removed: Option<T>,
    pub plan: CascadePlan,
}

impl MemoryTier {
    /// Remove a guild with its channels, their messages, its roles and its
    /// members, and clear its unavailability mark.
    pub fn remove_guild_tree(&mut self, guild_id: Snowflake) -> (Option<Guild>, CascadePlan) {
        let channels = self.owned_by::<Channel>(guild_id);
        let mut messages: Vec<Snowflake> = channels
            .iter()
            .flat_map(|channel| self.owned_by::<Message>(*channel))
            .collect();
        messages.extend(
            self.messages
                .flat
                .values()
                .filter(|m| m.guild_id == Some(guild_id))
                .map(|m| m.id),
        );
        messages.sort_unstable();
        messages.dedup();
        let roles = self.owned_by::<Role>(guild_id);
        let members = self.owned_by::<Member>(guild_id);

        // Children before their containers so nested lookups still resolve.
        for id in &messages {
            self.remove::<Message>(*id);
        }
        for id in &channels {
            self.remove::<Channel>(*id);
        }
        for id in &roles {
            self.remove::<Role>(*id);
        }
        for id in &members {
            self.remove::<Member>(*id);
        }
        let guild = self.remove::<Guild>(guild_id);
        self.unavailable.remove(&guild_id);

        let mut plan = CascadePlan::new(EntityKind::Guild, guild_id);
        plan.push_all(EntityKind::Message, &messages);
        plan.push_all(EntityKind::Channel, &channels);
        plan.push_all(EntityKind::Role, &roles);
        plan.push_all(EntityKind::Member, &members);
        plan.push_root();
        (guild, plan)
    }

    /// Remove a channel and its messages.
    pub fn remove_channel_tree(&mut self, channel_id: Snowflake) -> (Option<Channel>, CascadePlan) {
        let messages = self.owned_by::<Message>(channel_id);
        for id in &messages {
            self.remove::<Message>(*id);
        }
        let channel = self.remove::<Channel>(channel_id);

        let mut plan = CascadePlan::new(EntityKind::Channel, channel_id);
        plan.push_all(EntityKind::Message, &messages);
        plan.push_root();
        (channel, plan)
    }

    /// Remove a role and strip it from every member that references it.
    ///
    /// Nested members are searched in the role's guild when it is known,
    /// otherwise in every guild. Returns the role, its guild id and the
    /// edited members.
    pub fn strip_role(
        &mut self,
        role_id: Snowflake,
    ) -> (Option<Role>, Option<Snowflake>, Vec<Member>) {
        let known_guild = self.roles.index.parent_of(role_id);
        let role = self.remove::<Role>(role_id);
        let guild_id = known_guild.or_else(|| role.as_ref().and_then(|r| r.guild_id));

        let mut edited = Vec::new();
        for member in self.members.flat.values_mut() {
            if member.strip_role(role_id) {
                edited.push(member.clone());
            }
        }

        let guilds: Vec<&mut Guild> = match guild_id {
            Some(id) => self.guilds.flat.get_mut(&id).into_iter().collect(),
            None => self.guilds.flat.values_mut().collect(),
        };
        for guild in guilds {
            for member in guild.members.values_mut() {
                if member.strip_role(role_id) {
                    edited.push(member.clone());
                }
            }
        }

        (role, guild_id, edited)
    }

    /// Remove a batch of messages, resolving each owning channel once.
    ///
    /// Returns how many in-memory copies were removed.
    pub fn remove_message_batch(&mut self, ids: &[Snowflake]) -> usize {
        let mut by_channel: BTreeMap<Option<Snowflake>, Vec<Snowflake>> = BTreeMap::new();
        for id in ids {
            let channel = self
                .messages
                .index
                .parent_of(*id)
                .or_else(|| self.messages.flat.get(id).and_then(|m| m.channel_id));
            by_channel.entry(channel).or_default().push(*id);
        }

        let mut removed = 0;
        for (channel, ids) in by_channel {
            if let Some(container) = channel.and_then(|c| Message::container_mut(self, c)) {
                for id in &ids {
                    if container.remove(id).is_some() {
                        removed += 1;
                    }
                }
            }
            for id in &ids {
                self.messages.index.remove(*id);
                if self.messages.flat.remove(id).is_some() {
                    removed += 1;
                }
            }
        }
        removed
    }
}

impl<P: PersistentTier> EntityCache<P> {
    fn record_plan(&self, plan: &CascadePlan) {
        for (kind, _) in plan.entries() {
            self.record(kind, Counter::Removal);
        }
    }

    fn persisted_part(&self, plan: &CascadePlan) -> CascadePlan {
        plan.retain_kinds(|kind| self.options().kind(kind).outside_memory)
    }

    /// Delete a guild and everything it owns from every tier.
    pub async fn remove_guild(&self, id: impl IntoSnowflake) -> CacheResult<Removal<Guild>> {
        let id = id.into_snowflake()?;
        let (removed, plan) = self.memory_mut()?.remove_guild_tree(id);
        self.record_plan(&plan);

        if let Some(tier) = self.persistent() {
            let persisted = self.persisted_part(&plan);
            if !persisted.is_empty() {
                tier.remove_guild(&persisted).await?;
            }
        }

        tracing::debug!(guild_id = id, entries = plan.len(), "Guild cascade complete");
        Ok(Removal { removed, plan })
    }

    /// Delete a channel and its messages from every tier.
    pub async fn remove_channel(&self, id: impl IntoSnowflake) -> CacheResult<Removal<Channel>> {
        let id = id.into_snowflake()?;
        let (removed, plan) = self.memory_mut()?.remove_channel_tree(id);
        self.record_plan(&plan);

        if let Some(tier) = self.persistent() {
            let persisted = self.persisted_part(&plan);
            if !persisted.is_empty() {
                tier.remove_channel(&persisted).await?;
            }
        }

        tracing::debug!(channel_id = id, entries = plan.len(), "Channel cascade complete");
        Ok(Removal { removed, plan })
    }

    /// Delete a role and strip it from every member that references it.
    pub async fn remove_role(&self, id: impl IntoSnowflake) -> CacheResult<RoleRemoval> {
        let id = id.into_snowflake()?;
        let (removed, guild_id, edited_members) = self.memory_mut()?.strip_role(id);
        self.record(EntityKind::Role, Counter::Removal);

        let removal = RoleRemoval {
            role_id: id,
            guild_id,
            removed,
            role_persisted: self.options().roles.outside_memory,
            edited_members,
        };

        if let Some(tier) = self.persistent() {
            let members_persisted = self.options().members.outside_memory;
            let outgoing = RoleRemoval {
                edited_members: if members_persisted {
                    removal.edited_members.clone()
                } else {
                    Vec::new()
                },
                ..removal.clone()
            };
            if outgoing.role_persisted || !outgoing.edited_members.is_empty() {
                tier.remove_role(&outgoing).await?;
            }
        }

        tracing::debug!(
            role_id = id,
            edited = removal.edited_members.len(),
            "Role removed"
        );
        Ok(removal)
    }

    /// Delete a batch of messages from every tier.
    ///
    /// Returns how many in-memory copies were removed.
    pub async fn remove_messages<I>(&self, ids: I) -> CacheResult<usize>
    where
        I: IntoIterator,
        I::Item: IntoSnowflake,
    {
        let mut ids = ids
            .into_iter()
            .map(IntoSnowflake::into_snowflake)
            .collect::<CacheResult<Vec<_>>>()?;
        ids.sort_unstable();
        ids.dedup();

        let removed = self.memory_mut()?.remove_message_batch(&ids);
        self.record_n(EntityKind::Message, Counter::Removal, ids.len() as u64);

        if let Some(tier) = self.tier_for(EntityKind::Message) {
            tier.remove_messages(&ids).await?;
        }
        Ok(removed)
    }
}
