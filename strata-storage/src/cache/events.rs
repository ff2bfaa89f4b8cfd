//! Event dispatcher.
//!
//! Maps upstream notifications onto store, cascade and maintainer calls.

use strata_core::{
    CacheResult, Channel, EntityKind, Guild, Member, Message, Role, Snowflake, User,
};

use super::kind::{CachedValue, TieredEntity};
use super::store::EntityCache;
use super::traits::PersistentTier;

/// An upstream change notification, already decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    /// Full guild snapshot. Channels, roles and members inside it are
    /// stored through their own kinds.
    GuildUpsert(Guild),
    /// `unavailable: true` is an outage: the guild is marked unavailable
    /// and kept. Otherwise the guild is deleted with everything it owns.
    GuildDelete {
        guild_id: Snowflake,
        unavailable: bool,
    },
    GuildAvailability {
        guild_id: Snowflake,
        available: bool,
    },
    /// Channel snapshot. Messages inside it are stored as messages.
    ChannelUpsert(Channel),
    ChannelDelete {
        channel_id: Snowflake,
    },
    RoleUpsert(Role),
    RoleDelete {
        role_id: Snowflake,
    },
    /// A user joined a guild.
    MemberAdd(Member),
    MemberUpsert(Member),
    /// A user left a guild. The cached membership is removed only when it
    /// is held for that guild; the guild's member count drops either way.
    MemberRemove {
        guild_id: Snowflake,
        user_id: Snowflake,
    },
    MessageUpsert(Message),
    MessageDelete {
        message_id: Snowflake,
    },
    MessageDeleteBulk {
        message_ids: Vec<Snowflake>,
    },
    UserUpsert(User),
}

impl<P: PersistentTier> EntityCache<P> {
    /// Apply one event.
    ///
    /// Returns the in-memory value the event replaced or removed, if any.
    pub async fn apply(&self, event: CacheEvent) -> CacheResult<Option<CachedValue>> {
        match event {
            CacheEvent::GuildUpsert(guild) => self.upsert_guild(guild).await,
            CacheEvent::GuildDelete {
                guild_id,
                unavailable: true,
            } => {
                self.set_guild_availability(guild_id, false)?;
                tracing::info!(guild_id, "Guild unavailable");
                Ok(None)
            }
            CacheEvent::GuildDelete { guild_id, .. } => {
                let removal = self.remove_guild(guild_id).await?;
                Ok(removal.removed.map(CachedValue::Guild))
            }
            CacheEvent::GuildAvailability {
                guild_id,
                available,
            } => {
                self.set_guild_availability(guild_id, available)?;
                Ok(None)
            }
            CacheEvent::ChannelUpsert(channel) => self.upsert_channel(channel).await,
            CacheEvent::ChannelDelete { channel_id } => {
                let removal = self.remove_channel(channel_id).await?;
                Ok(removal.removed.map(CachedValue::Channel))
            }
            CacheEvent::RoleUpsert(role) => self.upsert(role).await,
            CacheEvent::RoleDelete { role_id } => {
                let removal = self.remove_role(role_id).await?;
                Ok(removal.removed.map(CachedValue::Role))
            }
            CacheEvent::MemberAdd(member) => {
                let guild_id = member.guild_id;
                let previous = self.upsert(member).await?;
                if let Some(guild_id) = guild_id {
                    self.member_added(guild_id).await?;
                }
                Ok(previous)
            }
            CacheEvent::MemberUpsert(member) => self.upsert(member).await,
            CacheEvent::MemberRemove { guild_id, user_id } => {
                let owner = self.member_guild(user_id).await?;
                let removed = match owner {
                    Some(owner) if owner != guild_id => {
                        tracing::debug!(
                            guild_id,
                            user_id,
                            held_for = owner,
                            "Leave from another guild, cached membership kept"
                        );
                        None
                    }
                    _ => self.delete::<Member>(user_id).await?,
                };
                self.member_removed(guild_id).await?;
                Ok(removed.map(CachedValue::Member))
            }
            CacheEvent::MessageUpsert(message) => self.upsert(message).await,
            CacheEvent::MessageDelete { message_id } => {
                let removed = self.delete::<Message>(message_id).await?;
                Ok(removed.map(CachedValue::Message))
            }
            CacheEvent::MessageDeleteBulk { message_ids } => {
                self.remove_messages(message_ids).await?;
                Ok(None)
            }
            CacheEvent::UserUpsert(user) => self.upsert(user).await,
        }
    }

    /// Guild of the membership held for `user_id`: the containment index,
    /// then the in-memory copy, then the persisted row.
    async fn member_guild(&self, user_id: Snowflake) -> CacheResult<Option<Snowflake>> {
        let known = {
            let memory = self.memory()?;
            memory
                .parent_of::<Member>(user_id)
                .or_else(|| memory.get::<Member>(user_id).and_then(|m| m.guild_id))
        };
        if known.is_some() {
            return Ok(known);
        }
        match self.tier_for(EntityKind::Member) {
            Some(tier) => Ok(tier
                .read::<Member>(user_id)
                .await?
                .and_then(|member| member.guild_id)),
            None => Ok(None),
        }
    }

    async fn upsert<T: TieredEntity>(&self, entity: T) -> CacheResult<Option<CachedValue>> {
        let outcome = self.set(entity).await?;
        Ok(outcome.into_previous().map(TieredEntity::wrap))
    }

    async fn upsert_guild(&self, mut guild: Guild) -> CacheResult<Option<CachedValue>> {
        let guild_id = guild.id;
        let channels: Vec<Channel> = guild.channels.drain().map(|(_, c)| c).collect();
        let roles: Vec<Role> = guild.roles.drain().map(|(_, r)| r).collect();
        let members: Vec<Member> = guild.members.drain().map(|(_, m)| m).collect();

        let previous = self.upsert(guild).await?;

        for mut channel in channels {
            channel.guild_id.get_or_insert(guild_id);
            self.upsert_channel(channel).await?;
        }
        for mut role in roles {
            role.guild_id.get_or_insert(guild_id);
            self.set(role).await?;
        }
        for mut member in members {
            member.guild_id.get_or_insert(guild_id);
            self.set(member).await?;
        }
        Ok(previous)
    }

    async fn upsert_channel(&self, mut channel: Channel) -> CacheResult<Option<CachedValue>> {
        let channel_id = channel.id;
        let guild_id = channel.guild_id;
        let messages: Vec<Message> = channel.messages.drain().map(|(_, m)| m).collect();

        let previous = self.upsert(channel).await?;

        for mut message in messages {
            message.channel_id.get_or_insert(channel_id);
            if message.guild_id.is_none() {
                message.guild_id = guild_id;
            }
            self.set(message).await?;
        }
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::CacheOptions;

    fn snapshot() -> Guild {
        let mut guild = Guild::new(1);
        guild.member_count = Some(2);
        let mut channel = Channel::new(10, 1);
        channel.guild_id = None;
        channel.messages.insert(100, Message::new(100, 10));
        guild.channels.insert(10, channel);
        guild.roles.insert(20, Role::new(20, 1));
        guild.members.insert(30, Member::new(30, 1));
        guild
    }

    #[tokio::test]
    async fn test_guild_snapshot_is_split() {
        let cache = EntityCache::new(CacheOptions::all_in_memory()).unwrap();
        assert!(cache.apply(CacheEvent::GuildUpsert(snapshot())).await.unwrap().is_none());

        let memory = cache.memory().unwrap();
        assert_eq!(memory.parent_of::<Channel>(10), Some(1));
        assert_eq!(memory.parent_of::<Message>(100), Some(10));
        assert_eq!(memory.ids::<Role>(), vec![20]);
        assert_eq!(memory.ids::<Member>(), vec![30]);
        assert_eq!(memory.get::<Channel>(10).and_then(|c| c.guild_id), Some(1));
    }

    #[tokio::test]
    async fn test_update_returns_old_value() {
        let cache = EntityCache::new(CacheOptions::all_in_memory()).unwrap();
        let mut user = User::new(5);
        user.username = Some("before".into());
        cache.apply(CacheEvent::UserUpsert(user)).await.unwrap();

        let mut renamed = User::new(5);
        renamed.username = Some("after".into());
        let old = cache.apply(CacheEvent::UserUpsert(renamed)).await.unwrap();
        match old {
            Some(CachedValue::User(old)) => assert_eq!(old.username.as_deref(), Some("before")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unavailable_guild_is_kept() {
        let cache = EntityCache::new(CacheOptions::all_in_memory()).unwrap();
        cache.apply(CacheEvent::GuildUpsert(snapshot())).await.unwrap();

        let removed = cache
            .apply(CacheEvent::GuildDelete {
                guild_id: 1,
                unavailable: true,
            })
            .await
            .unwrap();
        assert!(removed.is_none());
        assert!(cache.peek::<Guild>(1).unwrap().is_some());
        assert!(cache.is_guild_unavailable(1).unwrap());

        let removed = cache
            .apply(CacheEvent::GuildDelete {
                guild_id: 1,
                unavailable: false,
            })
            .await
            .unwrap();
        assert_eq!(removed.map(|v| v.kind()), Some(EntityKind::Guild));
        assert!(!cache.is_guild_unavailable(1).unwrap());
        assert_eq!(cache.memory().unwrap().len::<Message>(), 0);
    }

    #[tokio::test]
    async fn test_member_join_and_leave() {
        let cache = EntityCache::new(CacheOptions::all_in_memory()).unwrap();
        cache.apply(CacheEvent::GuildUpsert(snapshot())).await.unwrap();

        cache
            .apply(CacheEvent::MemberAdd(Member::new(31, 1)))
            .await
            .unwrap();
        assert_eq!(cache.peek::<Guild>(1).unwrap().unwrap().member_count, Some(3));

        let removed = cache
            .apply(CacheEvent::MemberRemove {
                guild_id: 1,
                user_id: 30,
            })
            .await
            .unwrap();
        assert_eq!(removed.map(|v| v.id()), Some(30));
        assert_eq!(cache.peek::<Guild>(1).unwrap().unwrap().member_count, Some(2));
        assert!(cache.peek::<Member>(30).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_leave_from_other_guild_keeps_membership() {
        let cache = EntityCache::new(CacheOptions::all_in_memory()).unwrap();
        cache.apply(CacheEvent::GuildUpsert(snapshot())).await.unwrap();
        let mut other = Guild::new(2);
        other.member_count = Some(5);
        cache.apply(CacheEvent::GuildUpsert(other)).await.unwrap();

        let removed = cache
            .apply(CacheEvent::MemberRemove {
                guild_id: 2,
                user_id: 30,
            })
            .await
            .unwrap();
        assert!(removed.is_none());
        let member = cache.peek::<Member>(30).unwrap();
        assert_eq!(member.and_then(|m| m.guild_id), Some(1));
        assert_eq!(cache.peek::<Guild>(1).unwrap().unwrap().member_count, Some(2));
        assert_eq!(cache.peek::<Guild>(2).unwrap().unwrap().member_count, Some(4));
    }

    #[tokio::test]
    async fn test_bulk_message_delete() {
        let cache = EntityCache::new(CacheOptions::all_in_memory()).unwrap();
        cache.apply(CacheEvent::GuildUpsert(snapshot())).await.unwrap();
        cache
            .apply(CacheEvent::MessageUpsert(Message::new(101, 10)))
            .await
            .unwrap();

        cache
            .apply(CacheEvent::MessageDeleteBulk {
                message_ids: vec![100, 101],
            })
            .await
            .unwrap();
        assert_eq!(cache.memory().unwrap().len::<Message>(), 0);
    }
}
