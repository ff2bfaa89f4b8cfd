//! Core entity structures
//!
//! Every projectable field is optional so the field projector can drop it.
//! Nested containers (`Guild::channels`, `Guild::roles`, `Guild::members`,
//! `Channel::messages`) are owned by the cache: they are never serialized
//! and never projected.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::fields::{
    CHANNEL_FIELDS, GUILD_FIELDS, MEMBER_FIELDS, MESSAGE_FIELDS, ROLE_FIELDS, USER_FIELDS,
};
use crate::{ChannelKind, EntityKind, FieldDescriptor, Snowflake, Timestamp};

/// An entity the cache knows how to store.
pub trait CachedEntity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> Snowflake;

    /// Identifier of the containing entity for nestable kinds.
    fn parent_id(&self) -> Option<Snowflake> {
        None
    }

    /// Descriptor table for every projectable field of this kind.
    fn fields() -> &'static [FieldDescriptor<Self>];
}

/// Guild - the outermost container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Guild {
    #[serde(with = "crate::snowflake")]
    pub id: Snowflake,
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    #[serde(with = "crate::snowflake::option", default)]
    pub owner_id: Option<Snowflake>,
    pub member_count: Option<u64>,
    pub shard_id: Option<u32>,
    pub preferred_locale: Option<String>,
    pub joined_at: Option<Timestamp>,
    #[serde(skip)]
    pub channels: HashMap<Snowflake, Channel>,
    #[serde(skip)]
    pub roles: HashMap<Snowflake, Role>,
    #[serde(skip)]
    pub members: HashMap<Snowflake, Member>,
}

impl Guild {
    pub fn new(id: Snowflake) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

/// Channel - owned by a guild, owns messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(with = "crate::snowflake")]
    pub id: Snowflake,
    #[serde(with = "crate::snowflake::option", default)]
    pub guild_id: Option<Snowflake>,
    pub name: Option<String>,
    pub topic: Option<String>,
    pub kind: Option<ChannelKind>,
    pub position: Option<i32>,
    pub nsfw: Option<bool>,
    #[serde(with = "crate::snowflake::option", default)]
    pub category_id: Option<Snowflake>,
    #[serde(with = "crate::snowflake::option", default)]
    pub last_message_id: Option<Snowflake>,
    #[serde(skip)]
    pub messages: HashMap<Snowflake, Message>,
}

impl Channel {
    pub fn new(id: Snowflake, guild_id: Snowflake) -> Self {
        Self {
            id,
            guild_id: Some(guild_id),
            ..Default::default()
        }
    }
}

/// Role - owned by a guild, referenced by members.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Role {
    #[serde(with = "crate::snowflake")]
    pub id: Snowflake,
    #[serde(with = "crate::snowflake::option", default)]
    pub guild_id: Option<Snowflake>,
    pub name: Option<String>,
    pub color: Option<u32>,
    pub position: Option<i32>,
    pub permissions: Option<u64>,
    pub hoist: Option<bool>,
    pub mentionable: Option<bool>,
}

impl Role {
    pub fn new(id: Snowflake, guild_id: Snowflake) -> Self {
        Self {
            id,
            guild_id: Some(guild_id),
            ..Default::default()
        }
    }
}

/// Member - a user's membership in one guild. `id` is the user's id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(with = "crate::snowflake")]
    pub id: Snowflake,
    #[serde(with = "crate::snowflake::option", default)]
    pub guild_id: Option<Snowflake>,
    pub nick: Option<String>,
    pub avatar: Option<String>,
    #[serde(with = "crate::snowflake::list", default)]
    pub roles: Vec<Snowflake>,
    pub joined_at: Option<Timestamp>,
    pub pending: Option<bool>,
    pub deaf: Option<bool>,
    pub mute: Option<bool>,
}

impl Member {
    pub fn new(id: Snowflake, guild_id: Snowflake) -> Self {
        Self {
            id,
            guild_id: Some(guild_id),
            ..Default::default()
        }
    }

    pub fn has_role(&self, role_id: Snowflake) -> bool {
        self.roles.contains(&role_id)
    }

    /// Drop a role reference. Returns true if the member changed.
    pub fn strip_role(&mut self, role_id: Snowflake) -> bool {
        let before = self.roles.len();
        self.roles.retain(|id| *id != role_id);
        before != self.roles.len()
    }
}

/// Message - owned by a channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(with = "crate::snowflake")]
    pub id: Snowflake,
    #[serde(with = "crate::snowflake::option", default)]
    pub channel_id: Option<Snowflake>,
    #[serde(with = "crate::snowflake::option", default)]
    pub guild_id: Option<Snowflake>,
    #[serde(with = "crate::snowflake::option", default)]
    pub author_id: Option<Snowflake>,
    pub content: Option<String>,
    pub timestamp: Option<Timestamp>,
    pub edited_timestamp: Option<Timestamp>,
    pub pinned: Option<bool>,
}

impl Message {
    pub fn new(id: Snowflake, channel_id: Snowflake) -> Self {
        Self {
            id,
            channel_id: Some(channel_id),
            ..Default::default()
        }
    }
}

/// User - not contained by anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(with = "crate::snowflake")]
    pub id: Snowflake,
    pub username: Option<String>,
    pub discriminator: Option<String>,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
    pub bot: Option<bool>,
    pub email: Option<String>,
    pub locale: Option<String>,
}

impl User {
    pub fn new(id: Snowflake) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

impl CachedEntity for Guild {
    const KIND: EntityKind = EntityKind::Guild;

    fn id(&self) -> Snowflake {
        self.id
    }

    fn fields() -> &'static [FieldDescriptor<Self>] {
        GUILD_FIELDS
    }
}

impl CachedEntity for Channel {
    const KIND: EntityKind = EntityKind::Channel;

    fn id(&self) -> Snowflake {
        self.id
    }

    fn parent_id(&self) -> Option<Snowflake> {
        self.guild_id
    }

    fn fields() -> &'static [FieldDescriptor<Self>] {
        CHANNEL_FIELDS
    }
}

impl CachedEntity for Role {
    const KIND: EntityKind = EntityKind::Role;

    fn id(&self) -> Snowflake {
        self.id
    }

    fn parent_id(&self) -> Option<Snowflake> {
        self.guild_id
    }

    fn fields() -> &'static [FieldDescriptor<Self>] {
        ROLE_FIELDS
    }
}

impl CachedEntity for Member {
    const KIND: EntityKind = EntityKind::Member;

    fn id(&self) -> Snowflake {
        self.id
    }

    fn parent_id(&self) -> Option<Snowflake> {
        self.guild_id
    }

    fn fields() -> &'static [FieldDescriptor<Self>] {
        MEMBER_FIELDS
    }
}

impl CachedEntity for Message {
    const KIND: EntityKind = EntityKind::Message;

    fn id(&self) -> Snowflake {
        self.id
    }

    fn parent_id(&self) -> Option<Snowflake> {
        self.channel_id
    }

    fn fields() -> &'static [FieldDescriptor<Self>] {
        MESSAGE_FIELDS
    }
}

impl CachedEntity for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> Snowflake {
        self.id
    }

    fn fields() -> &'static [FieldDescriptor<Self>] {
        USER_FIELDS
    }
}
