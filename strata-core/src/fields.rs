//! Field descriptor tables.
//!
//! Each cached kind has a closed table of projectable fields. The projector
//! walks the table instead of enumerating properties at runtime, and cache
//! options are checked against the same table when they are loaded.

use std::fmt;

use crate::{Channel, EntityKind, Guild, Member, Message, Role, User};

/// Name of the identifier field. Always retained by projection.
pub const ID_FIELD: &str = "id";

/// One projectable field of `T`.
pub struct FieldDescriptor<T> {
    name: &'static str,
    present: fn(&T) -> bool,
    clear: fn(&mut T),
}

impl<T> FieldDescriptor<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the field currently carries a value.
    pub fn is_present(&self, entity: &T) -> bool {
        (self.present)(entity)
    }

    /// Drop the field's value.
    pub fn clear(&self, entity: &mut T) {
        (self.clear)(entity)
    }
}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldDescriptor").field(&self.name).finish()
    }
}

macro_rules! field {
    ($ty:ty, $field:ident) => {
        FieldDescriptor {
            name: stringify!($field),
            present: |e: &$ty| e.$field.is_some(),
            clear: |e: &mut $ty| e.$field = None,
        }
    };
    ($ty:ty, $field:ident, list) => {
        FieldDescriptor {
            name: stringify!($field),
            present: |e: &$ty| !e.$field.is_empty(),
            clear: |e: &mut $ty| e.$field.clear(),
        }
    };
}

pub(crate) static GUILD_FIELDS: &[FieldDescriptor<Guild>] = &[
    field!(Guild, name),
    field!(Guild, description),
    field!(Guild, icon),
    field!(Guild, owner_id),
    field!(Guild, member_count),
    field!(Guild, shard_id),
    field!(Guild, preferred_locale),
    field!(Guild, joined_at),
];

pub(crate) static CHANNEL_FIELDS: &[FieldDescriptor<Channel>] = &[
    field!(Channel, guild_id),
    field!(Channel, name),
    field!(Channel, topic),
    field!(Channel, kind),
    field!(Channel, position),
    field!(Channel, nsfw),
    field!(Channel, category_id),
    field!(Channel, last_message_id),
];

pub(crate) static ROLE_FIELDS: &[FieldDescriptor<Role>] = &[
    field!(Role, guild_id),
    field!(Role, name),
    field!(Role, color),
    field!(Role, position),
    field!(Role, permissions),
    field!(Role, hoist),
    field!(Role, mentionable),
];

pub(crate) static MEMBER_FIELDS: &[FieldDescriptor<Member>] = &[
    field!(Member, guild_id),
    field!(Member, nick),
    field!(Member, avatar),
    field!(Member, roles, list),
    field!(Member, joined_at),
    field!(Member, pending),
    field!(Member, deaf),
    field!(Member, mute),
];

pub(crate) static MESSAGE_FIELDS: &[FieldDescriptor<Message>] = &[
    field!(Message, channel_id),
    field!(Message, guild_id),
    field!(Message, author_id),
    field!(Message, content),
    field!(Message, timestamp),
    field!(Message, edited_timestamp),
    field!(Message, pinned),
];

pub(crate) static USER_FIELDS: &[FieldDescriptor<User>] = &[
    field!(User, username),
    field!(User, discriminator),
    field!(User, global_name),
    field!(User, avatar),
    field!(User, bot),
    field!(User, email),
    field!(User, locale),
];

/// Every field name a kind accepts in its desired/undesired lists,
/// the identifier included.
pub fn field_names(kind: EntityKind) -> Vec<&'static str> {
    fn names<T>(table: &[FieldDescriptor<T>]) -> Vec<&'static str> {
        std::iter::once(ID_FIELD)
            .chain(table.iter().map(FieldDescriptor::name))
            .collect()
    }

    match kind {
        EntityKind::Guild => names(GUILD_FIELDS),
        EntityKind::Channel => names(CHANNEL_FIELDS),
        EntityKind::Role => names(ROLE_FIELDS),
        EntityKind::Member => names(MEMBER_FIELDS),
        EntityKind::Message => names(MESSAGE_FIELDS),
        EntityKind::User => names(USER_FIELDS),
    }
}
