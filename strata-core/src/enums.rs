//! Enum types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity kind discriminator for the six cached kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Guild,
    Channel,
    Role,
    Member,
    Message,
    User,
}

impl EntityKind {
    /// Every kind, parents before their children.
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Guild,
        EntityKind::Channel,
        EntityKind::Role,
        EntityKind::Member,
        EntityKind::Message,
        EntityKind::User,
    ];

    /// Table name used when talking to the persistent tier.
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Guild => "guild",
            EntityKind::Channel => "channel",
            EntityKind::Role => "role",
            EntityKind::Member => "member",
            EntityKind::Message => "message",
            EntityKind::User => "user",
        }
    }

    /// The kind this kind nests inside, if any.
    pub fn parent(self) -> Option<EntityKind> {
        match self {
            EntityKind::Channel | EntityKind::Role | EntityKind::Member => Some(EntityKind::Guild),
            EntityKind::Message => Some(EntityKind::Channel),
            EntityKind::Guild | EntityKind::User => None,
        }
    }

    /// Kinds directly contained by this kind.
    pub fn children(self) -> &'static [EntityKind] {
        match self {
            EntityKind::Guild => &[EntityKind::Channel, EntityKind::Role, EntityKind::Member],
            EntityKind::Channel => &[EntityKind::Message],
            _ => &[],
        }
    }

    pub fn is_nestable(self) -> bool {
        self.parent().is_some()
    }

    /// Dense index, stable across releases, for per-kind tables.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Channel type as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Text,
    Voice,
    Category,
    Announcement,
    Thread,
    Stage,
    Forum,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_child_symmetry() {
        for kind in EntityKind::ALL {
            for child in kind.children() {
                assert_eq!(child.parent(), Some(kind));
            }
            if let Some(parent) = kind.parent() {
                assert!(parent.children().contains(&kind));
            }
        }
    }

    #[test]
    fn test_index_is_dense() {
        for (i, kind) in EntityKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_display_uses_table_name() {
        assert_eq!(EntityKind::Message.to_string(), "message");
        assert!(!EntityKind::User.is_nestable());
        assert!(EntityKind::Message.is_nestable());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&ChannelKind::Announcement).unwrap();
        assert_eq!(json, "\"announcement\"");
        let kind: EntityKind = serde_json::from_str("\"member\"").unwrap();
        assert_eq!(kind, EntityKind::Member);
    }
}
