//! Strata Test Utilities
//!
//! Shared test infrastructure for the Strata workspace:
//! - Proptest generators for every entity kind and for cache options
//! - Fixtures: option presets and a guild tree builder
//! - Assertions for cache-specific checks
//! - Tracing setup for tests

// Re-export the mock tier from its source crate
pub use strata_storage::{EntityCache, MemoryTier, MockOps, MockPersistentTier, PersistentTier};

// Re-export core types for convenience
pub use strata_core::{
    CacheError, CacheOptions, CacheResult, CachedEntity, Channel, ChannelKind, ConfigError,
    EntityKind, Guild, KindOptions, Member, Message, Role, Snowflake, StorageError, Timestamp,
    User, ValidationError,
};

use tracing_subscriber::EnvFilter;

/// Install a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; output goes through the test harness capture.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Strata entity types.

    use super::fixtures::GuildTree;
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    // === Identity Generators ===

    /// Any non-zero snowflake.
    pub fn arb_snowflake() -> impl Strategy<Value = Snowflake> {
        1u64..=u64::MAX
    }

    /// A timestamp between 2015 and 2035, second precision.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1_420_070_400i64..2_051_222_400i64).prop_map(|secs| {
            Utc.timestamp_opt(secs, 0)
                .single()
                .unwrap_or_else(Utc::now)
        })
    }

    // === Enum Generators ===

    pub fn arb_entity_kind() -> impl Strategy<Value = EntityKind> {
        prop::sample::select(EntityKind::ALL.to_vec())
    }

    pub fn arb_channel_kind() -> impl Strategy<Value = ChannelKind> {
        prop_oneof![
            Just(ChannelKind::Text),
            Just(ChannelKind::Voice),
            Just(ChannelKind::Category),
            Just(ChannelKind::Announcement),
            Just(ChannelKind::Thread),
            Just(ChannelKind::Stage),
            Just(ChannelKind::Forum),
        ]
    }

    // === Entity Generators ===

    pub fn arb_guild(id: Snowflake) -> impl Strategy<Value = Guild> {
        (
            proptest::option::of("[A-Za-z ]{1,16}"),
            proptest::option::of(arb_snowflake()),
            proptest::option::of(0u64..100_000),
            proptest::option::of(0u32..16),
            proptest::option::of(arb_timestamp()),
        )
            .prop_map(move |(name, owner_id, member_count, shard_id, joined_at)| Guild {
                id,
                name,
                owner_id,
                member_count,
                shard_id,
                joined_at,
                ..Default::default()
            })
    }

    pub fn arb_channel(id: Snowflake, guild_id: Snowflake) -> impl Strategy<Value = Channel> {
        (
            proptest::option::of("[a-z-]{1,16}"),
            proptest::option::of(arb_channel_kind()),
            proptest::option::of(0i32..50),
            proptest::option::of(any::<bool>()),
        )
            .prop_map(move |(name, kind, position, nsfw)| Channel {
                id,
                guild_id: Some(guild_id),
                name,
                kind,
                position,
                nsfw,
                ..Default::default()
            })
    }

    pub fn arb_role(id: Snowflake, guild_id: Snowflake) -> impl Strategy<Value = Role> {
        (
            proptest::option::of("[A-Za-z]{1,12}"),
            proptest::option::of(0u32..0xFF_FFFF),
            proptest::option::of(any::<u64>()),
            proptest::option::of(any::<bool>()),
        )
            .prop_map(move |(name, color, permissions, hoist)| Role {
                id,
                guild_id: Some(guild_id),
                name,
                color,
                permissions,
                hoist,
                ..Default::default()
            })
    }

    pub fn arb_member(
        id: Snowflake,
        guild_id: Snowflake,
        roles: Vec<Snowflake>,
    ) -> impl Strategy<Value = Member> {
        (
            proptest::option::of("[a-z]{1,12}"),
            proptest::option::of(arb_timestamp()),
            proptest::option::of(any::<bool>()),
            prop::sample::subsequence(roles.clone(), 0..=roles.len()),
        )
            .prop_map(move |(nick, joined_at, pending, roles)| Member {
                id,
                guild_id: Some(guild_id),
                nick,
                roles,
                joined_at,
                pending,
                ..Default::default()
            })
    }

    pub fn arb_message(id: Snowflake, channel_id: Snowflake) -> impl Strategy<Value = Message> {
        (
            proptest::option::of(arb_snowflake()),
            proptest::option::of(".{0,64}"),
            proptest::option::of(arb_timestamp()),
        )
            .prop_map(move |(author_id, content, timestamp)| Message {
                id,
                channel_id: Some(channel_id),
                author_id,
                content,
                timestamp,
                ..Default::default()
            })
    }

    pub fn arb_user() -> impl Strategy<Value = User> {
        (
            arb_snowflake(),
            proptest::option::of("[a-z0-9_]{2,16}"),
            proptest::option::of(any::<bool>()),
            proptest::option::of("[a-z]{3,8}@example\\.com"),
            proptest::option::of(prop_oneof![Just("en-US".to_string()), Just("de".to_string())]),
        )
            .prop_map(|(id, username, bot, email, locale)| User {
                id,
                username,
                bot,
                email,
                locale,
                ..Default::default()
            })
    }

    // === Option Generators ===

    pub fn arb_kind_options() -> impl Strategy<Value = KindOptions> {
        (any::<bool>(), any::<bool>()).prop_map(|(in_memory, outside_memory)| KindOptions {
            in_memory,
            outside_memory,
            ..Default::default()
        })
    }

    /// Placement settings only; no projection lists.
    pub fn arb_cache_options() -> impl Strategy<Value = CacheOptions> {
        prop::array::uniform6(arb_kind_options()).prop_map(|kinds| {
            let mut options = CacheOptions::default();
            for (kind, settings) in EntityKind::ALL.into_iter().zip(kinds) {
                *options.kind_mut(kind) = settings;
            }
            options
        })
    }

    // === Tree Generators ===

    /// A guild with up to four channels (each with up to four messages), up
    /// to four roles and up to four members. Ids are distinct across the
    /// tree and start at `base`.
    pub fn arb_guild_tree_at(base: Snowflake) -> impl Strategy<Value = GuildTree> {
        (
            prop::collection::vec(0usize..4, 0..4),
            0usize..4,
            0usize..4,
        )
            .prop_flat_map(move |(messages_per_channel, roles, members)| {
                let tree = GuildTree::sequential(base, &messages_per_channel, roles, members);
                let role_ids = tree.roles.iter().map(|r| r.id).collect::<Vec<_>>();
                let member_ids = tree.members.iter().map(|m| m.id).collect::<Vec<_>>();
                let assignments = prop::collection::vec(
                    prop::sample::subsequence(role_ids.clone(), 0..=role_ids.len()),
                    member_ids.len(),
                );
                (Just(tree), assignments)
            })
            .prop_map(|(mut tree, assignments)| {
                for (member, roles) in tree.members.iter_mut().zip(assignments) {
                    member.roles = roles;
                }
                tree
            })
    }

    pub fn arb_guild_tree() -> impl Strategy<Value = GuildTree> {
        (1u64..1_000_000).prop_flat_map(|n| arb_guild_tree_at(n * 1_000))
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common cache scenarios.

    use super::*;

    /// Every kind in memory: channels, roles and members nest inside
    /// guilds, messages inside channels.
    pub fn nested_options() -> CacheOptions {
        CacheOptions::all_in_memory()
    }

    /// Guilds only in the persistent tier, so channels, roles and members
    /// are held flat. Messages still nest inside channels.
    pub fn flat_options() -> CacheOptions {
        CacheOptions::all_in_memory().with_kind(EntityKind::Guild, KindOptions::persistent())
    }

    /// Every kind in memory and in the persistent tier.
    pub fn write_through_options() -> CacheOptions {
        CacheOptions::uniform(KindOptions::write_through())
    }

    /// Every kind in the persistent tier only.
    pub fn persistent_only_options() -> CacheOptions {
        CacheOptions::uniform(KindOptions::persistent())
    }

    /// Build a cache over a fresh mock persistent tier.
    pub fn cache_with_mock(
        options: CacheOptions,
    ) -> CacheResult<(EntityCache<MockPersistentTier>, MockPersistentTier)> {
        let tier = MockPersistentTier::new();
        let cache = EntityCache::builder(options)
            .persistent(std::sync::Arc::new(tier.clone()))
            .build()?;
        Ok((cache, tier))
    }

    /// A guild and everything it owns, as separate entities.
    #[derive(Debug, Clone, PartialEq)]
    pub struct GuildTree {
        pub guild: Guild,
        pub channels: Vec<Channel>,
        pub messages: Vec<Message>,
        pub roles: Vec<Role>,
        pub members: Vec<Member>,
    }

    impl GuildTree {
        pub fn new(guild_id: Snowflake) -> Self {
            let mut guild = Guild::new(guild_id);
            guild.name = Some(format!("guild-{guild_id}"));
            guild.member_count = Some(0);
            Self {
                guild,
                channels: Vec::new(),
                messages: Vec::new(),
                roles: Vec::new(),
                members: Vec::new(),
            }
        }

        /// Tree with sequential ids starting at `base` (the guild).
        pub fn sequential(
            base: Snowflake,
            messages_per_channel: &[usize],
            roles: usize,
            members: usize,
        ) -> Self {
            let mut next = base;
            let mut id = || {
                next += 1;
                next
            };
            let mut tree = Self::new(base);
            for count in messages_per_channel {
                let channel_id = id();
                tree = tree.with_channel(channel_id);
                for _ in 0..*count {
                    tree = tree.with_message(channel_id, id());
                }
            }
            for _ in 0..roles {
                tree = tree.with_role(id());
            }
            for _ in 0..members {
                tree = tree.with_member(id(), &[]);
            }
            tree
        }

        pub fn id(&self) -> Snowflake {
            self.guild.id
        }

        pub fn with_channel(mut self, id: Snowflake) -> Self {
            let mut channel = Channel::new(id, self.id());
            channel.name = Some(format!("channel-{id}"));
            channel.kind = Some(ChannelKind::Text);
            self.channels.push(channel);
            self
        }

        pub fn with_message(mut self, channel_id: Snowflake, id: Snowflake) -> Self {
            let mut message = Message::new(id, channel_id);
            message.guild_id = Some(self.id());
            message.content = Some(format!("message {id}"));
            self.messages.push(message);
            self
        }

        pub fn with_role(mut self, id: Snowflake) -> Self {
            let mut role = Role::new(id, self.id());
            role.name = Some(format!("role-{id}"));
            self.roles.push(role);
            self
        }

        pub fn with_member(mut self, id: Snowflake, roles: &[Snowflake]) -> Self {
            let mut member = Member::new(id, self.id());
            member.roles = roles.to_vec();
            self.members.push(member);
            self.guild.member_count = Some(self.members.len() as u64);
            self
        }

        /// Every id in the tree for one kind.
        pub fn ids(&self, kind: EntityKind) -> Vec<Snowflake> {
            match kind {
                EntityKind::Guild => vec![self.guild.id],
                EntityKind::Channel => self.channels.iter().map(|c| c.id).collect(),
                EntityKind::Role => self.roles.iter().map(|r| r.id).collect(),
                EntityKind::Member => self.members.iter().map(|m| m.id).collect(),
                EntityKind::Message => self.messages.iter().map(|m| m.id).collect(),
                EntityKind::User => Vec::new(),
            }
        }

        /// The tree as one guild snapshot with children nested inside it.
        pub fn snapshot(&self) -> Guild {
            let mut guild = self.guild.clone();
            for channel in &self.channels {
                let mut channel = channel.clone();
                for message in self.messages.iter().filter(|m| m.channel_id == Some(channel.id)) {
                    channel.messages.insert(message.id, message.clone());
                }
                guild.channels.insert(channel.id, channel);
            }
            for role in &self.roles {
                guild.roles.insert(role.id, role.clone());
            }
            for member in &self.members {
                guild.members.insert(member.id, member.clone());
            }
            guild
        }

        /// Store every entity, parents before children.
        pub async fn store<P: PersistentTier>(&self, cache: &EntityCache<P>) -> CacheResult<()> {
            cache.set(self.guild.clone()).await?;
            for channel in &self.channels {
                cache.set(channel.clone()).await?;
            }
            for role in &self.roles {
                cache.set(role.clone()).await?;
            }
            for member in &self.members {
                cache.set(member.clone()).await?;
            }
            for message in &self.messages {
                cache.set(message.clone()).await?;
            }
            Ok(())
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for Strata-specific checks.

    use super::fixtures::GuildTree;
    use super::*;

    /// Assert that a CacheResult is a Validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &CacheResult<T>) {
        match result {
            Err(CacheError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that a CacheResult is a Config error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &CacheResult<T>) {
        match result {
            Err(CacheError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert that a CacheResult is a persistent tier failure.
    #[track_caller]
    pub fn assert_persistent_error<T: std::fmt::Debug>(result: &CacheResult<T>) {
        match result {
            Err(CacheError::Storage(StorageError::Persistent { .. })) => {}
            other => panic!("Expected Persistent storage error, got: {:?}", other),
        }
    }

    /// Assert that no entity of `tree` is left in memory or in any index.
    #[track_caller]
    pub fn assert_no_memory_residue(memory: &MemoryTier, tree: &GuildTree) {
        fn check<T: strata_storage::TieredEntity>(memory: &MemoryTier, ids: &[Snowflake]) {
            let present = memory.ids::<T>();
            for id in ids {
                assert!(!present.contains(id), "{} {} still in memory", T::KIND, id);
                assert!(
                    memory.parent_of::<T>(*id).is_none(),
                    "{} {} still indexed",
                    T::KIND,
                    id
                );
            }
        }

        check::<Guild>(memory, &tree.ids(EntityKind::Guild));
        check::<Channel>(memory, &tree.ids(EntityKind::Channel));
        check::<Role>(memory, &tree.ids(EntityKind::Role));
        check::<Member>(memory, &tree.ids(EntityKind::Member));
        check::<Message>(memory, &tree.ids(EntityKind::Message));
    }

    /// Assert that no entity of `tree` is left in the mock tier.
    #[track_caller]
    pub fn assert_no_persisted_residue(tier: &MockPersistentTier, tree: &GuildTree) {
        for kind in EntityKind::ALL {
            for id in tree.ids(kind) {
                assert!(!tier.contains(kind, id), "{kind} {id} still persisted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::assertions::*;
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_option_presets() {
        assert!(nested_options().is_nested(EntityKind::Message));
        assert!(!flat_options().is_nested(EntityKind::Channel));
        assert!(flat_options().is_nested(EntityKind::Message));
        assert!(persistent_only_options().validate().is_ok());
    }

    #[test]
    fn test_sequential_tree_ids_are_distinct() {
        let tree = GuildTree::sequential(1000, &[2, 0, 1], 2, 3);
        let mut all: Vec<Snowflake> = EntityKind::ALL
            .into_iter()
            .flat_map(|kind| tree.ids(kind))
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
        assert_eq!(total, 1 + 3 + 3 + 2 + 3);
        assert_eq!(tree.guild.member_count, Some(3));
    }

    #[test]
    fn test_snapshot_nests_children() {
        let tree = GuildTree::new(1)
            .with_channel(10)
            .with_message(10, 100)
            .with_role(20);
        let snapshot = tree.snapshot();
        assert!(snapshot.channels[&10].messages.contains_key(&100));
        assert!(snapshot.roles.contains_key(&20));
    }

    #[test]
    fn test_assert_config_error() {
        let result: CacheResult<()> = Err(ConfigError::Parse {
            reason: "bad".to_string(),
        }
        .into());
        assert_config_error(&result);
    }

    #[test]
    #[should_panic(expected = "Expected Validation error")]
    fn test_assert_validation_error_panics_on_ok() {
        let result: CacheResult<()> = Ok(());
        assert_validation_error(&result);
    }
}
