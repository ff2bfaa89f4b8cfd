//! Tiered store behavior against the mock persistent tier.

use std::sync::Arc;

use async_trait::async_trait;
use strata_storage::{admit_fn, EntityCache, MemoryWrite, Placement, PlacementSkip, SetOutcome};
use strata_test_utils::assertions::*;
use strata_test_utils::fixtures::*;
use strata_test_utils::*;
use tokio::sync::Notify;

#[tokio::test]
async fn test_persistent_hit_is_promoted() {
    init_tracing();
    let (cache, tier) = cache_with_mock(write_through_options()).unwrap();
    let mut user = User::new(7);
    user.username = Some("nelly".into());
    tier.seed(&user).unwrap();

    assert_eq!(cache.get::<User>(7).await.unwrap(), Some(user.clone()));
    assert_eq!(cache.peek::<User>(7).unwrap(), Some(user.clone()));

    // Second read is served from memory.
    assert_eq!(cache.get::<User>("7").await.unwrap(), Some(user));
    assert_eq!(tier.ops().reads, 1);

    let stats = cache.stats(EntityKind::User);
    assert_eq!(stats.persistent_hits, 1);
    assert_eq!(stats.memory_hits, 1);
    assert_eq!(stats.hit_rate(), 1.0);
    assert_eq!(stats.memory_hit_rate(), 0.5);
}

#[tokio::test]
async fn test_persistent_only_kind_is_not_promoted() {
    let (cache, tier) = cache_with_mock(persistent_only_options()).unwrap();
    cache.set(Guild::new(1)).await.unwrap();

    assert!(tier.contains(EntityKind::Guild, 1));
    assert!(cache.peek::<Guild>(1).unwrap().is_none());
    assert!(cache.get::<Guild>(1).await.unwrap().is_some());
    assert!(cache.peek::<Guild>(1).unwrap().is_none());
    assert_eq!(tier.ops().reads, 1);
}

#[tokio::test]
async fn test_miss_in_both_tiers() {
    let (cache, tier) = cache_with_mock(write_through_options()).unwrap();
    assert!(cache.get::<Message>(404).await.unwrap().is_none());
    assert_eq!(tier.ops().reads, 1);
    assert_eq!(cache.stats(EntityKind::Message).misses, 1);
}

#[tokio::test]
async fn test_promoted_child_nests_under_cached_parent() {
    let (cache, tier) = cache_with_mock(write_through_options()).unwrap();
    cache.set(Guild::new(1)).await.unwrap();
    tier.seed(&Channel::new(10, 1)).unwrap();

    cache.get::<Channel>(10).await.unwrap();
    let memory = cache.memory().unwrap();
    assert_eq!(memory.parent_of::<Channel>(10), Some(1));
    assert!(memory.get::<Guild>(1).unwrap().channels.contains_key(&10));
}

#[tokio::test]
async fn test_write_failure_keeps_memory_copy() {
    let (cache, tier) = cache_with_mock(write_through_options()).unwrap();
    tier.fail_writes(true);

    let result = cache.set(Role::new(20, 1)).await;
    assert_persistent_error(&result);
    assert!(!tier.contains(EntityKind::Role, 20));
    // Guild 1 is not cached, so the role is held nowhere in memory either.
    assert!(cache.peek::<Role>(20).unwrap().is_none());

    let result = cache.set(User::new(5)).await;
    assert_persistent_error(&result);
    assert!(cache.peek::<User>(5).unwrap().is_some());
}

#[tokio::test]
async fn test_read_failure_surfaces() {
    let (cache, tier) = cache_with_mock(write_through_options()).unwrap();
    tier.fail_reads(true);
    let result = cache.get::<User>(1).await;
    assert_persistent_error(&result);
}

#[tokio::test]
async fn test_skipped_nested_placement_still_persists() {
    let (cache, tier) = cache_with_mock(write_through_options()).unwrap();

    let outcome = cache.set(Channel::new(10, 1)).await.unwrap();
    assert_eq!(
        outcome.memory(),
        Some(MemoryWrite::Skipped(PlacementSkip::ParentNotCached {
            parent: 1
        }))
    );
    assert!(tier.contains(EntityKind::Channel, 10));
    assert_eq!(cache.stats(EntityKind::Channel).skipped_placements, 1);

    let mut orphan = Message::new(100, 10);
    orphan.channel_id = None;
    let outcome = cache.set(orphan).await.unwrap();
    assert_eq!(
        outcome.memory(),
        Some(MemoryWrite::Skipped(PlacementSkip::MissingParentId))
    );
}

#[tokio::test]
async fn test_rejected_entity_touches_no_tier() {
    let tier = MockPersistentTier::new();
    let cache = EntityCache::builder(write_through_options())
        .persistent(Arc::new(tier.clone()))
        .admission::<User>(admit_fn(|user: &User| user.bot != Some(true)))
        .build()
        .unwrap();

    let mut bot = User::new(1);
    bot.bot = Some(true);
    let outcome = cache.set(bot).await.unwrap();
    assert!(outcome.is_rejected());
    assert!(cache.peek::<User>(1).unwrap().is_none());
    assert_eq!(tier.ops().writes, 0);

    let outcome = cache.set(User::new(2)).await.unwrap();
    assert!(matches!(
        outcome,
        SetOutcome::Stored {
            memory: MemoryWrite::Stored(Placement::Flat),
            persisted: true,
            previous: None,
        }
    ));

    let stats = cache.stats(EntityKind::User);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.writes, 1);
}

#[tokio::test]
async fn test_projection_applies_to_both_tiers() {
    let options = write_through_options().with_kind(
        EntityKind::User,
        KindOptions::write_through().with_desired(["username"]),
    );
    let (cache, tier) = cache_with_mock(options).unwrap();

    let mut user = User::new(3);
    user.username = Some("kept".into());
    user.email = Some("dropped@example.com".into());
    cache.set(user).await.unwrap();

    let in_memory = cache.peek::<User>(3).unwrap().unwrap();
    let persisted = tier.peek::<User>(3).unwrap().unwrap();
    for copy in [in_memory, persisted] {
        assert_eq!(copy.username.as_deref(), Some("kept"));
        assert!(copy.email.is_none());
    }
}

#[tokio::test]
async fn test_nested_children_are_not_persisted_inside_parent() {
    let (cache, tier) = cache_with_mock(write_through_options()).unwrap();
    GuildTree::new(1)
        .with_channel(10)
        .with_message(10, 100)
        .store(&cache)
        .await
        .unwrap();

    let guild = tier.peek::<Guild>(1).unwrap().unwrap();
    assert!(guild.channels.is_empty());
    let channel = tier.peek::<Channel>(10).unwrap().unwrap();
    assert!(channel.messages.is_empty());
    assert!(tier.contains(EntityKind::Message, 100));
}

#[tokio::test]
async fn test_replacing_parent_keeps_nested_children() {
    let cache = EntityCache::new(nested_options()).unwrap();
    GuildTree::new(1)
        .with_channel(10)
        .with_role(20)
        .store(&cache)
        .await
        .unwrap();

    let mut renamed = Guild::new(1);
    renamed.name = Some("renamed".into());
    let previous = cache.set(renamed).await.unwrap().into_previous().unwrap();
    assert_eq!(previous.name.as_deref(), Some("guild-1"));

    let memory = cache.memory().unwrap();
    let guild = memory.get::<Guild>(1).unwrap();
    assert_eq!(guild.name.as_deref(), Some("renamed"));
    assert!(guild.channels.contains_key(&10));
    assert!(guild.roles.contains_key(&20));
}

#[tokio::test]
async fn test_config_from_toml() {
    let options = CacheOptions::from_toml_str(
        r#"
        [guilds]
        in_memory = true

        [members]
        in_memory = true
        undesired_props = ["nick"]
        "#,
    )
    .unwrap();
    let cache = EntityCache::new(options).unwrap();
    assert!(cache.options().is_nested(EntityKind::Member));

    let mut member = Member::new(30, 1);
    member.nick = Some("hidden".into());
    cache.set(Guild::new(1)).await.unwrap();
    cache.set(member).await.unwrap();
    assert!(cache.peek::<Member>(30).unwrap().unwrap().nick.is_none());

    let unknown = CacheOptions::from_toml_str("[users]\ndesired_props = [\"shoe_size\"]\n");
    assert_config_error(&unknown);
}

#[tokio::test]
async fn test_invalid_snowflake_is_rejected() {
    let cache = EntityCache::new(nested_options()).unwrap();
    assert_validation_error(&cache.get::<User>("not-a-number").await);
    assert_validation_error(&cache.peek::<User>(""));
}

/// Mock tier whose reads take their row, then wait for the gate.
#[derive(Clone, Default)]
struct GatedReadTier {
    inner: MockPersistentTier,
    gate: Arc<Notify>,
}

#[async_trait]
impl PersistentTier for GatedReadTier {
    async fn read<T: CachedEntity>(&self, id: Snowflake) -> CacheResult<Option<T>> {
        let row = self.inner.read(id).await;
        self.gate.notified().await;
        row
    }

    async fn write<T: CachedEntity>(&self, entity: &T) -> CacheResult<()> {
        self.inner.write(entity).await
    }

    async fn remove(&self, kind: EntityKind, id: Snowflake) -> CacheResult<()> {
        self.inner.remove(kind, id).await
    }
}

#[tokio::test]
async fn test_concurrent_set_wins_over_stale_promotion() {
    let tier = GatedReadTier::default();
    let mut stale = Guild::new(1);
    stale.name = Some("stale".into());
    tier.inner.seed(&stale).unwrap();
    let cache = EntityCache::builder(write_through_options())
        .persistent(Arc::new(tier.clone()))
        .build()
        .unwrap();

    let mut fresh = Guild::new(1);
    fresh.name = Some("fresh".into());
    let (read, _) = tokio::join!(cache.get::<Guild>(1), async {
        cache.set(fresh).await.unwrap();
        tier.gate.notify_one();
    });

    assert_eq!(read.unwrap().unwrap().name.as_deref(), Some("fresh"));
    let cached = cache.peek::<Guild>(1).unwrap().unwrap();
    assert_eq!(cached.name.as_deref(), Some("fresh"));
    let persisted = tier.inner.peek::<Guild>(1).unwrap().unwrap();
    assert_eq!(persisted.name.as_deref(), Some("fresh"));
}
