//! Consistency maintainer: membership deltas and guild availability.

use strata_core::{CacheResult, EntityKind, Guild, IntoSnowflake, Snowflake};

use super::store::EntityCache;
use super::traits::PersistentTier;

/// A single join or leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipDelta {
    Joined,
    Left,
}

impl MembershipDelta {
    /// Apply to a member count. Leaving never goes below zero.
    pub fn apply(self, count: u64) -> u64 {
        match self {
            MembershipDelta::Joined => count.saturating_add(1),
            MembershipDelta::Left => count.saturating_sub(1),
        }
    }
}

impl<P: PersistentTier> EntityCache<P> {
    /// Adjust `member_count` on the in-memory guild, then on the persisted
    /// guild with a read-modify-write.
    ///
    /// The two updates are independent. A copy whose `member_count` was
    /// projected away is left untouched. There is no compare-and-swap on
    /// the persistent side, so concurrent deltas can be lost.
    pub async fn apply_membership_delta(
        &self,
        guild_id: impl IntoSnowflake,
        delta: MembershipDelta,
    ) -> CacheResult<()> {
        let guild_id = guild_id.into_snowflake()?;

        {
            let mut memory = self.memory_mut()?;
            if let Some(count) = memory
                .get_mut::<Guild>(guild_id)
                .and_then(|guild| guild.member_count.as_mut())
            {
                *count = delta.apply(*count);
            }
        }

        if let Some(tier) = self.tier_for(EntityKind::Guild) {
            if let Some(mut guild) = tier.read::<Guild>(guild_id).await? {
                if let Some(count) = guild.member_count.as_mut() {
                    *count = delta.apply(*count);
                    tier.write(&guild).await?;
                }
            }
        }

        tracing::trace!(guild_id, ?delta, "Membership delta applied");
        Ok(())
    }

    pub async fn member_added(&self, guild_id: impl IntoSnowflake) -> CacheResult<()> {
        self.apply_membership_delta(guild_id, MembershipDelta::Joined)
            .await
    }

    pub async fn member_removed(&self, guild_id: impl IntoSnowflake) -> CacheResult<()> {
        self.apply_membership_delta(guild_id, MembershipDelta::Left)
            .await
    }

    /// Record whether a guild is reachable. Advisory only: an unavailable
    /// guild keeps its cached data.
    pub fn set_guild_availability(
        &self,
        guild_id: impl IntoSnowflake,
        available: bool,
    ) -> CacheResult<()> {
        let guild_id = guild_id.into_snowflake()?;
        let mut memory = self.memory_mut()?;
        if available {
            memory.unavailable.remove(&guild_id);
        } else {
            memory.unavailable.insert(guild_id);
        }
        Ok(())
    }

    pub fn is_guild_unavailable(&self, guild_id: impl IntoSnowflake) -> CacheResult<bool> {
        let guild_id = guild_id.into_snowflake()?;
        Ok(self.memory()?.unavailable.contains(&guild_id))
    }

    /// Unavailable guild ids, sorted.
    pub fn unavailable_guilds(&self) -> CacheResult<Vec<Snowflake>> {
        let mut ids: Vec<Snowflake> = self.memory()?.unavailable.iter().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{CacheOptions, KindOptions};

    fn guild_with_count(id: Snowflake, count: u64) -> Guild {
        let mut guild = Guild::new(id);
        guild.member_count = Some(count);
        guild
    }

    #[test]
    fn test_delta_saturates() {
        assert_eq!(MembershipDelta::Left.apply(0), 0);
        assert_eq!(MembershipDelta::Joined.apply(u64::MAX), u64::MAX);
        assert_eq!(MembershipDelta::Joined.apply(4), 5);
    }

    #[tokio::test]
    async fn test_member_count_in_memory() {
        let cache = EntityCache::new(CacheOptions::all_in_memory()).unwrap();
        cache.set(guild_with_count(1, 10)).await.unwrap();

        cache.member_added(1).await.unwrap();
        cache.member_added("1").await.unwrap();
        cache.member_removed(1).await.unwrap();

        let guild = cache.peek::<Guild>(1).unwrap().unwrap();
        assert_eq!(guild.member_count, Some(11));
    }

    #[tokio::test]
    async fn test_projected_count_is_left_alone() {
        let options = CacheOptions::all_in_memory().with_kind(
            EntityKind::Guild,
            KindOptions::memory().with_undesired(["member_count"]),
        );
        let cache = EntityCache::new(options).unwrap();
        cache.set(guild_with_count(1, 10)).await.unwrap();
        cache.member_added(1).await.unwrap();
        assert_eq!(cache.peek::<Guild>(1).unwrap().unwrap().member_count, None);
    }

    #[tokio::test]
    async fn test_unknown_guild_is_noop() {
        let cache = EntityCache::new(CacheOptions::all_in_memory()).unwrap();
        cache.member_removed(42).await.unwrap();
        assert!(cache.peek::<Guild>(42).unwrap().is_none());
    }

    #[test]
    fn test_availability_set() {
        let cache = EntityCache::new(CacheOptions::all_in_memory()).unwrap();
        cache.set_guild_availability(3, false).unwrap();
        cache.set_guild_availability(1, false).unwrap();
        assert!(cache.is_guild_unavailable(3).unwrap());
        assert_eq!(cache.unavailable_guilds().unwrap(), vec![1, 3]);

        cache.set_guild_availability(3, true).unwrap();
        assert!(!cache.is_guild_unavailable(3).unwrap());
        assert_eq!(cache.unavailable_guilds().unwrap(), vec![1]);
    }
}
