//! Tiered entity cache.
//!
//! Each cached kind is kept in memory, in an external persistent tier, in
//! both, or not at all, as configured per kind in [`CacheOptions`]. A
//! nestable kind held in memory lives inside its parent when the parent kind
//! is held in memory too, and in its own flat map otherwise. Containment
//! indices remember every child's parent so nested lookups and cascades
//! work no matter where the child landed.
//!
//! # Example
//!
//! ```ignore
//! let cache = EntityCache::builder(CacheOptions::from_toml_str(raw)?)
//!     .persistent(Arc::new(tier))
//!     .build()?;
//!
//! cache.apply(CacheEvent::GuildUpsert(guild)).await?;
//! let member = cache.get::<Member>(user_id).await?;
//! cache.remove_guild(guild_id).await?;
//! ```
//!
//! [`CacheOptions`]: strata_core::CacheOptions

pub mod admission;
pub mod cascade;
pub mod events;
pub mod index;
pub mod kind;
pub mod maintainer;
pub mod memory;
pub mod stats;
pub mod store;
pub mod traits;

pub use admission::{admit_fn, AdmissionPolicy, AdmissionTable, FnAdmission};
pub use cascade::{CascadePlan, Removal, RoleRemoval};
pub use events::CacheEvent;
pub use index::ContainmentIndex;
pub use kind::{CachedValue, TieredEntity};
pub use maintainer::MembershipDelta;
pub use memory::{KindStore, MemoryTier, MemoryWrite, Placement, PlacementSkip};
pub use stats::CacheStats;
pub use store::{EntityCache, EntityCacheBuilder, SetOutcome};
pub use traits::{NoPersistentTier, PersistentTier};
